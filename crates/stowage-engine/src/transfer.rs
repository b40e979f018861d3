//! Bounded attachment transfer pool.
//!
//! The frame pipeline registers placeholders; this pool drains them. All
//! actual network and disk I/O lives behind the [`AttachmentTransport`]
//! trait, so the engine itself never opens a socket. Concurrency is bounded
//! by a semaphore, which doubles as backpressure on the transport.

use std::sync::Arc;

use async_trait::async_trait;
use stowage_core::{AttachmentByteCounter, AttachmentId, AttachmentStore, PlaceholderRecord};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// A transfer the transport could not complete.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The remote object was unavailable or the transfer was interrupted.
    /// The placeholder stays unmaterialized and can be retried later.
    #[error("transfer failed: {0}")]
    Failed(String),
}

/// Moves one media object's bytes from remote storage to local storage.
///
/// Implementations perform the real I/O: download, MAC verification against
/// the placeholder's key material, and local persistence. On success they
/// report how many ciphertext bytes moved.
#[async_trait]
pub trait AttachmentTransport: Send + Sync {
    /// Fetch and locally persist the object behind one placeholder.
    async fn transfer(&self, placeholder: &PlaceholderRecord) -> Result<u64, TransferError>;
}

/// What one pool run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Placeholders materialized.
    pub materialized: u64,
    /// Transfers that failed; their placeholders remain pending.
    pub failed: u64,
}

/// Drains pending placeholders through a transport with bounded concurrency.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentTransferPool {
    concurrency: usize,
}

impl AttachmentTransferPool {
    /// Pool with at most `concurrency` transfers in flight.
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency: concurrency.max(1) }
    }

    /// Transfer every unmaterialized placeholder in `store`.
    ///
    /// Each success records actual bytes on `counter` and marks the
    /// placeholder materialized under its address-derived local id. Failures
    /// are counted and left pending; a later run retries them.
    ///
    /// # Errors
    ///
    /// Only store enumeration failures abort the run; individual transfer
    /// failures do not.
    pub async fn run<T, S>(
        &self,
        transport: Arc<T>,
        store: Arc<S>,
        counter: Arc<AttachmentByteCounter>,
    ) -> Result<TransferReport, stowage_core::StoreError>
    where
        T: AttachmentTransport + 'static,
        S: AttachmentStore + 'static,
    {
        let pending: Vec<PlaceholderRecord> = store
            .enumerate_placeholders()?
            .into_iter()
            .filter(|p| p.materialized_as.is_none())
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(pending.len());

        for placeholder in pending {
            let semaphore = Arc::clone(&semaphore);
            let transport = Arc::clone(&transport);
            let store = Arc::clone(&store);
            let counter = Arc::clone(&counter);

            tasks.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    // Semaphore is never closed while tasks run.
                    return false;
                };

                match transport.transfer(&placeholder).await {
                    Ok(bytes) => {
                        counter.record_actual_bytes(bytes);
                        let local_id = AttachmentId::for_address(&placeholder.address);
                        match store.mark_materialized(&placeholder.address, local_id) {
                            Ok(()) => true,
                            Err(err) => {
                                warn!(error = %err, "transfer landed but materialization failed");
                                false
                            },
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "attachment transfer failed, leaving pending");
                        false
                    },
                }
            }));
        }

        let mut report = TransferReport::default();
        for task in tasks {
            match task.await {
                Ok(true) => report.materialized += 1,
                Ok(false) => report.failed += 1,
                Err(err) => {
                    warn!(error = %err, "transfer task panicked");
                    report.failed += 1;
                },
            }
        }

        debug!(materialized = report.materialized, failed = report.failed, "transfer run done");
        Ok(report)
    }
}
