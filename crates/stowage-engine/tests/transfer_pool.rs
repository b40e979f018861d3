//! Transfer pool concurrency and accounting tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use stowage_core::{
    AttachmentByteCounter, AttachmentStore, MemoryStore, PlaceholderRecord,
};
use stowage_crypto::ContentAddress;
use stowage_engine::{AttachmentTransferPool, AttachmentTransport, TransferError};

/// Transport that succeeds after a short delay and tracks in-flight peaks.
struct CountingTransport {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingTransport {
    fn new() -> Self {
        Self { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl AttachmentTransport for CountingTransport {
    async fn transfer(&self, placeholder: &PlaceholderRecord) -> Result<u64, TransferError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(placeholder.ciphertext_len)
    }
}

/// Transport that fails every transfer.
struct BrokenTransport;

#[async_trait]
impl AttachmentTransport for BrokenTransport {
    async fn transfer(&self, _placeholder: &PlaceholderRecord) -> Result<u64, TransferError> {
        Err(TransferError::Failed("remote unavailable".to_string()))
    }
}

fn placeholder(seed: u8, ciphertext_len: u64) -> PlaceholderRecord {
    PlaceholderRecord {
        address: ContentAddress::from_slice(&[seed; 16]).unwrap(),
        upload_era: "era-1".to_string(),
        plaintext_len: ciphertext_len - 16,
        ciphertext_len,
        materialized_as: None,
    }
}

fn store_with_pending(count: u8) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    for seed in 1..=count {
        store.register_placeholder(placeholder(seed, 100)).unwrap();
    }
    Arc::new(store)
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_bounds_concurrency_and_materializes_everything() {
    let store = store_with_pending(6);
    let counter = Arc::new(AttachmentByteCounter::new());
    let transport = Arc::new(CountingTransport::new());

    let pool = AttachmentTransferPool::new(2);
    let report = pool
        .run(Arc::clone(&transport), Arc::clone(&store), Arc::clone(&counter))
        .await
        .unwrap();

    assert_eq!(report.materialized, 6);
    assert_eq!(report.failed, 0);
    assert!(transport.peak.load(Ordering::SeqCst) <= 2, "semaphore must bound in-flight transfers");
    assert_eq!(counter.actual_bytes(), 6 * 100);

    for record in store.enumerate_placeholders().unwrap() {
        assert!(record.materialized_as.is_some());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_leave_placeholders_pending() {
    let store = store_with_pending(3);
    let counter = Arc::new(AttachmentByteCounter::new());

    let pool = AttachmentTransferPool::new(4);
    let report = pool
        .run(Arc::new(BrokenTransport), Arc::clone(&store), Arc::clone(&counter))
        .await
        .unwrap();

    assert_eq!(report.materialized, 0);
    assert_eq!(report.failed, 3);
    assert_eq!(counter.actual_bytes(), 0);

    for record in store.enumerate_placeholders().unwrap() {
        assert!(record.materialized_as.is_none(), "failed transfers must stay retryable");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn materialized_placeholders_are_not_retransferred() {
    let store = store_with_pending(2);
    let counter = Arc::new(AttachmentByteCounter::new());
    let transport = Arc::new(CountingTransport::new());
    let pool = AttachmentTransferPool::new(2);

    pool.run(Arc::clone(&transport), Arc::clone(&store), Arc::clone(&counter)).await.unwrap();
    let report =
        pool.run(Arc::clone(&transport), Arc::clone(&store), Arc::clone(&counter)).await.unwrap();

    assert_eq!(report.materialized, 0, "second run has nothing left to do");
    assert_eq!(counter.actual_bytes(), 2 * 100);
}
