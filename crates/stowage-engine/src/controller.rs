//! The backup controller: one export and one restore at a time, under
//! policy.

use std::{
    fs,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use rand::RngCore;
use stowage_core::{
    ArchiveError, ArchiveReader, ArchiveWriter, AttachmentBackupStore, AttachmentByteCounter,
    AttachmentStore, CancelCheck, ChatStore, ExportState, MemoryStore, RecipientStore,
    RestoreSummary, SettingsStore,
};
use stowage_crypto::{EnvelopeReader, EnvelopeWriter, KeyHierarchy, NONCE_PREFIX_LEN};
use tracing::{debug, warn};

use crate::{
    error::EngineError,
    limits::RunLimits,
    progress::{NullProgress, ProgressReport, ProgressSink},
};

/// What to do with rows a failed restore already applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePolicy {
    /// Keep whatever was applied before the failure. The stream is
    /// idempotent, so a later retry converges on the same rows.
    RetainPartial,
    /// Stage the whole restore and publish it only on success; a failure
    /// leaves the store untouched.
    Discard,
}

/// Result of one restore run.
#[derive(Debug)]
pub struct RestoreOutcome {
    /// Whether the stream was consumed to a clean end.
    pub completed: bool,
    /// Whether applied rows remain in the store.
    pub retained: bool,
    /// What the run read and applied (partial on failure).
    pub summary: RestoreSummary,
    /// The failure that ended the run, if it did not complete.
    pub failure: Option<ArchiveError>,
}

/// Orchestrates export and restore runs over one set of stores.
///
/// Holds the key hierarchy and run limits; enforces at most one export and
/// one restore in flight at a time. All heavy lifting is delegated to
/// `stowage-core`; the controller adds policy.
pub struct BackupController<S> {
    store: S,
    keys: KeyHierarchy,
    limits: RunLimits,
    counter: Arc<AttachmentByteCounter>,
    progress: Arc<dyn ProgressSink>,
    export_active: AtomicBool,
    restore_active: AtomicBool,
}

impl<S> BackupController<S>
where
    S: RecipientStore + ChatStore + SettingsStore + AttachmentStore,
{
    /// Controller with default limits and no progress reporting.
    pub fn new(store: S, keys: KeyHierarchy) -> Self {
        Self {
            store,
            keys,
            limits: RunLimits::default(),
            counter: Arc::new(AttachmentByteCounter::new()),
            progress: Arc::new(NullProgress),
            export_active: AtomicBool::new(false),
            restore_active: AtomicBool::new(false),
        }
    }

    /// Replace the run limits.
    #[must_use]
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach a progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Shared attachment byte counter, for wiring up the transfer pool.
    pub fn counter(&self) -> Arc<AttachmentByteCounter> {
        Arc::clone(&self.counter)
    }

    /// Export the cloud wire form: the frame container written through the
    /// authenticated encryption envelope, under a fresh random nonce prefix.
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RunActive`] if an export is already in flight
    /// - [`EngineError::Key`] when the hierarchy is locked
    /// - [`EngineError::Archive`] for run failures; the sink's partial
    ///   output must be discarded
    pub fn export_to_writer<W: Write>(
        &self,
        state: &ExportState,
        sink: W,
        cancel: &impl CancelCheck,
    ) -> Result<u64, EngineError> {
        let _guard = RunGuard::acquire(&self.export_active, "export")?;

        let key = self.keys.backup_stream_key()?;
        let mut prefix = [0u8; NONCE_PREFIX_LEN];
        rand::rngs::OsRng.fill_bytes(&mut prefix);

        let mut envelope = EnvelopeWriter::new(sink, &key, prefix)?;
        let frames = self.run_export(state, &mut envelope, cancel)?;
        envelope.finish()?;

        self.report(frames);
        Ok(frames)
    }

    /// Export the local wire form to `path`: plaintext container, written to
    /// a `.partial` sibling and atomically renamed into place, so `path`
    /// only ever holds a complete archive.
    ///
    /// # Errors
    ///
    /// Same conditions as [`BackupController::export_to_writer`], plus file
    /// I/O failures. The `.partial` file is removed on failure.
    pub fn export_to_file(
        &self,
        state: &ExportState,
        path: &Path,
        cancel: &impl CancelCheck,
    ) -> Result<u64, EngineError> {
        let _guard = RunGuard::acquire(&self.export_active, "export")?;

        let partial = partial_path(path);
        let result = self.write_local_file(state, &partial, cancel);

        match result {
            Ok(frames) => {
                fs::rename(&partial, path)?;
                self.report(frames);
                Ok(frames)
            },
            Err(err) => {
                let _ = fs::remove_file(&partial);
                Err(err)
            },
        }
    }

    /// Restore from an encrypted stream with a known declared length.
    ///
    /// The declared length is checked against the applicable ingest ceiling
    /// before a single byte is read, and the ceiling is also enforced
    /// against bytes actually consumed, so an understated declared length
    /// cannot ingest an over-limit stream. Run failures do not surface as
    /// `Err`: they are reported in the outcome after the retention policy
    /// has been applied.
    ///
    /// # Errors
    ///
    /// - [`EngineError::RunActive`] if a restore is already in flight
    /// - [`EngineError::IngestTooLarge`] when the declared or observed
    ///   length exceeds policy
    /// - [`EngineError::Key`] / [`EngineError::Envelope`] when the stream
    ///   cannot be opened at all
    pub fn restore_from_reader<R: Read>(
        &self,
        source: R,
        declared_len: u64,
        expects_media: bool,
        policy: RestorePolicy,
        cancel: &impl CancelCheck,
    ) -> Result<RestoreOutcome, EngineError> {
        let _guard = RunGuard::acquire(&self.restore_active, "restore")?;

        let max = if expects_media {
            self.limits.max_media_ingest_len
        } else {
            self.limits.max_ingest_len
        };
        if declared_len > max {
            return Err(EngineError::IngestTooLarge { len: declared_len, max });
        }

        let key = self.keys.backup_stream_key()?;
        let observed = Arc::new(AtomicU64::new(0));
        let metered = MeteredReader { inner: source, max, observed: Arc::clone(&observed) };
        let envelope = match EnvelopeReader::new(metered, &key) {
            Ok(envelope) => envelope,
            Err(err) => {
                return Err(ceiling_exceeded(&observed, max).unwrap_or(EngineError::Envelope(err)));
            },
        };

        let outcome = match policy {
            RestorePolicy::RetainPartial => self.restore_direct(envelope, cancel),
            RestorePolicy::Discard => self.restore_staged(envelope, cancel)?,
        };
        if let Some(err) = ceiling_exceeded(&observed, max) {
            return Err(err);
        }
        self.report(outcome.summary.frames_read);
        Ok(outcome)
    }

    /// Whether a backup taken at `backup_time_ms` is older than policy
    /// allows and a fresh export should be forced.
    pub fn backup_age_exceeded(&self, backup_time_ms: u64, now_ms: u64) -> bool {
        let age_ms = now_ms.saturating_sub(backup_time_ms);
        u128::from(age_ms) > self.limits.max_backup_age.as_millis()
    }

    fn run_export<W: Write>(
        &self,
        state: &ExportState,
        sink: W,
        cancel: &impl CancelCheck,
    ) -> Result<u64, EngineError> {
        let media = AttachmentBackupStore::new(&self.keys)?;
        let writer = ArchiveWriter::new(&self.store, &media, &self.counter);
        Ok(writer.export(state, sink, cancel)?)
    }

    fn write_local_file(
        &self,
        state: &ExportState,
        partial: &Path,
        cancel: &impl CancelCheck,
    ) -> Result<u64, EngineError> {
        let file = fs::File::create(partial)?;
        let media = AttachmentBackupStore::new(&self.keys)?;
        let writer = ArchiveWriter::new(&self.store, &media, &self.counter);

        let mut buffered = BufWriter::new(&file);
        let frames = writer.export(state, &mut buffered, cancel)?;
        buffered.flush()?;
        drop(buffered);
        file.sync_all()?;

        Ok(frames)
    }

    fn restore_direct<R: Read>(&self, source: R, cancel: &impl CancelCheck) -> RestoreOutcome {
        let mut reader = ArchiveReader::new(&self.store, &self.counter);
        match reader.restore(source, cancel) {
            Ok(summary) => {
                RestoreOutcome { completed: true, retained: true, summary, failure: None }
            },
            Err(err) => {
                let summary = reader.summary();
                warn!(error = %err, frames = summary.frames_read, "restore failed, retaining partial state");
                RestoreOutcome {
                    completed: false,
                    retained: applied_anything(&summary),
                    summary,
                    failure: Some(err),
                }
            },
        }
    }

    /// Discard policy: run against a scratch store and replay into the real
    /// one only after a clean end, so a failure leaves the store untouched.
    fn restore_staged<R: Read>(
        &self,
        source: R,
        cancel: &impl CancelCheck,
    ) -> Result<RestoreOutcome, EngineError> {
        let scratch = MemoryStore::new();
        let mut reader = ArchiveReader::new(&scratch, &self.counter);

        match reader.restore(source, cancel) {
            Ok(summary) => {
                self.publish(&scratch)?;
                Ok(RestoreOutcome { completed: true, retained: true, summary, failure: None })
            },
            Err(err) => {
                let summary = reader.summary();
                debug!(error = %err, frames = summary.frames_read, "staged restore failed, store untouched");
                Ok(RestoreOutcome { completed: false, retained: false, summary, failure: Some(err) })
            },
        }
    }

    fn publish(&self, scratch: &MemoryStore) -> Result<(), EngineError> {
        for recipient in scratch.enumerate_recipients().map_err(ArchiveError::Store)? {
            self.store.upsert_recipient(recipient).map_err(ArchiveError::Store)?;
        }
        let chats = scratch.enumerate_chats().map_err(ArchiveError::Store)?;
        for chat in &chats {
            self.store.upsert_chat(chat.clone()).map_err(ArchiveError::Store)?;
        }
        for chat in &chats {
            for message in scratch.enumerate_messages(chat.chat_id).map_err(ArchiveError::Store)? {
                self.store.upsert_message(message).map_err(ArchiveError::Store)?;
            }
        }
        for pack in scratch.enumerate_sticker_packs().map_err(ArchiveError::Store)? {
            self.store.upsert_sticker_pack(pack).map_err(ArchiveError::Store)?;
        }
        for profile in scratch.enumerate_notification_profiles().map_err(ArchiveError::Store)? {
            self.store.upsert_notification_profile(profile).map_err(ArchiveError::Store)?;
        }
        for folder in scratch.enumerate_chat_folders().map_err(ArchiveError::Store)? {
            self.store.upsert_chat_folder(folder).map_err(ArchiveError::Store)?;
        }
        for placeholder in scratch.enumerate_placeholders().map_err(ArchiveError::Store)? {
            self.store.register_placeholder(placeholder).map_err(ArchiveError::Store)?;
        }
        Ok(())
    }

    fn report(&self, frames: u64) {
        self.progress.on_progress(ProgressReport {
            frames_processed: frames,
            planned_attachment_bytes: self.counter.planned_bytes(),
            actual_attachment_bytes: self.counter.actual_bytes(),
        });
    }
}

fn applied_anything(summary: &RestoreSummary) -> bool {
    summary.recipients_applied
        + summary.chats_applied
        + summary.messages_applied
        + summary.sticker_packs_applied
        + summary.notification_profiles_applied
        + summary.chat_folders_applied
        + summary.placeholders_registered
        > 0
}

/// Read adapter that fails once cumulative bytes read exceed the ingest
/// ceiling. The shared counter lets the controller distinguish a ceiling
/// abort from an ordinary stream failure after the run.
struct MeteredReader<R> {
    inner: R,
    max: u64,
    observed: Arc<AtomicU64>,
}

impl<R: Read> Read for MeteredReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let total = self.observed.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        if total > self.max {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "ingest ceiling exceeded"));
        }
        Ok(n)
    }
}

fn ceiling_exceeded(observed: &AtomicU64, max: u64) -> Option<EngineError> {
    let len = observed.load(Ordering::Relaxed);
    (len > max).then_some(EngineError::IngestTooLarge { len, max })
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    PathBuf::from(partial)
}

/// RAII single-run guard over an atomic flag.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool, kind: &'static str) -> Result<Self, EngineError> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .map_err(|_| EngineError::RunActive { kind })?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
