//! Archive writer, reader state machine, and store seams for Stowage.
//!
//! This crate is the sequential heart of the backup engine: the export walk
//! that turns local account state into an ordered frame stream, and the
//! restore state machine that turns a frame stream back into local state.
//! Both sides are pure with respect to I/O policy: stores are injected trait
//! handles (never ambient globals), sinks and sources are plain `Write`/
//! `Read`, and cancellation is checked between frames through a caller-
//! provided handle.

pub mod attachments;
mod cancel;
mod error;
mod export;
mod records;
pub mod restore;
pub mod store;

pub use attachments::{AttachmentBackupStore, AttachmentByteCounter, AttachmentError};
pub use cancel::{CancelCheck, NeverCancelled};
pub use error::ArchiveError;
pub use export::{ARCHIVE_VERSION, ArchiveWriter, ExportState, MEDIA_OBJECT_OVERHEAD};
pub use records::{
    AttachmentId, AttachmentRecord, ChatFolderRecord, ChatRecord, MessageRecord,
    NotificationProfileRecord, PlaceholderRecord, RecipientRecord, ServiceId, StickerPackRecord,
};
pub use restore::{ArchiveReader, ReaderState, RestoreSummary, SkipLedger, SkipReason};
pub use store::{AttachmentStore, ChatStore, MemoryStore, RecipientStore, SettingsStore, StoreError};
