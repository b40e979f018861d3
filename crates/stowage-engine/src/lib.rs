//! Run orchestration for the Stowage backup archive.
//!
//! `stowage-core` knows how to turn stores into frame streams and back; this
//! crate decides when and under what policy: one run at a time, hard ingest
//! ceilings checked before any byte is read, write-then-publish for local
//! files, retention policy for failed restores, and a bounded transfer pool
//! for the media bytes the frame pipeline deliberately never touches.

mod cancel;
mod controller;
mod error;
mod limits;
mod progress;
mod transfer;

pub use cancel::CancellationToken;
pub use controller::{BackupController, RestoreOutcome, RestorePolicy};
pub use error::EngineError;
pub use limits::RunLimits;
pub use progress::{NullProgress, ProgressReport, ProgressSink};
pub use transfer::{AttachmentTransferPool, AttachmentTransport, TransferError, TransferReport};
