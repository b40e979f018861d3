//! Controller-level errors.

use std::io;

use stowage_core::ArchiveError;
use stowage_crypto::{EnvelopeError, KeyError};
use thiserror::Error;

/// Failures surfaced by the controller and transfer pool.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The underlying export or restore run failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Key material for the run could not be derived.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The encryption envelope rejected the stream before any frame was
    /// read.
    #[error("envelope failure: {0}")]
    Envelope(#[from] EnvelopeError),

    /// A restore stream exceeds the applicable ingest ceiling, either by
    /// declared length (rejected before any byte is read) or by bytes
    /// actually consumed (aborted mid-stream when the declared length
    /// understated the real size).
    #[error("stream of {len} bytes exceeds ingest limit {max}")]
    IngestTooLarge {
        /// Declared or observed stream length
        len: u64,
        /// Applicable policy ceiling
        max: u64,
    },

    /// Another run of the same kind is already active on this controller.
    #[error("a {kind} run is already active")]
    RunActive {
        /// "export" or "restore"
        kind: &'static str,
    },

    /// File or stream I/O outside the archive layers.
    #[error("engine i/o error: {0}")]
    Io(#[from] io::Error),
}
