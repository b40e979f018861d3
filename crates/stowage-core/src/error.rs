//! Fatal error taxonomy for export and restore runs.
//!
//! Only failures that invalidate the whole run live here. Per-frame problems
//! (unknown kinds, missing dependencies) are skips counted in the restore
//! ledger, never errors.

use std::io;

use stowage_crypto::{EnvelopeError, KeyError};
use stowage_proto::ProtoError;
use thiserror::Error;

use crate::{attachments::AttachmentError, store::StoreError};

/// A failure that aborts an export or restore run.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Key derivation failed; no key material is available for this run.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The stream is structurally undecodable (bad framing or payload
    /// bytes). Distinct from [`ArchiveError::Integrity`]: decode errors
    /// point at writer bugs or version skew, integrity errors at corruption
    /// or tampering.
    #[error("stream decode failure: {0}")]
    Decode(ProtoError),

    /// The stream failed authentication or arrived incomplete. Everything
    /// applied before the failure is suspect; the caller's retention policy
    /// decides what happens to it.
    #[error("stream integrity failure: {0}")]
    Integrity(String),

    /// The account header frame is missing or out of order. Every stream
    /// carries exactly one, first.
    #[error("account data frame missing or out of order")]
    MissingAccountData,

    /// The stream was written by a newer format version.
    #[error("archive version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version the account frame declared
        found: u64,
        /// Newest version this reader understands
        supported: u64,
    },

    /// The local store has no self recipient to export.
    #[error("no self recipient in the local store")]
    MissingSelfRecipient,

    /// A local store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sink or source I/O failed outside the framing layer.
    #[error("archive i/o error: {0}")]
    Io(#[from] io::Error),

    /// The run was cancelled at a frame boundary.
    #[error("run cancelled")]
    Cancelled,
}

/// Classify framing-layer errors into the run taxonomy.
///
/// I/O errors that wrap an [`EnvelopeError`] came up through the encryption
/// envelope's `Read` impl; those and truncated frame bodies are integrity
/// failures (the bytes are wrong), while malformed payloads and oversized
/// frames are decode failures (the bytes are nonsense).
impl From<ProtoError> for ArchiveError {
    fn from(err: ProtoError) -> Self {
        match err {
            ProtoError::Io(io) => match envelope_failure(&io) {
                Some(message) => Self::Integrity(message),
                None => Self::Io(io),
            },
            ProtoError::FrameTruncated { .. } => Self::Integrity(err.to_string()),
            other => Self::Decode(other),
        }
    }
}

impl From<AttachmentError> for ArchiveError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::Store(store) => Self::Store(store),
            AttachmentError::BadAddress => {
                Self::Decode(ProtoError::Malformed(err.to_string()))
            },
        }
    }
}

fn envelope_failure(io: &io::Error) -> Option<String> {
    let envelope = io.get_ref()?.downcast_ref::<EnvelopeError>()?;
    match envelope {
        EnvelopeError::Io(_) => None,
        other => Some(other.to_string()),
    }
}
