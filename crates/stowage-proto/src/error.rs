//! Error types for frame encoding and container I/O.
//!
//! `ProtoError` covers structural failures only. An unrecognized-but-well-
//! formed frame kind is NOT an error; it decodes to [`crate::Frame::Unknown`]
//! so readers can count and skip it.

use std::io;

use thiserror::Error;

/// Errors produced while encoding frames or reading a container stream.
#[derive(Error, Debug)]
pub enum ProtoError {
    /// Frame body is structurally malformed (bad CBOR, short tag, overlong
    /// varint). Reserved for broken bytes, never for unknown frame kinds.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame body exceeds the maximum allowed length.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared or actual body size in bytes
        size: usize,
        /// Maximum allowed body size in bytes
        max: usize,
    },

    /// Stream ended in the middle of a frame body. A truncated length
    /// *prefix* is clean end-of-stream instead; only a missing body after a
    /// complete prefix is an error.
    #[error("frame truncated: expected {expected} body bytes, got {actual}")]
    FrameTruncated {
        /// Body bytes the length prefix declared
        expected: usize,
        /// Body bytes actually available
        actual: usize,
    },

    /// Attempted to encode an `Unknown` frame. Unknown frames exist only on
    /// the read path; writers always know what they are writing.
    #[error("cannot encode unknown frame kind {kind:#06x}")]
    UnknownKind {
        /// The unrecognized kind tag
        kind: u16,
    },

    /// Underlying I/O failure from the container's reader or writer.
    #[error("container i/o error: {0}")]
    Io(#[from] io::Error),
}

impl From<ciborium::ser::Error<io::Error>> for ProtoError {
    fn from(err: ciborium::ser::Error<io::Error>) -> Self {
        match err {
            ciborium::ser::Error::Io(io) => Self::Io(io),
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl From<ciborium::de::Error<io::Error>> for ProtoError {
    fn from(err: ciborium::de::Error<io::Error>) -> Self {
        match err {
            ciborium::de::Error::Io(io) => Self::Io(io),
            other => Self::Malformed(other.to_string()),
        }
    }
}
