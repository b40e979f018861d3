//! Error types for key derivation and the encryption envelope.

use std::io;

use thiserror::Error;

/// Key derivation failures.
///
/// Derivation fails closed: a missing root secret is an error, never a zero
/// key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// No root secret is available to derive from. The account has not
    /// registered, or the hierarchy was constructed locked.
    #[error("root secret is absent or uninitialized")]
    MissingRootSecret,
}

/// Envelope encryption/decryption failures.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// Stream does not start with the envelope magic.
    #[error("not an encrypted backup stream (bad magic)")]
    BadMagic,

    /// Stream ended before an authenticated final chunk. Either the upload
    /// was cut short or an attacker truncated the stream; both invalidate
    /// the whole backup.
    #[error("encrypted stream truncated before final chunk")]
    Truncated,

    /// A chunk failed authentication. No plaintext from the failing chunk is
    /// ever surfaced.
    #[error("chunk authentication failed")]
    Integrity,

    /// A chunk declared a length over the fixed chunk bound. Rejected before
    /// allocation.
    #[error("chunk of {size} bytes exceeds maximum {max}")]
    OversizedChunk {
        /// Declared ciphertext length
        size: usize,
        /// Maximum allowed ciphertext length
        max: usize,
    },

    /// Structurally broken envelope framing.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// Underlying I/O failure.
    #[error("envelope i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Boundary conversion so [`crate::EnvelopeReader`] can implement
/// `std::io::Read`. The original error stays attached as the source, so
/// callers can downcast to distinguish integrity failures from plain decode
/// errors.
impl From<EnvelopeError> for io::Error {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Io(io) => io,
            EnvelopeError::Truncated => Self::new(io::ErrorKind::UnexpectedEof, err),
            _ => Self::new(io::ErrorKind::InvalidData, err),
        }
    }
}
