//! Attachment pointer payloads.

use serde::{Deserialize, Serialize};

/// A content-addressed reference to a remote media object.
///
/// The `media_id` and key material are pure functions of the root secret and
/// the attachment's stable identifier, so a re-export maps the same logical
/// attachment to the same remote object name. That determinism is what makes
/// dedup and resumable restores work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPointer {
    /// Content address of the remote media object (16 bytes).
    pub media_id: Vec<u8>,

    /// Derived AES key for the media object (32 bytes).
    pub aes_key: Vec<u8>,

    /// Derived MAC key for the media object (32 bytes).
    pub mac_key: Vec<u8>,

    /// Plaintext length of the attachment in bytes.
    pub plaintext_len: u64,

    /// Ciphertext length of the remote object in bytes.
    pub ciphertext_len: u64,
}

/// A standalone media entry.
///
/// Media-only backups omit message history framing entirely; every attachment
/// is represented by one `FilesEntry` instead of riding inside a `ChatItem`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesEntry {
    /// Pointer to the remote media object.
    pub pointer: AttachmentPointer,

    /// Chat the attachment originated from, when known.
    pub chat_id: Option<u64>,
}
