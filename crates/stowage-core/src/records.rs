//! Local store records.
//!
//! These are the shapes the engine reads from and writes to the injected
//! stores. They deliberately mirror the frame payloads field-for-field where
//! the data survives a round trip, but they are distinct types: payloads are
//! wire format, records are local state.

use std::fmt;

use serde::{Deserialize, Serialize};
use stowage_crypto::ContentAddress;

/// Stable service identifier for a recipient. Never an ephemeral row id;
/// retried or out-of-order frame processing must resolve the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId(String);

impl ServiceId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable per-attachment identifier. Media content addresses are a pure
/// function of this id and the root secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(String);

impl AttachmentId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as bytes, for key derivation.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic local identifier for an attachment restored from a
    /// content address. The original id does not survive the one-way
    /// derivation, so the address itself becomes the identity; replaying the
    /// same frame produces the same id.
    pub fn for_address(address: &ContentAddress) -> Self {
        let mut id = String::with_capacity(6 + address.as_bytes().len() * 2);
        id.push_str("media:");
        for byte in address.as_bytes() {
            let _ = fmt::Write::write_fmt(&mut id, format_args!("{byte:02x}"));
        }
        Self(id)
    }
}

/// A recipient as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Stable service identifier; the record's identity.
    pub service_id: ServiceId,
    /// E.164 phone number, if known.
    pub e164: Option<String>,
    /// Profile given name, if shared.
    pub given_name: Option<String>,
    /// Profile family name, if shared.
    pub family_name: Option<String>,
    /// Whether this is the account owner.
    pub is_self: bool,
    /// Whether the recipient is currently registered.
    pub registered: bool,
}

/// A conversation thread as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Chat identifier; the record's identity.
    pub chat_id: u64,
    /// Recipient the chat is with.
    pub recipient: ServiceId,
    /// Whether the chat is archived.
    pub archived: bool,
    /// Pin position, if pinned.
    pub pinned_order: Option<u32>,
    /// Disappearing-message timer, if enabled.
    pub expiration_timer_ms: Option<u64>,
}

/// A message as stored locally. Identity is `(chat_id, author, sent_at_ms)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Chat this message belongs to.
    pub chat_id: u64,
    /// Message author.
    pub author: ServiceId,
    /// Sender timestamp in milliseconds; part of the identity.
    pub sent_at_ms: u64,
    /// Message text, if any.
    pub body: Option<String>,
    /// Attachments on this message.
    pub attachments: Vec<AttachmentRecord>,
}

/// An attachment reference on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    /// Stable attachment identifier.
    pub attachment_id: AttachmentId,
    /// Plaintext length in bytes.
    pub plaintext_len: u64,
}

/// An installed sticker pack as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerPackRecord {
    /// Pack identifier; the record's identity.
    pub pack_id: Vec<u8>,
    /// Pack decryption key.
    pub pack_key: Vec<u8>,
    /// Display title.
    pub title: String,
}

/// A notification profile as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationProfileRecord {
    /// Profile name; the record's identity.
    pub name: String,
    /// Service ids allowed to break through.
    pub allowed: Vec<ServiceId>,
    /// Whether the schedule is enabled.
    pub schedule_enabled: bool,
    /// Schedule start, minutes after midnight.
    pub schedule_start_minute: u16,
    /// Schedule end, minutes after midnight.
    pub schedule_end_minute: u16,
}

/// A chat folder as stored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFolderRecord {
    /// Folder name; the record's identity.
    pub name: String,
    /// Chats in the folder.
    pub chat_ids: Vec<u64>,
    /// Whether the folder shows only unread chats.
    pub show_only_unread: bool,
}

/// A pointer to remote media registered during restore, before (and possibly
/// without) its bytes being downloaded. A restore is complete even while
/// placeholders are still unmaterialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRecord {
    /// Content address of the remote object.
    pub address: ContentAddress,
    /// Era string binding the object to a backup generation.
    pub upload_era: String,
    /// Plaintext length in bytes.
    pub plaintext_len: u64,
    /// Remote ciphertext length in bytes.
    pub ciphertext_len: u64,
    /// Local attachment id once the download pipeline materializes the
    /// bytes; `None` while pending.
    pub materialized_as: Option<AttachmentId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_derived_ids_are_stable() {
        let address = ContentAddress::from_slice(&[0xAB; 16]).unwrap();
        let a = AttachmentId::for_address(&address);
        let b = AttachmentId::for_address(&address);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "media:abababababababababababababababab");
    }
}
