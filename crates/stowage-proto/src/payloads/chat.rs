//! Chat and message payloads.

use serde::{Deserialize, Serialize};

use super::media::AttachmentPointer;

/// A conversation thread.
///
/// Identity is `chat_id`, an identifier stable within one archive stream.
/// The exporter assigns chat ids before any message frame references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Archive-stable chat identifier. The frame's identity.
    pub chat_id: u64,

    /// Service id of the recipient this chat is with.
    pub recipient_service_id: String,

    /// Whether the chat is archived in the chat list.
    pub archived: bool,

    /// Pin position, if the chat is pinned.
    pub pinned_order: Option<u32>,

    /// Disappearing-message timer, if enabled.
    pub expiration_timer_ms: Option<u64>,
}

/// A single message within a chat.
///
/// Identity is the `(chat_id, author_service_id, sent_at_ms)` triple; replayed
/// frames with the same triple upsert rather than duplicate. Messages are
/// exported in chat-then-timestamp order so an interrupted restore can resume
/// from the last fully-written chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatItem {
    /// Chat this message belongs to. Must reference an earlier `Chat` frame.
    pub chat_id: u64,

    /// Service id of the message author. Must reference an earlier
    /// `Recipient` frame.
    pub author_service_id: String,

    /// Sender timestamp in milliseconds. Part of the message identity.
    pub sent_at_ms: u64,

    /// Message text, if any.
    pub body: Option<String>,

    /// Attachments carried by this message, as content-addressed pointers.
    /// Raw plaintext keys never travel here; only derived media material.
    pub attachments: Vec<AttachmentPointer>,
}
