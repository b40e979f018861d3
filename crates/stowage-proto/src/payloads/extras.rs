//! Settings-adjacent payloads: sticker packs, notification profiles, chat
//! folders.

use serde::{Deserialize, Serialize};

/// An installed sticker pack reference.
///
/// Only the pack identity and key are archived; pack contents are
/// re-downloaded after restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerPack {
    /// Pack identifier. The frame's identity.
    pub pack_id: Vec<u8>,

    /// Pack decryption key.
    pub pack_key: Vec<u8>,

    /// Display title of the pack.
    pub title: String,
}

/// A notification profile (scheduled quiet hours with an allow list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationProfile {
    /// Profile name. The frame's identity.
    pub name: String,

    /// Service ids allowed to break through the profile.
    pub allowed_service_ids: Vec<String>,

    /// Whether the schedule is enabled.
    pub schedule_enabled: bool,

    /// Schedule start, minutes after midnight.
    pub schedule_start_minute: u16,

    /// Schedule end, minutes after midnight.
    pub schedule_end_minute: u16,
}

/// A chat folder grouping chats in the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFolder {
    /// Folder name. The frame's identity.
    pub name: String,

    /// Chats contained in the folder, by archive chat id.
    pub chat_ids: Vec<u64>,

    /// Whether the folder shows only unread chats.
    pub show_only_unread: bool,
}
