//! Entity payloads carried by backup frames.
//!
//! Frame kind tags are raw binary (for skip-without-parse forward
//! compatibility) but payload bodies are CBOR for type safety: field names
//! travel with the data, so an older writer's body still decodes under a
//! newer reader as long as new fields are optional.
//!
//! Payloads carry no independent identity. Identity is derived from content:
//! a recipient is its service id, a chat is its chat id, a message is its
//! `(chat, author, sent_at)` triple. Restoring the same payload twice must
//! therefore upsert, never duplicate.

pub mod account;
pub mod chat;
pub mod extras;
pub mod media;
pub mod recipient;

pub use account::{AccountData, BackupPlan, BackupPurpose};
pub use chat::{Chat, ChatItem};
pub use extras::{ChatFolder, NotificationProfile, StickerPack};
pub use media::{AttachmentPointer, FilesEntry};
pub use recipient::Recipient;
