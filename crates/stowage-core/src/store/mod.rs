//! Store seams the engine depends on.
//!
//! The engine never issues raw queries against local storage; it depends
//! only on these narrow, injected trait handles so tests can substitute
//! in-memory fakes. Upserts are keyed on content-derived identity (service
//! id, chat id, message triple), which is what makes restore idempotent:
//! re-processing the same frame must never duplicate data.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;
use stowage_crypto::ContentAddress;

use crate::records::{
    AttachmentId, ChatFolderRecord, ChatRecord, MessageRecord, NotificationProfileRecord,
    PlaceholderRecord, RecipientRecord, ServiceId, StickerPackRecord,
};

/// Recipient read/enumerate/upsert access.
pub trait RecipientStore: Send + Sync {
    /// Every locally known recipient, in a stable order.
    fn enumerate_recipients(&self) -> Result<Vec<RecipientRecord>, StoreError>;

    /// Look up one recipient by stable service identifier.
    fn fetch_recipient(&self, service_id: &ServiceId)
    -> Result<Option<RecipientRecord>, StoreError>;

    /// Insert or replace a recipient, keyed on its service identifier.
    fn upsert_recipient(&self, record: RecipientRecord) -> Result<(), StoreError>;
}

/// Chat and message read/enumerate/upsert access.
pub trait ChatStore: Send + Sync {
    /// Every chat, ordered by chat id. Stable ordering lets an interrupted
    /// restore resume from the last fully-written chat.
    fn enumerate_chats(&self) -> Result<Vec<ChatRecord>, StoreError>;

    /// Look up one chat by id.
    fn fetch_chat(&self, chat_id: u64) -> Result<Option<ChatRecord>, StoreError>;

    /// Messages of one chat, ordered by sender timestamp.
    fn enumerate_messages(&self, chat_id: u64) -> Result<Vec<MessageRecord>, StoreError>;

    /// Insert or replace a chat, keyed on its chat id.
    fn upsert_chat(&self, record: ChatRecord) -> Result<(), StoreError>;

    /// Insert or replace a message, keyed on `(chat_id, author, sent_at_ms)`.
    fn upsert_message(&self, record: MessageRecord) -> Result<(), StoreError>;
}

/// Settings-adjacent records: sticker packs, notification profiles, chat
/// folders.
pub trait SettingsStore: Send + Sync {
    /// Every installed sticker pack.
    fn enumerate_sticker_packs(&self) -> Result<Vec<StickerPackRecord>, StoreError>;

    /// Insert or replace a sticker pack, keyed on its pack id.
    fn upsert_sticker_pack(&self, record: StickerPackRecord) -> Result<(), StoreError>;

    /// Every notification profile.
    fn enumerate_notification_profiles(&self)
    -> Result<Vec<NotificationProfileRecord>, StoreError>;

    /// Insert or replace a notification profile, keyed on its name.
    fn upsert_notification_profile(
        &self,
        record: NotificationProfileRecord,
    ) -> Result<(), StoreError>;

    /// Every chat folder.
    fn enumerate_chat_folders(&self) -> Result<Vec<ChatFolderRecord>, StoreError>;

    /// Insert or replace a chat folder, keyed on its name.
    fn upsert_chat_folder(&self, record: ChatFolderRecord) -> Result<(), StoreError>;
}

/// Placeholder registry for restored attachment pointers.
///
/// The engine registers placeholders; the external download pipeline calls
/// [`AttachmentStore::mark_materialized`] once bytes are available. The
/// engine itself never invokes that callback.
pub trait AttachmentStore: Send + Sync {
    /// Register a pointer to remote media without downloading it. Keyed on
    /// the content address; re-registering is a no-op for an already
    /// materialized placeholder.
    fn register_placeholder(&self, record: PlaceholderRecord) -> Result<(), StoreError>;

    /// Look up one placeholder by content address.
    fn fetch_placeholder(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<PlaceholderRecord>, StoreError>;

    /// Every registered placeholder, materialized or not.
    fn enumerate_placeholders(&self) -> Result<Vec<PlaceholderRecord>, StoreError>;

    /// Record that the download pipeline materialized the placeholder's
    /// bytes under a local attachment id.
    fn mark_materialized(
        &self,
        address: &ContentAddress,
        local_id: AttachmentId,
    ) -> Result<(), StoreError>;
}
