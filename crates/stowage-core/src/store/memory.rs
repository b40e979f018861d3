//! In-memory store implementation for tests and simulation.

#![allow(clippy::expect_used, reason = "Poisoned mutex panics are acceptable in test stores")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use stowage_crypto::ContentAddress;

use super::{
    AttachmentStore, ChatStore, RecipientStore, SettingsStore, StoreError,
};
use crate::records::{
    AttachmentId, ChatFolderRecord, ChatRecord, MessageRecord, NotificationProfileRecord,
    PlaceholderRecord, RecipientRecord, ServiceId, StickerPackRecord,
};

/// In-memory implementation of every store seam.
///
/// All state lives behind one `Arc<Mutex<_>>` so clones share the same
/// underlying store, mirroring how a real database handle behaves. Uses
/// `lock().expect()`, which panics on a poisoned mutex; acceptable for
/// test/simulation code.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    recipients: Vec<RecipientRecord>,
    chats: Vec<ChatRecord>,
    /// Messages per chat, kept sorted by `sent_at_ms`.
    messages: HashMap<u64, Vec<MessageRecord>>,
    sticker_packs: Vec<StickerPackRecord>,
    notification_profiles: Vec<NotificationProfileRecord>,
    chat_folders: Vec<ChatFolderRecord>,
    placeholders: HashMap<[u8; 16], PlaceholderRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recipients currently stored.
    pub fn recipient_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").recipients.len()
    }

    /// Number of chats currently stored.
    pub fn chat_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").chats.len()
    }

    /// Total number of messages across all chats.
    pub fn message_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").messages.values().map(Vec::len).sum()
    }

    /// Number of registered placeholders.
    pub fn placeholder_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").placeholders.len()
    }
}

impl RecipientStore for MemoryStore {
    fn enumerate_recipients(&self) -> Result<Vec<RecipientRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").recipients.clone())
    }

    fn fetch_recipient(
        &self,
        service_id: &ServiceId,
    ) -> Result<Option<RecipientRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.recipients.iter().find(|r| &r.service_id == service_id).cloned())
    }

    fn upsert_recipient(&self, record: RecipientRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        match inner.recipients.iter_mut().find(|r| r.service_id == record.service_id) {
            Some(existing) => *existing = record,
            None => inner.recipients.push(record),
        }
        Ok(())
    }
}

impl ChatStore for MemoryStore {
    fn enumerate_chats(&self) -> Result<Vec<ChatRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        let mut chats = inner.chats.clone();
        chats.sort_by_key(|c| c.chat_id);
        Ok(chats)
    }

    fn fetch_chat(&self, chat_id: u64) -> Result<Option<ChatRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.chats.iter().find(|c| c.chat_id == chat_id).cloned())
    }

    fn enumerate_messages(&self, chat_id: u64) -> Result<Vec<MessageRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.messages.get(&chat_id).cloned().unwrap_or_default())
    }

    fn upsert_chat(&self, record: ChatRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        match inner.chats.iter_mut().find(|c| c.chat_id == record.chat_id) {
            Some(existing) => *existing = record,
            None => inner.chats.push(record),
        }
        Ok(())
    }

    fn upsert_message(&self, record: MessageRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let messages = inner.messages.entry(record.chat_id).or_default();
        match messages
            .iter_mut()
            .find(|m| m.author == record.author && m.sent_at_ms == record.sent_at_ms)
        {
            Some(existing) => *existing = record,
            None => {
                messages.push(record);
                messages.sort_by_key(|m| m.sent_at_ms);
            },
        }
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn enumerate_sticker_packs(&self) -> Result<Vec<StickerPackRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").sticker_packs.clone())
    }

    fn upsert_sticker_pack(&self, record: StickerPackRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        match inner.sticker_packs.iter_mut().find(|p| p.pack_id == record.pack_id) {
            Some(existing) => *existing = record,
            None => inner.sticker_packs.push(record),
        }
        Ok(())
    }

    fn enumerate_notification_profiles(
        &self,
    ) -> Result<Vec<NotificationProfileRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").notification_profiles.clone())
    }

    fn upsert_notification_profile(
        &self,
        record: NotificationProfileRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        match inner.notification_profiles.iter_mut().find(|p| p.name == record.name) {
            Some(existing) => *existing = record,
            None => inner.notification_profiles.push(record),
        }
        Ok(())
    }

    fn enumerate_chat_folders(&self) -> Result<Vec<ChatFolderRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").chat_folders.clone())
    }

    fn upsert_chat_folder(&self, record: ChatFolderRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        match inner.chat_folders.iter_mut().find(|f| f.name == record.name) {
            Some(existing) => *existing = record,
            None => inner.chat_folders.push(record),
        }
        Ok(())
    }
}

impl AttachmentStore for MemoryStore {
    fn register_placeholder(&self, record: PlaceholderRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let key = *record.address.as_bytes();
        // A materialized placeholder wins over a re-registration from a
        // replayed frame.
        let keep_existing =
            inner.placeholders.get(&key).is_some_and(|p| p.materialized_as.is_some());
        if !keep_existing {
            inner.placeholders.insert(key, record);
        }
        Ok(())
    }

    fn fetch_placeholder(
        &self,
        address: &ContentAddress,
    ) -> Result<Option<PlaceholderRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.placeholders.get(address.as_bytes()).cloned())
    }

    fn enumerate_placeholders(&self) -> Result<Vec<PlaceholderRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").placeholders.values().cloned().collect())
    }

    fn mark_materialized(
        &self,
        address: &ContentAddress,
        local_id: AttachmentId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let record = inner
            .placeholders
            .get_mut(address.as_bytes())
            .ok_or(StoreError::PlaceholderMissing)?;
        record.materialized_as = Some(local_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(id: &str) -> RecipientRecord {
        RecipientRecord {
            service_id: ServiceId::new(id),
            e164: None,
            given_name: None,
            family_name: None,
            is_self: false,
            registered: true,
        }
    }

    #[test]
    fn recipient_upsert_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert_recipient(recipient("aci:a")).unwrap();
        store.upsert_recipient(recipient("aci:a")).unwrap();
        assert_eq!(store.recipient_count(), 1);
    }

    #[test]
    fn message_upsert_keys_on_identity_triple() {
        let store = MemoryStore::new();
        let message = MessageRecord {
            chat_id: 1,
            author: ServiceId::new("aci:a"),
            sent_at_ms: 100,
            body: Some("hi".to_string()),
            attachments: Vec::new(),
        };
        store.upsert_message(message.clone()).unwrap();
        store.upsert_message(message).unwrap();
        assert_eq!(store.message_count(), 1);
    }

    #[test]
    fn messages_enumerate_in_timestamp_order() {
        let store = MemoryStore::new();
        for sent_at_ms in [300u64, 100, 200] {
            store
                .upsert_message(MessageRecord {
                    chat_id: 1,
                    author: ServiceId::new("aci:a"),
                    sent_at_ms,
                    body: None,
                    attachments: Vec::new(),
                })
                .unwrap();
        }
        let timestamps: Vec<u64> =
            store.enumerate_messages(1).unwrap().iter().map(|m| m.sent_at_ms).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[test]
    fn materialized_placeholder_survives_replayed_registration() {
        let store = MemoryStore::new();
        let address = ContentAddress::from_slice(&[1; 16]).unwrap();
        let record = PlaceholderRecord {
            address,
            upload_era: "era-1".to_string(),
            plaintext_len: 10,
            ciphertext_len: 26,
            materialized_as: None,
        };

        store.register_placeholder(record.clone()).unwrap();
        store.mark_materialized(&address, AttachmentId::new("local-1")).unwrap();
        store.register_placeholder(record).unwrap();

        let fetched = store.fetch_placeholder(&address).unwrap().unwrap();
        assert_eq!(fetched.materialized_as, Some(AttachmentId::new("local-1")));
    }

    #[test]
    fn marking_an_unregistered_placeholder_fails() {
        let store = MemoryStore::new();
        let address = ContentAddress::from_slice(&[2; 16]).unwrap();
        let result = store.mark_materialized(&address, AttachmentId::new("local-1"));
        assert_eq!(result, Err(StoreError::PlaceholderMissing));
    }
}
