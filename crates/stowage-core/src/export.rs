//! The export walk: local stores to an ordered frame stream.
//!
//! Export is strictly sequential and read-only against the stores. Ordering
//! is a wire contract: exactly one account frame first, the self recipient
//! before all other recipients, chats before any message that references
//! them, messages in chat-then-timestamp order. Cancellation is checked
//! between frames, so a cancelled export always ends at a frame boundary.

use std::io::Write;

use stowage_proto::{
    ContainerWriter, Frame,
    payloads::{
        AccountData, BackupPlan, BackupPurpose, Chat, ChatFolder, ChatItem, FilesEntry,
        NotificationProfile, Recipient, StickerPack,
    },
};
use tracing::debug;

use crate::{
    attachments::{AttachmentBackupStore, AttachmentByteCounter},
    cancel::CancelCheck,
    error::ArchiveError,
    records::{
        ChatFolderRecord, ChatRecord, MessageRecord, NotificationProfileRecord, RecipientRecord,
        StickerPackRecord,
    },
    store::{ChatStore, RecipientStore, SettingsStore},
};

/// Archive format version this writer emits and the newest version readers
/// accept.
pub const ARCHIVE_VERSION: u64 = 1;

/// Fixed per-object overhead of the remote media encryption layer, in bytes.
/// Pointer `ciphertext_len` is always `plaintext_len` plus this.
pub const MEDIA_OBJECT_OVERHEAD: u64 = 16;

/// Account-level inputs for one export run.
#[derive(Debug, Clone)]
pub struct ExportState {
    /// Whether to export message history or media references only.
    pub purpose: BackupPurpose,
    /// Plan level at export time.
    pub plan: BackupPlan,
    /// Era string binding this generation's media objects.
    pub upload_era: String,
    /// Wall-clock export start, milliseconds since the epoch.
    pub backup_time_ms: u64,
    /// Account username, if set.
    pub username: Option<String>,
    /// Profile given name.
    pub given_name: String,
    /// Profile family name.
    pub family_name: String,
}

/// Walks the local stores and emits the frame stream.
#[derive(Debug)]
pub struct ArchiveWriter<'a, S> {
    store: &'a S,
    media: &'a AttachmentBackupStore,
    counter: &'a AttachmentByteCounter,
}

impl<'a, S> ArchiveWriter<'a, S>
where
    S: RecipientStore + ChatStore + SettingsStore,
{
    /// Wire up an export over the given stores.
    pub fn new(
        store: &'a S,
        media: &'a AttachmentBackupStore,
        counter: &'a AttachmentByteCounter,
    ) -> Self {
        Self { store, media, counter }
    }

    /// Run one export into `sink`. Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::MissingSelfRecipient`] if no recipient is marked as
    ///   the account owner
    /// - [`ArchiveError::Cancelled`] when `cancel` fires; the sink holds a
    ///   whole number of frames and must be discarded by the caller
    /// - [`ArchiveError::Store`] / [`ArchiveError::Io`] on collaborator
    ///   failure; no partial-output repair is attempted
    pub fn export<W: Write>(
        &self,
        state: &ExportState,
        sink: W,
        cancel: &impl CancelCheck,
    ) -> Result<u64, ArchiveError> {
        let mut writer = ContainerWriter::new(sink);

        self.write_frame(&mut writer, account_frame(state), cancel)?;

        match state.purpose {
            BackupPurpose::Messages => self.export_messages(&mut writer, cancel)?,
            BackupPurpose::MediaOnly => self.export_media_entries(&mut writer, cancel)?,
        }

        writer.flush()?;
        let total = writer.frames_written();
        debug!(total_frames = total, purpose = ?state.purpose, "export complete");
        Ok(total)
    }

    fn export_messages<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
        cancel: &impl CancelCheck,
    ) -> Result<(), ArchiveError> {
        let recipients = self.store.enumerate_recipients()?;
        let own = recipients
            .iter()
            .find(|r| r.is_self)
            .ok_or(ArchiveError::MissingSelfRecipient)?;

        self.write_frame(writer, Frame::Recipient(recipient_payload(own)), cancel)?;
        for recipient in recipients.iter().filter(|r| !r.is_self) {
            self.write_frame(writer, Frame::Recipient(recipient_payload(recipient)), cancel)?;
        }

        let chats = self.store.enumerate_chats()?;
        for chat in &chats {
            self.write_frame(writer, Frame::Chat(chat_payload(chat)), cancel)?;
        }

        for pack in self.store.enumerate_sticker_packs()? {
            self.write_frame(writer, Frame::StickerPack(sticker_pack_payload(&pack)), cancel)?;
        }
        for profile in self.store.enumerate_notification_profiles()? {
            self.write_frame(
                writer,
                Frame::NotificationProfile(notification_profile_payload(&profile)),
                cancel,
            )?;
        }
        for folder in self.store.enumerate_chat_folders()? {
            self.write_frame(writer, Frame::ChatFolder(chat_folder_payload(&folder)), cancel)?;
        }

        // Messages come last, in chat-then-timestamp order; the heavy tail
        // of the stream, behind every lighter frame a resumed restore needs.
        for chat in &chats {
            for message in self.store.enumerate_messages(chat.chat_id)? {
                let item = self.chat_item_payload(&message);
                self.write_frame(writer, Frame::ChatItem(item), cancel)?;
            }
        }

        Ok(())
    }

    /// Media-only purpose: no history frames at all, one `FilesEntry` per
    /// attachment across every chat.
    fn export_media_entries<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
        cancel: &impl CancelCheck,
    ) -> Result<(), ArchiveError> {
        for chat in self.store.enumerate_chats()? {
            for message in self.store.enumerate_messages(chat.chat_id)? {
                for attachment in &message.attachments {
                    let entry = FilesEntry {
                        pointer: self.media.pointer_for(attachment, self.counter),
                        chat_id: Some(chat.chat_id),
                    };
                    self.write_frame(writer, Frame::FilesEntry(entry), cancel)?;
                }
            }
        }
        Ok(())
    }

    fn chat_item_payload(&self, message: &MessageRecord) -> ChatItem {
        ChatItem {
            chat_id: message.chat_id,
            author_service_id: message.author.as_str().to_string(),
            sent_at_ms: message.sent_at_ms,
            body: message.body.clone(),
            attachments: message
                .attachments
                .iter()
                .map(|a| self.media.pointer_for(a, self.counter))
                .collect(),
        }
    }

    fn write_frame<W: Write>(
        &self,
        writer: &mut ContainerWriter<W>,
        frame: Frame,
        cancel: &impl CancelCheck,
    ) -> Result<(), ArchiveError> {
        if cancel.is_cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        writer.write_frame(&frame)?;
        Ok(())
    }
}

fn account_frame(state: &ExportState) -> Frame {
    Frame::Account(AccountData {
        version: ARCHIVE_VERSION,
        backup_time_ms: state.backup_time_ms,
        purpose: state.purpose,
        plan: state.plan,
        upload_era: state.upload_era.clone(),
        username: state.username.clone(),
        given_name: state.given_name.clone(),
        family_name: state.family_name.clone(),
    })
}

fn recipient_payload(record: &RecipientRecord) -> Recipient {
    Recipient {
        service_id: record.service_id.as_str().to_string(),
        e164: record.e164.clone(),
        given_name: record.given_name.clone(),
        family_name: record.family_name.clone(),
        is_self: record.is_self,
        registered: record.registered,
    }
}

fn chat_payload(record: &ChatRecord) -> Chat {
    Chat {
        chat_id: record.chat_id,
        recipient_service_id: record.recipient.as_str().to_string(),
        archived: record.archived,
        pinned_order: record.pinned_order,
        expiration_timer_ms: record.expiration_timer_ms,
    }
}

fn sticker_pack_payload(record: &StickerPackRecord) -> StickerPack {
    StickerPack {
        pack_id: record.pack_id.clone(),
        pack_key: record.pack_key.clone(),
        title: record.title.clone(),
    }
}

fn notification_profile_payload(record: &NotificationProfileRecord) -> NotificationProfile {
    NotificationProfile {
        name: record.name.clone(),
        allowed_service_ids: record.allowed.iter().map(|id| id.as_str().to_string()).collect(),
        schedule_enabled: record.schedule_enabled,
        schedule_start_minute: record.schedule_start_minute,
        schedule_end_minute: record.schedule_end_minute,
    }
}

fn chat_folder_payload(record: &ChatFolderRecord) -> ChatFolder {
    ChatFolder {
        name: record.name.clone(),
        chat_ids: record.chat_ids.clone(),
        show_only_unread: record.show_only_unread,
    }
}
