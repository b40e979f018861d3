//! Per-kind frame handlers.
//!
//! Every handler is idempotent: identity comes from frame content, so
//! replaying a frame upserts instead of duplicating. Handlers report
//! dependency gaps as skips; only store failures abort the run.

use tracing::warn;

use super::{SkipReason, context::RestoreContext};
use crate::{
    attachments::{AttachmentByteCounter, create_placeholder, pointer_address},
    error::ArchiveError,
    records::{
        AttachmentId, AttachmentRecord, ChatFolderRecord, ChatRecord, MessageRecord,
        NotificationProfileRecord, RecipientRecord, ServiceId, StickerPackRecord,
    },
    store::{AttachmentStore, ChatStore, RecipientStore, SettingsStore},
};

/// What applying one frame did.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Outcome {
    Applied,
    Skipped(SkipReason),
}

pub(super) fn apply_recipient(
    store: &impl RecipientStore,
    ctx: &mut RestoreContext,
    payload: stowage_proto::payloads::Recipient,
) -> Result<Outcome, ArchiveError> {
    let id = ServiceId::new(payload.service_id);
    ctx.note_recipient(id.clone());
    store.upsert_recipient(RecipientRecord {
        service_id: id,
        e164: payload.e164,
        given_name: payload.given_name,
        family_name: payload.family_name,
        is_self: payload.is_self,
        registered: payload.registered,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn apply_chat<S: RecipientStore + ChatStore>(
    store: &S,
    ctx: &mut RestoreContext,
    payload: stowage_proto::payloads::Chat,
) -> Result<Outcome, ArchiveError> {
    let recipient = ServiceId::new(payload.recipient_service_id);
    if !recipient_known(store, ctx, &recipient)? {
        warn!(chat_id = payload.chat_id, recipient = %recipient, "chat references unknown recipient, skipping");
        return Ok(Outcome::Skipped(SkipReason::RecipientMissing));
    }

    ctx.note_chat(payload.chat_id);
    store.upsert_chat(ChatRecord {
        chat_id: payload.chat_id,
        recipient,
        archived: payload.archived,
        pinned_order: payload.pinned_order,
        expiration_timer_ms: payload.expiration_timer_ms,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn apply_chat_item<S>(
    store: &S,
    ctx: &mut RestoreContext,
    counter: &AttachmentByteCounter,
    payload: stowage_proto::payloads::ChatItem,
) -> Result<Outcome, ArchiveError>
where
    S: RecipientStore + ChatStore + AttachmentStore,
{
    if !chat_known(store, ctx, payload.chat_id)? {
        warn!(chat_id = payload.chat_id, "message references unknown chat, skipping");
        return Ok(Outcome::Skipped(SkipReason::ChatMissing));
    }

    let author = ServiceId::new(payload.author_service_id);
    if !recipient_known(store, ctx, &author)? {
        warn!(author = %author, "message references unknown recipient, skipping");
        return Ok(Outcome::Skipped(SkipReason::RecipientMissing));
    }

    // Validate every pointer before registering anything: a bad pointer
    // skips the whole frame, and a skipped frame must leave no placeholders
    // or planned-byte accounting behind.
    if payload.attachments.iter().any(|p| pointer_address(p).is_none()) {
        warn!(chat_id = payload.chat_id, "malformed attachment pointer, skipping message");
        return Ok(Outcome::Skipped(SkipReason::HandlerFailed));
    }

    let mut attachments = Vec::with_capacity(payload.attachments.len());
    for pointer in &payload.attachments {
        let address = create_placeholder(pointer, &ctx.upload_era, store, counter)?;
        attachments.push(AttachmentRecord {
            attachment_id: AttachmentId::for_address(&address),
            plaintext_len: pointer.plaintext_len,
        });
    }

    store.upsert_message(MessageRecord {
        chat_id: payload.chat_id,
        author,
        sent_at_ms: payload.sent_at_ms,
        body: payload.body,
        attachments,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn apply_files_entry(
    store: &impl AttachmentStore,
    ctx: &RestoreContext,
    counter: &AttachmentByteCounter,
    payload: stowage_proto::payloads::FilesEntry,
) -> Result<Outcome, ArchiveError> {
    match create_placeholder(&payload.pointer, &ctx.upload_era, store, counter) {
        Ok(_) => Ok(Outcome::Applied),
        Err(crate::attachments::AttachmentError::BadAddress) => {
            warn!("malformed standalone media pointer, skipping");
            Ok(Outcome::Skipped(SkipReason::HandlerFailed))
        },
        Err(crate::attachments::AttachmentError::Store(err)) => Err(ArchiveError::Store(err)),
    }
}

pub(super) fn apply_sticker_pack(
    store: &impl SettingsStore,
    payload: stowage_proto::payloads::StickerPack,
) -> Result<Outcome, ArchiveError> {
    store.upsert_sticker_pack(StickerPackRecord {
        pack_id: payload.pack_id,
        pack_key: payload.pack_key,
        title: payload.title,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn apply_notification_profile(
    store: &impl SettingsStore,
    payload: stowage_proto::payloads::NotificationProfile,
) -> Result<Outcome, ArchiveError> {
    store.upsert_notification_profile(NotificationProfileRecord {
        name: payload.name,
        allowed: payload.allowed_service_ids.into_iter().map(ServiceId::new).collect(),
        schedule_enabled: payload.schedule_enabled,
        schedule_start_minute: payload.schedule_start_minute,
        schedule_end_minute: payload.schedule_end_minute,
    })?;
    Ok(Outcome::Applied)
}

pub(super) fn apply_chat_folder(
    store: &impl SettingsStore,
    payload: stowage_proto::payloads::ChatFolder,
) -> Result<Outcome, ArchiveError> {
    store.upsert_chat_folder(ChatFolderRecord {
        name: payload.name,
        chat_ids: payload.chat_ids,
        show_only_unread: payload.show_only_unread,
    })?;
    Ok(Outcome::Applied)
}

/// A recipient counts as known if this run applied it or the store already
/// holds it (restore into a non-empty store).
fn recipient_known(
    store: &impl RecipientStore,
    ctx: &RestoreContext,
    id: &ServiceId,
) -> Result<bool, ArchiveError> {
    if ctx.knows_recipient(id) {
        return Ok(true);
    }
    Ok(store.fetch_recipient(id)?.is_some())
}

fn chat_known(
    store: &impl ChatStore,
    ctx: &RestoreContext,
    chat_id: u64,
) -> Result<bool, ArchiveError> {
    if ctx.knows_chat(chat_id) {
        return Ok(true);
    }
    Ok(store.fetch_chat(chat_id)?.is_some())
}
