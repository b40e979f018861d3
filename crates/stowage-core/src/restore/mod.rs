//! The restore state machine: a frame stream back into local state.
//!
//! Reading is a pure state machine over the frame sequence:
//!
//! ```text
//! ExpectAccountData --Account--> Streaming --EOF--> Done
//!        |                          |
//!        +--anything else--+--fatal error--> Failed
//! ```
//!
//! Frame-level problems split into two classes. Fatal errors
//! ([`crate::ArchiveError`]) abort the run: undecodable bytes, integrity
//! failures, ordering violations, store failures. Everything else is a skip:
//! the frame is counted in the [`SkipLedger`] under its [`SkipReason`] and the
//! stream continues. A restore that skipped frames still completes.

mod context;
mod handlers;

use std::io::Read;

use context::RestoreContext;
use handlers::Outcome;
use stowage_proto::{ContainerReader, Frame, payloads::BackupPurpose};
use tracing::{debug, warn};

use crate::{
    attachments::AttachmentByteCounter,
    cancel::CancelCheck,
    error::ArchiveError,
    export::ARCHIVE_VERSION,
    store::{AttachmentStore, ChatStore, RecipientStore, SettingsStore},
};

/// Where the reader is in the stream lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Nothing read yet; the next frame must be the account header.
    ExpectAccountData,
    /// Header accepted; entity frames are being applied.
    Streaming,
    /// Stream ended cleanly after a valid header.
    Done,
    /// A fatal error ended the run. Whatever was applied before the failure
    /// stays in the store; retention is the caller's policy decision.
    Failed,
}

/// Why a frame was skipped instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Kind tag from a newer writer.
    UnknownFrame,
    /// Frame references a recipient that neither this run nor the store
    /// knows.
    RecipientMissing,
    /// Frame references a chat that neither this run nor the store knows.
    ChatMissing,
    /// The handler rejected the frame's content.
    HandlerFailed,
}

/// Skip counts per reason, accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipLedger {
    /// Frames with unrecognized kind tags.
    pub unknown_frame: u64,
    /// Frames referencing missing recipients.
    pub recipient_missing: u64,
    /// Frames referencing missing chats.
    pub chat_missing: u64,
    /// Frames rejected by their handler.
    pub handler_failed: u64,
}

impl SkipLedger {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::UnknownFrame => self.unknown_frame += 1,
            SkipReason::RecipientMissing => self.recipient_missing += 1,
            SkipReason::ChatMissing => self.chat_missing += 1,
            SkipReason::HandlerFailed => self.handler_failed += 1,
        }
    }

    /// Total frames skipped for any reason.
    pub fn total(&self) -> u64 {
        self.unknown_frame + self.recipient_missing + self.chat_missing + self.handler_failed
    }
}

/// What one restore run read and applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Frames read from the stream, including skipped ones.
    pub frames_read: u64,
    /// Recipient records applied.
    pub recipients_applied: u64,
    /// Chat records applied.
    pub chats_applied: u64,
    /// Message records applied.
    pub messages_applied: u64,
    /// Sticker pack records applied.
    pub sticker_packs_applied: u64,
    /// Notification profiles applied.
    pub notification_profiles_applied: u64,
    /// Chat folders applied.
    pub chat_folders_applied: u64,
    /// Attachment placeholders registered.
    pub placeholders_registered: u64,
    /// Skip counts per reason.
    pub skips: SkipLedger,
}

/// Drives one restore run over injected stores.
#[derive(Debug)]
pub struct ArchiveReader<'a, S> {
    store: &'a S,
    counter: &'a AttachmentByteCounter,
    state: ReaderState,
    context: Option<RestoreContext>,
    summary: RestoreSummary,
}

impl<'a, S> ArchiveReader<'a, S>
where
    S: RecipientStore + ChatStore + SettingsStore + AttachmentStore,
{
    /// Wire up a restore over the given stores.
    pub fn new(store: &'a S, counter: &'a AttachmentByteCounter) -> Self {
        Self {
            store,
            counter,
            state: ReaderState::ExpectAccountData,
            context: None,
            summary: RestoreSummary::default(),
        }
    }

    /// Current lifecycle state. After a failed [`ArchiveReader::restore`]
    /// this tells the caller how far the run got.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Frames read so far, including skipped ones. Meaningful both during
    /// and after a run.
    pub fn frames_read(&self) -> u64 {
        self.summary.frames_read
    }

    /// Snapshot of the run summary. After a failure this reflects everything
    /// applied before the failing frame.
    pub fn summary(&self) -> RestoreSummary {
        self.summary
    }

    /// Run one restore from `source` to completion or failure.
    ///
    /// On success returns the run summary; the reader is then `Done` and
    /// must not be reused. On error the reader is `Failed` and whatever was
    /// applied before the failure remains in the store.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::MissingAccountData`] if the header frame is absent,
    ///   late, or duplicated
    /// - [`ArchiveError::UnsupportedVersion`] for streams from newer writers
    /// - [`ArchiveError::Integrity`] / [`ArchiveError::Decode`] when the
    ///   stream's bytes are bad
    /// - [`ArchiveError::Store`] on collaborator failure
    /// - [`ArchiveError::Cancelled`] when `cancel` fires between frames
    pub fn restore<R: Read>(
        &mut self,
        source: R,
        cancel: &impl CancelCheck,
    ) -> Result<RestoreSummary, ArchiveError> {
        let mut reader = ContainerReader::new(source);

        loop {
            if cancel.is_cancelled() {
                return self.fail(ArchiveError::Cancelled);
            }

            let frame = match reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => return self.fail(err.into()),
            };

            self.summary.frames_read += 1;
            if let Err(err) = self.apply(frame) {
                return self.fail(err);
            }
        }

        if self.state != ReaderState::Streaming {
            // Empty stream: EOF before the header.
            return self.fail(ArchiveError::MissingAccountData);
        }

        self.state = ReaderState::Done;
        debug!(
            frames = self.summary.frames_read,
            skipped = self.summary.skips.total(),
            "restore complete"
        );
        Ok(self.summary)
    }

    fn apply(&mut self, frame: Frame) -> Result<(), ArchiveError> {
        if self.state == ReaderState::ExpectAccountData {
            let Frame::Account(account) = frame else {
                return Err(ArchiveError::MissingAccountData);
            };
            if account.version > ARCHIVE_VERSION {
                return Err(ArchiveError::UnsupportedVersion {
                    found: account.version,
                    supported: ARCHIVE_VERSION,
                });
            }
            self.context = Some(RestoreContext::from_account(&account));
            self.state = ReaderState::Streaming;
            return Ok(());
        }

        let Some(ctx) = self.context.as_mut() else {
            // Streaming without a context is a bug in this state machine,
            // not in the stream.
            return Err(ArchiveError::MissingAccountData);
        };

        // A media-only stream carries no history; a history frame in one is
        // out of contract and skipped, never applied.
        if ctx.purpose == BackupPurpose::MediaOnly && is_history_frame(&frame) {
            warn!(kind = frame.kind_tag(), "history frame in media-only stream, skipping");
            self.summary.skips.record(SkipReason::HandlerFailed);
            return Ok(());
        }

        let outcome = match frame {
            // A second header is an ordering violation.
            Frame::Account(_) => return Err(ArchiveError::MissingAccountData),
            Frame::Empty => Outcome::Applied,
            Frame::Unknown { kind } => {
                warn!(kind, "unknown frame kind, skipping");
                Outcome::Skipped(SkipReason::UnknownFrame)
            },
            Frame::Recipient(payload) => {
                let outcome = handlers::apply_recipient(self.store, ctx, payload)?;
                self.count(&outcome, |s| &mut s.recipients_applied);
                outcome
            },
            Frame::Chat(payload) => {
                let outcome = handlers::apply_chat(self.store, ctx, payload)?;
                self.count(&outcome, |s| &mut s.chats_applied);
                outcome
            },
            Frame::ChatItem(payload) => {
                let placeholders = payload.attachments.len() as u64;
                let outcome = handlers::apply_chat_item(self.store, ctx, self.counter, payload)?;
                if outcome == Outcome::Applied {
                    self.summary.placeholders_registered += placeholders;
                }
                self.count(&outcome, |s| &mut s.messages_applied);
                outcome
            },
            Frame::StickerPack(payload) => {
                let outcome = handlers::apply_sticker_pack(self.store, payload)?;
                self.count(&outcome, |s| &mut s.sticker_packs_applied);
                outcome
            },
            Frame::NotificationProfile(payload) => {
                let outcome = handlers::apply_notification_profile(self.store, payload)?;
                self.count(&outcome, |s| &mut s.notification_profiles_applied);
                outcome
            },
            Frame::ChatFolder(payload) => {
                let outcome = handlers::apply_chat_folder(self.store, payload)?;
                self.count(&outcome, |s| &mut s.chat_folders_applied);
                outcome
            },
            Frame::FilesEntry(payload) => {
                let outcome = handlers::apply_files_entry(self.store, ctx, self.counter, payload)?;
                if outcome == Outcome::Applied {
                    self.summary.placeholders_registered += 1;
                }
                outcome
            },
        };

        if let Outcome::Skipped(reason) = outcome {
            self.summary.skips.record(reason);
        }
        Ok(())
    }

    fn count(&mut self, outcome: &Outcome, field: impl FnOnce(&mut RestoreSummary) -> &mut u64) {
        if *outcome == Outcome::Applied {
            *field(&mut self.summary) += 1;
        }
    }

    fn fail(&mut self, err: ArchiveError) -> Result<RestoreSummary, ArchiveError> {
        self.state = ReaderState::Failed;
        Err(err)
    }
}

fn is_history_frame(frame: &Frame) -> bool {
    matches!(
        frame,
        Frame::Recipient(_)
            | Frame::Chat(_)
            | Frame::ChatItem(_)
            | Frame::StickerPack(_)
            | Frame::NotificationProfile(_)
            | Frame::ChatFolder(_)
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use stowage_proto::{
        ContainerWriter,
        payloads::{AccountData, AttachmentPointer, BackupPlan, Chat, ChatItem, Recipient},
    };

    use super::*;
    use crate::{cancel::NeverCancelled, store::MemoryStore};

    fn account_frame_for(version: u64, purpose: BackupPurpose) -> Frame {
        Frame::Account(AccountData {
            version,
            backup_time_ms: 1_700_000_000_000,
            purpose,
            plan: BackupPlan::Free,
            upload_era: "era-1".to_string(),
            username: None,
            given_name: "Ada".to_string(),
            family_name: "L".to_string(),
        })
    }

    fn account_frame(version: u64) -> Frame {
        account_frame_for(version, BackupPurpose::Messages)
    }

    fn recipient_frame(id: &str) -> Frame {
        Frame::Recipient(Recipient {
            service_id: id.to_string(),
            e164: None,
            given_name: None,
            family_name: None,
            is_self: true,
            registered: true,
        })
    }

    fn chat_frame(chat_id: u64, recipient: &str) -> Frame {
        Frame::Chat(Chat {
            chat_id,
            recipient_service_id: recipient.to_string(),
            archived: false,
            pinned_order: None,
            expiration_timer_ms: None,
        })
    }

    fn stream_of(frames: &[Frame]) -> Cursor<Vec<u8>> {
        let mut writer = ContainerWriter::new(Vec::new());
        for frame in frames {
            writer.write_frame(frame).unwrap();
        }
        Cursor::new(writer.finish().unwrap())
    }

    #[test]
    fn first_frame_must_be_account_data() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let result = reader.restore(stream_of(&[recipient_frame("aci:a")]), &NeverCancelled);
        assert!(matches!(result, Err(ArchiveError::MissingAccountData)));
        assert_eq!(reader.state(), ReaderState::Failed);
        assert_eq!(store.recipient_count(), 0);
    }

    #[test]
    fn empty_stream_is_rejected() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let result = reader.restore(Cursor::new(Vec::new()), &NeverCancelled);
        assert!(matches!(result, Err(ArchiveError::MissingAccountData)));
    }

    #[test]
    fn duplicate_account_frame_is_an_ordering_violation() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let stream = stream_of(&[account_frame(1), account_frame(1)]);
        let result = reader.restore(stream, &NeverCancelled);
        assert!(matches!(result, Err(ArchiveError::MissingAccountData)));
        assert_eq!(reader.state(), ReaderState::Failed);
    }

    #[test]
    fn newer_version_is_rejected() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let result = reader.restore(stream_of(&[account_frame(99)]), &NeverCancelled);
        assert!(matches!(
            result,
            Err(ArchiveError::UnsupportedVersion { found: 99, supported: ARCHIVE_VERSION })
        ));
    }

    #[test]
    fn header_only_stream_completes() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let summary = reader.restore(stream_of(&[account_frame(1)]), &NeverCancelled).unwrap();
        assert_eq!(reader.state(), ReaderState::Done);
        assert_eq!(summary.frames_read, 1);
        assert_eq!(summary.skips.total(), 0);
    }

    #[test]
    fn orphan_message_is_skipped_not_fatal() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let orphan = Frame::ChatItem(stowage_proto::payloads::ChatItem {
            chat_id: 42,
            author_service_id: "aci:a".to_string(),
            sent_at_ms: 1,
            body: None,
            attachments: Vec::new(),
        });
        let summary =
            reader.restore(stream_of(&[account_frame(1), orphan]), &NeverCancelled).unwrap();

        assert_eq!(reader.state(), ReaderState::Done);
        assert_eq!(summary.skips.chat_missing, 1);
        assert_eq!(summary.messages_applied, 0);
        assert_eq!(store.message_count(), 0);
    }

    #[test]
    fn history_frames_in_a_media_only_stream_are_skipped() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let stream = stream_of(&[
            account_frame_for(1, BackupPurpose::MediaOnly),
            recipient_frame("aci:self"),
        ]);
        let summary = reader.restore(stream, &NeverCancelled).unwrap();

        assert_eq!(reader.state(), ReaderState::Done);
        assert_eq!(summary.skips.handler_failed, 1);
        assert_eq!(summary.recipients_applied, 0);
        assert_eq!(store.recipient_count(), 0);
    }

    #[test]
    fn bad_pointer_in_a_multi_attachment_message_leaves_no_placeholders() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        let good = AttachmentPointer {
            media_id: vec![0xCD; 16],
            aes_key: vec![0; 32],
            mac_key: vec![0; 32],
            plaintext_len: 100,
            ciphertext_len: 116,
        };
        let bad = AttachmentPointer {
            media_id: vec![1, 2, 3],
            aes_key: vec![0; 32],
            mac_key: vec![0; 32],
            plaintext_len: 100,
            ciphertext_len: 116,
        };
        let message = Frame::ChatItem(ChatItem {
            chat_id: 1,
            author_service_id: "aci:self".to_string(),
            sent_at_ms: 10,
            body: None,
            attachments: vec![good, bad],
        });

        let stream = stream_of(&[
            account_frame(1),
            recipient_frame("aci:self"),
            chat_frame(1, "aci:self"),
            message,
        ]);
        let summary = reader.restore(stream, &NeverCancelled).unwrap();

        assert_eq!(summary.skips.handler_failed, 1);
        assert_eq!(summary.messages_applied, 0);
        assert_eq!(summary.placeholders_registered, 0);
        assert_eq!(store.message_count(), 0);
        assert_eq!(store.placeholder_count(), 0);
        assert_eq!(counter.planned_bytes(), 0, "skipped frames must not be counted");
    }

    #[test]
    fn cancellation_fails_the_run() {
        let store = MemoryStore::new();
        let counter = AttachmentByteCounter::new();
        let mut reader = ArchiveReader::new(&store, &counter);

        struct AlwaysCancelled;
        impl CancelCheck for AlwaysCancelled {
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let result = reader.restore(stream_of(&[account_frame(1)]), &AlwaysCancelled);
        assert!(matches!(result, Err(ArchiveError::Cancelled)));
        assert_eq!(reader.state(), ReaderState::Failed);
    }
}
