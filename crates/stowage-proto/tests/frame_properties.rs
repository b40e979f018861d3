//! Property-based tests for frame and container encoding.
//!
//! Verifies round-trip correctness for arbitrary frames rather than hand
//! picked examples, and that the container reader never panics on arbitrary
//! prefixes of valid streams.

use std::io::Cursor;

use proptest::prelude::*;
use stowage_proto::{
    ContainerReader, ContainerWriter, Frame,
    payloads::{
        AccountData, AttachmentPointer, BackupPlan, BackupPurpose, Chat, ChatFolder, ChatItem,
        FilesEntry, NotificationProfile, Recipient, StickerPack,
    },
};

fn arbitrary_purpose() -> impl Strategy<Value = BackupPurpose> {
    prop_oneof![Just(BackupPurpose::Messages), Just(BackupPurpose::MediaOnly)]
}

fn arbitrary_plan() -> impl Strategy<Value = BackupPlan> {
    prop_oneof![Just(BackupPlan::Free), Just(BackupPlan::Paid)]
}

fn arbitrary_pointer() -> impl Strategy<Value = AttachmentPointer> {
    (
        prop::collection::vec(any::<u8>(), 16),
        prop::collection::vec(any::<u8>(), 32),
        prop::collection::vec(any::<u8>(), 32),
        any::<u64>(),
        any::<u64>(),
    )
        .prop_map(|(media_id, aes_key, mac_key, plaintext_len, ciphertext_len)| {
            AttachmentPointer { media_id, aes_key, mac_key, plaintext_len, ciphertext_len }
        })
}

fn arbitrary_frame() -> impl Strategy<Value = Frame> {
    prop_oneof![
        Just(Frame::Empty),
        (any::<u64>(), any::<u64>(), arbitrary_purpose(), arbitrary_plan(), "[a-z0-9-]{1,16}")
            .prop_map(|(version, backup_time_ms, purpose, plan, upload_era)| {
                Frame::Account(AccountData {
                    version,
                    backup_time_ms,
                    purpose,
                    plan,
                    upload_era,
                    username: None,
                    given_name: "a".to_string(),
                    family_name: String::new(),
                })
            }),
        ("[a-z0-9:-]{1,32}", any::<bool>(), any::<bool>()).prop_map(
            |(service_id, is_self, registered)| {
                Frame::Recipient(Recipient {
                    service_id,
                    e164: None,
                    given_name: None,
                    family_name: None,
                    is_self,
                    registered,
                })
            }
        ),
        (any::<u64>(), "[a-z0-9:-]{1,32}", any::<bool>(), any::<Option<u32>>()).prop_map(
            |(chat_id, recipient_service_id, archived, pinned_order)| {
                Frame::Chat(Chat {
                    chat_id,
                    recipient_service_id,
                    archived,
                    pinned_order,
                    expiration_timer_ms: None,
                })
            }
        ),
        (
            any::<u64>(),
            "[a-z0-9:-]{1,32}",
            any::<u64>(),
            any::<Option<String>>(),
            prop::collection::vec(arbitrary_pointer(), 0..3),
        )
            .prop_map(|(chat_id, author_service_id, sent_at_ms, body, attachments)| {
                Frame::ChatItem(ChatItem {
                    chat_id,
                    author_service_id,
                    sent_at_ms,
                    body,
                    attachments,
                })
            }),
        (prop::collection::vec(any::<u8>(), 16), prop::collection::vec(any::<u8>(), 32), ".{0,16}")
            .prop_map(|(pack_id, pack_key, title)| {
                Frame::StickerPack(StickerPack { pack_id, pack_key, title })
            }),
        (".{1,16}", any::<bool>(), 0u16..1440, 0u16..1440).prop_map(
            |(name, schedule_enabled, start, end)| {
                Frame::NotificationProfile(NotificationProfile {
                    name,
                    allowed_service_ids: Vec::new(),
                    schedule_enabled,
                    schedule_start_minute: start,
                    schedule_end_minute: end,
                })
            }
        ),
        (".{1,16}", prop::collection::vec(any::<u64>(), 0..8), any::<bool>()).prop_map(
            |(name, chat_ids, show_only_unread)| {
                Frame::ChatFolder(ChatFolder { name, chat_ids, show_only_unread })
            }
        ),
        (arbitrary_pointer(), any::<Option<u64>>())
            .prop_map(|(pointer, chat_id)| Frame::FilesEntry(FilesEntry { pointer, chat_id })),
    ]
}

#[test]
fn prop_frame_body_round_trip() {
    proptest!(|(frame in arbitrary_frame())| {
        let bytes = frame.encode_to_vec().expect("encode should succeed");
        let parsed = Frame::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(frame, parsed);
    });
}

#[test]
fn prop_container_stream_round_trip() {
    proptest!(|(frames in prop::collection::vec(arbitrary_frame(), 0..16))| {
        let mut writer = ContainerWriter::new(Vec::new());
        for frame in &frames {
            writer.write_frame(frame).expect("write should succeed");
        }
        let bytes = writer.finish().expect("finish should succeed");

        let mut reader = ContainerReader::new(Cursor::new(bytes));
        let mut parsed = Vec::new();
        while let Some(frame) = reader.read_frame().expect("read should succeed") {
            parsed.push(frame);
        }
        prop_assert_eq!(frames, parsed);
    });
}

#[test]
fn prop_truncated_stream_never_panics() {
    proptest!(|(frames in prop::collection::vec(arbitrary_frame(), 1..8), cut in any::<prop::sample::Index>())| {
        let mut writer = ContainerWriter::new(Vec::new());
        for frame in &frames {
            writer.write_frame(frame).expect("write should succeed");
        }
        let bytes = writer.finish().expect("finish should succeed");
        let cut = cut.index(bytes.len() + 1);
        let truncated = &bytes[..cut];

        // Every complete frame before the cut must still decode; the reader
        // must end with clean EOF or a typed error, never a panic.
        let mut reader = ContainerReader::new(Cursor::new(truncated.to_vec()));
        loop {
            match reader.read_frame() {
                Ok(Some(_)) => {},
                Ok(None) | Err(_) => break,
            }
        }
    });
}
