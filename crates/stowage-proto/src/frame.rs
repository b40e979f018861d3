//! The backup frame union.
//!
//! Wire layout of one frame body: `[kind: u16 BE] + [payload: CBOR]`.
//! The body rides inside the container framing (`varint32(len) || body`).
//!
//! # Invariants
//!
//! - Closed union: every known kind has an explicit variant and an explicit
//!   decode arm. Adding a kind extends the enum and forces new arms through
//!   match exhaustiveness; there is no default fallthrough that could drop
//!   data differently from the unknown-kind path.
//!
//! - Forward compatibility: an unrecognized kind tag decodes to
//!   [`Frame::Unknown`], never to an error. `ProtoError::Malformed` is
//!   reserved for structurally broken bytes.

use bytes::BufMut;

use crate::{
    ProtoError,
    payloads::{
        AccountData, Chat, ChatFolder, ChatItem, FilesEntry, NotificationProfile, Recipient,
        StickerPack,
    },
};

/// Maximum encoded frame body length (16 MiB). Enforced on both encode and
/// decode so a hostile length prefix cannot force an unbounded allocation.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Kind tags for every frame this reader understands.
///
/// Tag values are wire format: they never change meaning and are never
/// reused. New kinds take fresh tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameKind {
    /// Sentinel frame carrying no data.
    Empty = 0x0000,
    /// Account header frame; unique and first in every stream.
    Account = 0x0001,
    /// A recipient record.
    Recipient = 0x0002,
    /// A conversation thread.
    Chat = 0x0003,
    /// A message within a chat.
    ChatItem = 0x0004,
    /// An installed sticker pack reference.
    StickerPack = 0x0005,
    /// A notification profile.
    NotificationProfile = 0x0006,
    /// A chat folder.
    ChatFolder = 0x0007,
    /// A standalone media entry (media-only backups).
    FilesEntry = 0x0008,
}

impl FrameKind {
    /// Wire tag for this kind.
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Look up a kind by wire tag. `None` means the tag comes from a newer
    /// writer and the frame should be skipped.
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0x0000 => Some(Self::Empty),
            0x0001 => Some(Self::Account),
            0x0002 => Some(Self::Recipient),
            0x0003 => Some(Self::Chat),
            0x0004 => Some(Self::ChatItem),
            0x0005 => Some(Self::StickerPack),
            0x0006 => Some(Self::NotificationProfile),
            0x0007 => Some(Self::ChatFolder),
            0x0008 => Some(Self::FilesEntry),
            _ => None,
        }
    }
}

/// The atomic unit of a backup stream.
///
/// Frames have no independent identity; identity is derived from payload
/// content (a recipient frame is its service id, a chat frame its chat id).
/// Frames exist only while streaming and are never held in bulk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Sentinel frame. Decoded and dispatched like any other kind, as an
    /// explicit no-op.
    Empty,

    /// Account header. Must be the first frame of every stream.
    Account(AccountData),

    /// A recipient record.
    Recipient(Recipient),

    /// A conversation thread.
    Chat(Chat),

    /// A message within a chat.
    ChatItem(ChatItem),

    /// An installed sticker pack reference.
    StickerPack(StickerPack),

    /// A notification profile.
    NotificationProfile(NotificationProfile),

    /// A chat folder.
    ChatFolder(ChatFolder),

    /// A standalone media entry.
    FilesEntry(FilesEntry),

    /// A well-formed frame of a kind this reader does not understand.
    /// Counted and skipped; exists only on the read path.
    Unknown {
        /// The unrecognized wire tag.
        kind: u16,
    },
}

impl Frame {
    /// The wire kind tag for this frame.
    pub fn kind_tag(&self) -> u16 {
        match self {
            Self::Empty => FrameKind::Empty.tag(),
            Self::Account(_) => FrameKind::Account.tag(),
            Self::Recipient(_) => FrameKind::Recipient.tag(),
            Self::Chat(_) => FrameKind::Chat.tag(),
            Self::ChatItem(_) => FrameKind::ChatItem.tag(),
            Self::StickerPack(_) => FrameKind::StickerPack.tag(),
            Self::NotificationProfile(_) => FrameKind::NotificationProfile.tag(),
            Self::ChatFolder(_) => FrameKind::ChatFolder.tag(),
            Self::FilesEntry(_) => FrameKind::FilesEntry.tag(),
            Self::Unknown { kind } => *kind,
        }
    }

    /// Encode the frame body (kind tag + CBOR payload) into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtoError::UnknownKind` when encoding an [`Frame::Unknown`];
    ///   unknown frames are a read-path artifact and cannot be re-emitted
    /// - `ProtoError::Malformed` if CBOR serialization fails
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), ProtoError> {
        dst.put_u16(self.kind_tag());

        match self {
            Self::Empty => Ok(()),
            Self::Account(payload) => encode_body(payload, dst),
            Self::Recipient(payload) => encode_body(payload, dst),
            Self::Chat(payload) => encode_body(payload, dst),
            Self::ChatItem(payload) => encode_body(payload, dst),
            Self::StickerPack(payload) => encode_body(payload, dst),
            Self::NotificationProfile(payload) => encode_body(payload, dst),
            Self::ChatFolder(payload) => encode_body(payload, dst),
            Self::FilesEntry(payload) => encode_body(payload, dst),
            Self::Unknown { kind } => Err(ProtoError::UnknownKind { kind: *kind }),
        }
    }

    /// Encode the frame body to a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Frame::encode`].
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, ProtoError> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a frame body.
    ///
    /// Unknown kind tags decode to [`Frame::Unknown`]; only structurally
    /// malformed bytes produce errors. The payload bytes of an unknown frame
    /// are discarded, which is safe because the container framing already
    /// told us where the frame ends.
    ///
    /// # Errors
    ///
    /// - `ProtoError::Malformed` if the body is shorter than the kind tag or
    ///   the CBOR payload does not parse
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        let Some((tag_bytes, body)) = bytes.split_at_checked(2) else {
            return Err(ProtoError::Malformed("frame body shorter than kind tag".to_string()));
        };
        let tag = u16::from_be_bytes([tag_bytes[0], tag_bytes[1]]);

        let Some(kind) = FrameKind::from_tag(tag) else {
            return Ok(Self::Unknown { kind: tag });
        };

        match kind {
            FrameKind::Empty => Ok(Self::Empty),
            FrameKind::Account => Ok(Self::Account(decode_body(body)?)),
            FrameKind::Recipient => Ok(Self::Recipient(decode_body(body)?)),
            FrameKind::Chat => Ok(Self::Chat(decode_body(body)?)),
            FrameKind::ChatItem => Ok(Self::ChatItem(decode_body(body)?)),
            FrameKind::StickerPack => Ok(Self::StickerPack(decode_body(body)?)),
            FrameKind::NotificationProfile => Ok(Self::NotificationProfile(decode_body(body)?)),
            FrameKind::ChatFolder => Ok(Self::ChatFolder(decode_body(body)?)),
            FrameKind::FilesEntry => Ok(Self::FilesEntry(decode_body(body)?)),
        }
    }
}

fn encode_body<T, B>(payload: &T, dst: &mut B) -> Result<(), ProtoError>
where
    T: serde::Serialize,
    B: BufMut,
{
    // `&mut B` is itself a `BufMut`, so this borrows rather than consumes.
    ciborium::into_writer(payload, dst.writer()).map_err(ProtoError::from)
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ProtoError> {
    ciborium::from_reader(body).map_err(ProtoError::from)
}
