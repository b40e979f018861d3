//! Frame model and container codec for the Stowage backup archive.
//!
//! A backup is an ordered stream of [`Frame`]s. This crate defines the frame
//! union, the entity payloads it carries, and the local container format:
//! each frame is written as `varint32(length) || body`, repeated until
//! end-of-stream. The cloud backup stream reuses the exact same framing,
//! wrapped in the authenticated encryption envelope provided by
//! `stowage-crypto`.
//!
//! Frame bodies are a raw 2-byte kind tag followed by a CBOR-encoded payload.
//! Keeping the tag outside the body is what makes forward compatibility
//! cheap: a reader that does not recognize a tag can skip the frame without
//! attempting to deserialize it.

mod container;
mod error;
mod frame;
pub mod payloads;
mod varint;

pub use container::{ContainerReader, ContainerWriter};
pub use error::ProtoError;
pub use frame::{Frame, FrameKind, MAX_FRAME_LEN};
pub use varint::{read_varint32, write_varint32};
