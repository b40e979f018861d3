//! Key hierarchy and stream encryption for the Stowage backup archive.
//!
//! All cryptographic material used by the archive engine is derived here from
//! a single root secret. Derivations are pure and deterministic: the same
//! inputs always produce the same bytes, which is what lets a restore
//! regenerate the exact media identifiers a prior export used.
//!
//! Two independently-keyed domains hang off the root secret: the
//! storage-service domain (manifest/item keys for settings sync) and the
//! backup domain (stream key, media root, per-media material). The domains
//! never share derived output, even for the same root secret.

mod envelope;
mod error;
mod hierarchy;
mod keys;
mod media;

pub use envelope::{CHUNK_LEN, ENVELOPE_MAGIC, EnvelopeReader, EnvelopeWriter, NONCE_PREFIX_LEN};
pub use error::{EnvelopeError, KeyError};
pub use hierarchy::KeyHierarchy;
pub use keys::{
    BackupStreamKey, ENTROPY_POOL_LEN, KEY_LEN, MASTER_KEY_LEN, MediaRootKey, RootSecret,
    StorageItemKey, StorageManifestKey,
};
pub use media::{CONTENT_ADDRESS_LEN, ContentAddress, MediaKeyMaterial};
