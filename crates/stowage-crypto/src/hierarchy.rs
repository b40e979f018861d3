//! HKDF key hierarchy over the root secret.
//!
//! Every derivation is `HKDF-SHA256(ikm = root, info = domain || label ||
//! context)`. The domain prefix is what keeps the storage-service and backup
//! domains independent: identical labels under different domains still
//! produce unrelated keys, preventing cross-protocol key reuse.
//!
//! # Invariants
//!
//! - Deterministic: two derivations with identical inputs are byte-identical.
//!   Restore depends on this to regenerate the media identifiers a prior
//!   export used.
//! - Fail closed: a hierarchy without a root secret returns
//!   [`KeyError::MissingRootSecret`] from every derivation, never a zero key.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::{
    error::KeyError,
    keys::{BackupStreamKey, KEY_LEN, MediaRootKey, RootSecret, StorageItemKey, StorageManifestKey},
};

/// Storage-service domain prefix.
const STORAGE_DOMAIN: &[u8] = b"stowage/storage/v1:";

/// Backup domain prefix.
const BACKUP_DOMAIN: &[u8] = b"stowage/backup/v1:";

const MANIFEST_LABEL: &[u8] = b"manifest";
const ITEM_LABEL: &[u8] = b"item:";
const STREAM_LABEL: &[u8] = b"stream";
const MEDIA_ROOT_LABEL: &[u8] = b"media-root";

/// Derives every key the archive engine uses from the account root secret.
///
/// The hierarchy holds the root secret for the session but never persists
/// it; callers own the secret's lifecycle. A `locked` hierarchy exists so
/// components can be wired before registration completes.
#[derive(Debug, Clone)]
pub struct KeyHierarchy {
    root: Option<RootSecret>,
}

impl KeyHierarchy {
    /// Hierarchy with a root secret available.
    pub fn unlocked(root: RootSecret) -> Self {
        Self { root: Some(root) }
    }

    /// Hierarchy with no root secret. Every derivation fails closed.
    pub fn locked() -> Self {
        Self { root: None }
    }

    /// Whether a root secret is available.
    pub fn is_unlocked(&self) -> bool {
        self.root.is_some()
    }

    fn root(&self) -> Result<&RootSecret, KeyError> {
        self.root.as_ref().ok_or(KeyError::MissingRootSecret)
    }

    /// Storage-service manifest key.
    pub fn storage_manifest_key(&self) -> Result<StorageManifestKey, KeyError> {
        let bytes = derive_key(self.root()?, STORAGE_DOMAIN, MANIFEST_LABEL, &[]);
        Ok(StorageManifestKey::from_bytes(bytes))
    }

    /// Storage-service key for one item, bound to the item's identifier.
    pub fn storage_item_key(&self, item_id: &[u8]) -> Result<StorageItemKey, KeyError> {
        let bytes = derive_key(self.root()?, STORAGE_DOMAIN, ITEM_LABEL, item_id);
        Ok(StorageItemKey::from_bytes(bytes))
    }

    /// Key for the backup stream's authenticated encryption envelope.
    pub fn backup_stream_key(&self) -> Result<BackupStreamKey, KeyError> {
        let bytes = derive_key(self.root()?, BACKUP_DOMAIN, STREAM_LABEL, &[]);
        Ok(BackupStreamKey::from_bytes(bytes))
    }

    /// Root of the per-media derivation tree.
    pub fn media_root_key(&self) -> Result<MediaRootKey, KeyError> {
        let bytes = derive_key(self.root()?, BACKUP_DOMAIN, MEDIA_ROOT_LABEL, &[]);
        Ok(MediaRootKey::from_bytes(bytes))
    }
}

/// One HKDF-SHA256 expand with `info = domain || label || context`.
pub(crate) fn derive_key(
    root: &RootSecret,
    domain: &[u8],
    label: &[u8],
    context: &[u8],
) -> [u8; KEY_LEN] {
    let hkdf = Hkdf::<Sha256>::new(None, root.ikm());

    let mut info = Vec::with_capacity(domain.len() + label.len() + context.len());
    info.extend_from_slice(domain);
    info.extend_from_slice(label);
    info.extend_from_slice(context);

    let mut key = [0u8; KEY_LEN];
    let Ok(()) = hkdf.expand(&info, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}
