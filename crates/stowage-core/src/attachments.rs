//! Attachment addressing and placeholder registration.
//!
//! The export side never uploads media; it derives pointer material and
//! counts the bytes an upload pipeline would move. The restore side never
//! downloads media; it registers placeholders and leaves materialization to
//! the external transfer pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use stowage_crypto::{ContentAddress, KeyError, KeyHierarchy, MediaKeyMaterial, MediaRootKey};
use stowage_proto::payloads::AttachmentPointer;
use thiserror::Error;

use crate::{
    export::MEDIA_OBJECT_OVERHEAD,
    records::{AttachmentId, AttachmentRecord, PlaceholderRecord},
    store::{AttachmentStore, StoreError},
};

/// Attachment-side failures.
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// A pointer carried a content address of the wrong length. The frame
    /// that carried it is skipped; the rest of the stream is unaffected.
    #[error("attachment pointer carries a malformed content address")]
    BadAddress,

    /// The placeholder registry failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shared planned/actual byte accounting for attachment transfers.
///
/// `planned` accumulates as pointers are derived (export) or placeholders
/// registered (restore); `actual` accumulates as the transfer pipeline moves
/// real bytes. Progress reporting reads both.
#[derive(Debug, Default)]
pub struct AttachmentByteCounter {
    planned: AtomicU64,
    actual: AtomicU64,
}

impl AttachmentByteCounter {
    /// Fresh counter with both totals at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes a transfer is expected to move.
    pub fn record_planned_bytes(&self, bytes: u64) {
        self.planned.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add bytes a transfer actually moved.
    pub fn record_actual_bytes(&self, bytes: u64) {
        self.actual.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Total bytes planned so far.
    pub fn planned_bytes(&self) -> u64 {
        self.planned.load(Ordering::Relaxed)
    }

    /// Total bytes actually moved so far.
    pub fn actual_bytes(&self) -> u64 {
        self.actual.load(Ordering::Relaxed)
    }
}

/// Derives remote addressing and key material for attachments.
///
/// Everything here is a pure function of the media root key and the
/// attachment's stable identifier, so a re-export maps the same logical
/// attachment to the same remote object and the same keys.
#[derive(Debug, Clone)]
pub struct AttachmentBackupStore {
    media_root: MediaRootKey,
}

impl AttachmentBackupStore {
    /// Build from the key hierarchy.
    ///
    /// # Errors
    ///
    /// `KeyError::MissingRootSecret` if the hierarchy is locked.
    pub fn new(keys: &KeyHierarchy) -> Result<Self, KeyError> {
        Ok(Self { media_root: keys.media_root_key()? })
    }

    /// Content address the attachment's remote object lives under.
    pub fn address_for(&self, attachment_id: &AttachmentId) -> ContentAddress {
        self.media_root.content_address(attachment_id.as_bytes())
    }

    /// Full key material for the attachment's remote object.
    pub fn key_material_for(&self, attachment_id: &AttachmentId) -> MediaKeyMaterial {
        self.media_root.media_key_material(attachment_id.as_bytes())
    }

    /// Build the wire pointer for one attachment and account for the bytes
    /// its upload will move. Only derived material travels in the pointer.
    pub fn pointer_for(
        &self,
        record: &AttachmentRecord,
        counter: &AttachmentByteCounter,
    ) -> AttachmentPointer {
        let material = self.key_material_for(&record.attachment_id);
        let ciphertext_len = record.plaintext_len + MEDIA_OBJECT_OVERHEAD;
        counter.record_planned_bytes(ciphertext_len);

        AttachmentPointer {
            media_id: material.media_id.to_vec(),
            aes_key: material.aes_key.to_vec(),
            mac_key: material.mac_key.to_vec(),
            plaintext_len: record.plaintext_len,
            ciphertext_len,
        }
    }
}

/// Parse the content address a wire pointer carries, if well-formed.
pub fn pointer_address(pointer: &AttachmentPointer) -> Option<ContentAddress> {
    ContentAddress::from_slice(&pointer.media_id)
}

/// Register an unmaterialized placeholder for a restored pointer.
///
/// Never downloads anything. The external pipeline later calls
/// [`AttachmentStore::mark_materialized`] once the bytes are local; a restore
/// is complete even while every placeholder is still pending.
///
/// # Errors
///
/// - [`AttachmentError::BadAddress`] if the pointer's address bytes have the
///   wrong length
/// - [`AttachmentError::Store`] if registration fails
pub fn create_placeholder(
    pointer: &AttachmentPointer,
    upload_era: &str,
    store: &dyn AttachmentStore,
    counter: &AttachmentByteCounter,
) -> Result<ContentAddress, AttachmentError> {
    let address = pointer_address(pointer).ok_or(AttachmentError::BadAddress)?;

    store.register_placeholder(PlaceholderRecord {
        address,
        upload_era: upload_era.to_string(),
        plaintext_len: pointer.plaintext_len,
        ciphertext_len: pointer.ciphertext_len,
        materialized_as: None,
    })?;
    counter.record_planned_bytes(pointer.ciphertext_len);

    Ok(address)
}

#[cfg(test)]
mod tests {
    use stowage_crypto::RootSecret;

    use super::*;
    use crate::store::MemoryStore;

    fn backup_store() -> AttachmentBackupStore {
        let keys = KeyHierarchy::unlocked(RootSecret::EntropyPool([9; 64]));
        AttachmentBackupStore::new(&keys).unwrap()
    }

    #[test]
    fn addresses_are_deterministic() {
        let id = AttachmentId::new("att-1");
        assert_eq!(backup_store().address_for(&id), backup_store().address_for(&id));
    }

    #[test]
    fn pointer_address_matches_derived_material() {
        let store = backup_store();
        let counter = AttachmentByteCounter::new();
        let record = AttachmentRecord { attachment_id: AttachmentId::new("att-1"), plaintext_len: 100 };

        let pointer = store.pointer_for(&record, &counter);
        assert_eq!(pointer.media_id, store.address_for(&record.attachment_id).to_vec());
        assert_eq!(pointer.ciphertext_len, 100 + MEDIA_OBJECT_OVERHEAD);
    }

    #[test]
    fn pointer_derivation_accounts_planned_bytes() {
        let store = backup_store();
        let counter = AttachmentByteCounter::new();
        let record = AttachmentRecord { attachment_id: AttachmentId::new("att-1"), plaintext_len: 100 };

        store.pointer_for(&record, &counter);
        store.pointer_for(&record, &counter);

        assert_eq!(counter.planned_bytes(), 2 * (100 + MEDIA_OBJECT_OVERHEAD));
        assert_eq!(counter.actual_bytes(), 0);
    }

    #[test]
    fn placeholder_registration_never_materializes() {
        let backup = backup_store();
        let counter = AttachmentByteCounter::new();
        let store = MemoryStore::new();
        let record = AttachmentRecord { attachment_id: AttachmentId::new("att-1"), plaintext_len: 64 };
        let pointer = backup.pointer_for(&record, &counter);

        let address = create_placeholder(&pointer, "era-1", &store, &counter).unwrap();

        let fetched = store.fetch_placeholder(&address).unwrap().unwrap();
        assert_eq!(fetched.materialized_as, None);
        assert_eq!(fetched.ciphertext_len, pointer.ciphertext_len);
    }

    #[test]
    fn short_address_is_rejected() {
        let counter = AttachmentByteCounter::new();
        let store = MemoryStore::new();
        let pointer = AttachmentPointer {
            media_id: vec![1, 2, 3],
            aes_key: vec![0; 32],
            mac_key: vec![0; 32],
            plaintext_len: 1,
            ciphertext_len: 17,
        };

        let result = create_placeholder(&pointer, "era-1", &store, &counter);
        assert!(matches!(result, Err(AttachmentError::BadAddress)));
        assert_eq!(counter.planned_bytes(), 0, "rejected pointers must not be counted");
    }
}
