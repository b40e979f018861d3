//! Per-media key material and content addressing.
//!
//! A media object's name on the remote store is not random: it is derived
//! from the media root key and the attachment's stable identifier. The same
//! logical attachment therefore always maps to the same remote object name
//! across export and re-export, which is what enables dedup and resumable
//! restores.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    hierarchy::derive_key,
    keys::{KEY_LEN, MediaRootKey, RootSecret},
};

type HmacSha256 = Hmac<Sha256>;

/// Length of a content address in bytes.
pub const CONTENT_ADDRESS_LEN: usize = 16;

const MEDIA_DOMAIN: &[u8] = b"stowage/backup/media/v1:";
const MEDIA_ID_LABEL: &[u8] = b"id:";
const MEDIA_AES_LABEL: &[u8] = b"aes:";
const MEDIA_MAC_LABEL: &[u8] = b"mac:";

/// Content address of a remote media object: the object's name on the
/// backup CDN.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentAddress([u8; CONTENT_ADDRESS_LEN]);

impl ContentAddress {
    /// Address bytes.
    pub fn as_bytes(&self) -> &[u8; CONTENT_ADDRESS_LEN] {
        &self.0
    }

    /// Parse an address from a byte slice. `None` if the length is wrong.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; CONTENT_ADDRESS_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Address bytes as an owned vector, for embedding in frame payloads.
    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Everything needed to locate and decrypt one media object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaKeyMaterial {
    /// Remote object name.
    pub media_id: ContentAddress,

    /// AES key for the object's encryption layer.
    pub aes_key: [u8; KEY_LEN],

    /// MAC key for the object's integrity layer.
    pub mac_key: [u8; KEY_LEN],
}

impl MediaKeyMaterial {
    /// HMAC-SHA256 over a media object's ciphertext, keyed by `mac_key`.
    /// The download pipeline checks this before materializing a placeholder.
    pub fn object_mac(&self, ciphertext: &[u8]) -> [u8; KEY_LEN] {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.mac_key) else {
            unreachable!("HMAC-SHA256 accepts 32-byte keys");
        };
        mac.update(ciphertext);
        mac.finalize().into_bytes().into()
    }

    /// Constant-time verification of a media object's MAC.
    pub fn verify_object_mac(&self, ciphertext: &[u8], expected: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.mac_key) else {
            unreachable!("HMAC-SHA256 accepts 32-byte keys");
        };
        mac.update(ciphertext);
        mac.verify_slice(expected).is_ok()
    }
}

impl MediaRootKey {
    /// Derive the full key material for one attachment.
    ///
    /// Pure and deterministic: the id, AES key, and MAC key are each an
    /// independent HKDF expansion bound to the attachment's stable
    /// identifier. Only derived material ever travels in attachment
    /// pointers; the root key itself stays local.
    pub fn media_key_material(&self, attachment_id: &[u8]) -> MediaKeyMaterial {
        // The media root key acts as the root secret of its own subtree.
        let root = RootSecret::MasterKey(*self.as_bytes());

        let id_bytes = derive_key(&root, MEDIA_DOMAIN, MEDIA_ID_LABEL, attachment_id);
        let mut media_id = [0u8; CONTENT_ADDRESS_LEN];
        media_id.copy_from_slice(&id_bytes[..CONTENT_ADDRESS_LEN]);

        MediaKeyMaterial {
            media_id: ContentAddress(media_id),
            aes_key: derive_key(&root, MEDIA_DOMAIN, MEDIA_AES_LABEL, attachment_id),
            mac_key: derive_key(&root, MEDIA_DOMAIN, MEDIA_MAC_LABEL, attachment_id),
        }
    }

    /// Derive only the content address for one attachment.
    pub fn content_address(&self, attachment_id: &[u8]) -> ContentAddress {
        self.media_key_material(attachment_id).media_id
    }
}
