//! Root secret and typed derived keys.
//!
//! Derived keys are plain 32-byte sequences tagged with their purpose at the
//! type level, so a storage manifest key cannot be handed to the backup
//! envelope by accident. They are never stored independently; holders either
//! recompute them from the hierarchy or keep them for the session.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of every derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of an account entropy pool in bytes.
pub const ENTROPY_POOL_LEN: usize = 64;

/// Length of a legacy master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

/// The account's root secret. Exactly one form is authoritative per account
/// at a time; rotation (re-registration) invalidates every derived key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum RootSecret {
    /// High-entropy user secret established at registration.
    EntropyPool([u8; ENTROPY_POOL_LEN]),

    /// Legacy master key, still honored for accounts that predate the
    /// entropy pool.
    MasterKey([u8; MASTER_KEY_LEN]),
}

impl RootSecret {
    /// Input key material for HKDF.
    pub(crate) fn ikm(&self) -> &[u8] {
        match self {
            Self::EntropyPool(bytes) => bytes,
            Self::MasterKey(bytes) => bytes,
        }
    }
}

impl fmt::Debug for RootSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntropyPool(_) => f.write_str("RootSecret::EntropyPool(..)"),
            Self::MasterKey(_) => f.write_str("RootSecret::MasterKey(..)"),
        }
    }
}

macro_rules! derived_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            /// Wrap raw derived bytes. Crate-internal: keys only come out of
            /// the hierarchy.
            pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }

            /// Raw key bytes, for handing to a transport or cipher.
            pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

derived_key! {
    /// Storage-service manifest key (settings sync domain).
    StorageManifestKey
}

derived_key! {
    /// Storage-service per-item key (settings sync domain).
    StorageItemKey
}

derived_key! {
    /// Key for the backup stream's authenticated encryption envelope.
    BackupStreamKey
}

derived_key! {
    /// Root of the per-media derivation tree (backup domain). All media ids
    /// and media keys hang off this key.
    MediaRootKey
}
