//! Account-level header payload.
//!
//! The `AccountData` frame is the unique first frame of every backup stream.
//! Everything after it is meaningless without the purpose/plan/era context it
//! establishes, which is why readers reject streams where it is missing or
//! late.

use serde::{Deserialize, Serialize};

/// What this backup contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupPurpose {
    /// Full message history plus attachment pointers.
    Messages,
    /// Attachment references only; no chat or message frames.
    MediaOnly,
}

/// Plan level the backup was created under. Gates media retention features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupPlan {
    /// Free tier: message backup only.
    Free,
    /// Paid tier: message backup plus remote media storage.
    Paid,
}

/// The mandatory first frame of a backup stream.
///
/// `upload_era` is an opaque string binding every media object referenced by
/// this backup generation to one remote storage epoch; a re-export under a
/// new era invalidates old media objects on the server side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    /// Archive format version. Readers reject versions newer than they
    /// understand.
    pub version: u64,

    /// Wall-clock time the export started, in milliseconds since the epoch.
    pub backup_time_ms: u64,

    /// Whether this is a full message backup or media-only.
    pub purpose: BackupPurpose,

    /// Plan level at export time.
    pub plan: BackupPlan,

    /// Opaque era string binding all media objects in this generation.
    pub upload_era: String,

    /// Account username, if one is set.
    pub username: Option<String>,

    /// Profile given name.
    pub given_name: String,

    /// Profile family name.
    pub family_name: String,
}
