//! Run policy limits.

use std::time::Duration;

/// Hard ceilings and policy thresholds for one controller.
///
/// `max_ingest_len` caps what a restore will accept for an attachment-free
/// stream; `max_media_ingest_len` applies when the stream interleaves media
/// entries and is correspondingly larger. Both are checked against the
/// declared length before ingestion starts and enforced against bytes
/// actually read during it.
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Maximum declared length of a message-only restore stream, in bytes.
    pub max_ingest_len: u64,

    /// Maximum declared length of a media-interleaved restore stream, in
    /// bytes.
    pub max_media_ingest_len: u64,

    /// Age past which an existing backup no longer counts as current and a
    /// fresh export is forced.
    pub max_backup_age: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_ingest_len: 100 * 1024 * 1024,
            max_media_ingest_len: 1024 * 1024 * 1024,
            max_backup_age: Duration::from_secs(14 * 24 * 60 * 60),
        }
    }
}
