//! Store seam errors.

use thiserror::Error;

/// Failures surfaced by a store implementation.
///
/// Store failures are infrastructure failures: the engine treats them as
/// fatal for the run rather than as per-frame skips, since a broken store
/// makes every subsequent upsert meaningless.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store failed (I/O, corruption, lock poisoning).
    #[error("store backend failure: {0}")]
    Backend(String),

    /// An operation referenced a placeholder that was never registered.
    #[error("no placeholder registered for content address")]
    PlaceholderMissing,
}
