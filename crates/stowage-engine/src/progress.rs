//! Progress reporting seam.

/// Snapshot of how far a run has come.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressReport {
    /// Frames written or read so far.
    pub frames_processed: u64,
    /// Attachment bytes the run expects to move.
    pub planned_attachment_bytes: u64,
    /// Attachment bytes moved so far.
    pub actual_attachment_bytes: u64,
}

/// Receives progress reports. Implementations must be cheap; reports are
/// delivered from the run's own thread.
pub trait ProgressSink: Send + Sync {
    /// One progress snapshot.
    fn on_progress(&self, report: ProgressReport);
}

/// Drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_progress(&self, _report: ProgressReport) {}
}
