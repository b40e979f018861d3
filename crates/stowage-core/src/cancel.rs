//! Cancellation seam for the frame pipeline.
//!
//! Cancellation is checked only between frames, never mid-frame, so a
//! cancelled run always leaves a complete-or-absent frame boundary.

/// Cooperative cancellation check, polled between frames.
pub trait CancelCheck {
    /// Whether the run should stop at the next frame boundary.
    fn is_cancelled(&self) -> bool;
}

/// A run that can never be cancelled. Used by tests and fire-and-forget
/// callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancelCheck for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}
