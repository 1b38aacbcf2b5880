use crate::models::error::CaptureError;
use crate::models::state::CaptureState;

/// Event delegate for capture engine notifications.
///
/// Lifecycle transitions are reported from the thread issuing the control
/// call. Faults are reported from the capture thread. Implementations should
/// marshal to their own thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the engine state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when the capture thread stops on a stream error.
    fn on_error(&self, error: &CaptureError);
}
