use super::error::CaptureError;

/// Capture engine state machine.
///
/// State transitions:
/// ```text
/// created → format_resolved → initialized → capturing ⇄ stopped
///                                               ↓   ↑
///                                             faulted
///
/// any state → destroyed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Created,
    FormatResolved,
    Initialized,
    Capturing,
    Stopped,
    /// The capture thread exited on a stream error while the engine was capturing.
    Faulted(CaptureError),
    Destroyed,
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self, Self::Destroyed)
    }

    /// Whether the OS capture stream has been set up, so `start()` is legal.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self,
            Self::Initialized | Self::Capturing | Self::Stopped | Self::Faulted(_)
        )
    }

    /// Whether a capture thread may still be attached to the engine.
    pub fn has_capture_thread(&self) -> bool {
        matches!(self, Self::Capturing | Self::Faulted(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::FormatResolved => "format_resolved",
            Self::Initialized => "initialized",
            Self::Capturing => "capturing",
            Self::Stopped => "stopped",
            Self::Faulted(_) => "faulted",
            Self::Destroyed => "destroyed",
        }
    }
}
