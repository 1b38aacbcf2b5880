use thiserror::Error;

/// Errors that can occur during loopback capture operations.
///
/// Backend variants carry the OS status text so callers can surface it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no default render endpoint available")]
    DeviceUnavailable,

    #[error("capability activation failed: {0}")]
    ActivationFailed(String),

    #[error("audio client initialization failed: {0}")]
    InitializationFailed(String),

    #[error("capture service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("failed to start audio stream: {0}")]
    StartFailed(String),

    #[error("failed to stop audio stream: {0}")]
    StopFailed(String),

    #[error("audio session manager unavailable: {0}")]
    SessionManagerUnavailable(String),

    #[error("process {0} could not be resolved")]
    Unresolvable(u32),

    #[error("capture stream error: {0}")]
    StreamError(String),

    #[error("engine is not initialized")]
    NotInitialized,

    #[error("control call issued from the capture thread")]
    CaptureThreadReentry,

    #[error("engine has been destroyed")]
    Destroyed,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
