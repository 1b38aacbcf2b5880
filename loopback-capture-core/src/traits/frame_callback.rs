use std::sync::Arc;

/// Callback invoked with each transformed buffer.
///
/// Parameters:
/// - `samples`: Mono f32 samples at the target rate (`AudioFormat::TARGET`).
/// - `frame_count`: Number of frames in `samples` (equal to `samples.len()`).
///
/// The callback runs synchronously on the capture thread. A slow callback
/// stalls buffer pulls and risks OS-side overruns, so it must return quickly
/// or hand the data off to its own buffer. It must not call `stop()` or
/// `set_callback()` on the engine that invokes it; those calls are rejected
/// with `CaptureError::CaptureThreadReentry`.
pub type FrameCallback = Arc<dyn Fn(&[f32], usize) + Send + Sync + 'static>;
