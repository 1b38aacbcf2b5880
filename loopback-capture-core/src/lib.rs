//! # loopback-capture-core
//!
//! Platform-agnostic loopback capture engine.
//!
//! Captures whatever the default render endpoint is playing and delivers it
//! to a single consumer as mono 16 kHz float frames. Platform backends
//! (Windows WASAPI) implement the `AudioBackend` capability traits and plug
//! into the generic `CaptureEngine`.
//!
//! ## Architecture
//!
//! ```text
//! loopback-capture-core (this crate)
//! ├── engine/       ← CaptureEngine, handle arena, capture loop, session directory
//! ├── traits/       ← AudioBackend, AudioClient, CaptureStream, SessionManager, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, EngineConfig, AudioFormat, etc.
//! ├── processing/   ← MonoResampler, WAV header generation
//! └── storage/      ← WavRecorder, metadata sidecar
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use engine::facade::CaptureEngine;
pub use models::audio_models::{ApplicationSession, AudioFormat, CaptureStats};
pub use models::config::EngineConfig;
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::mono_resampler::MonoResampler;
pub use storage::wav_recorder::{recording_callback, WavRecorder};
pub use traits::backend::{AudioBackend, AudioClient, BufferFlags, CapturePacket, CaptureStream, SessionManager};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::frame_callback::FrameCallback;
