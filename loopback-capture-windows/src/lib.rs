//! # loopback-capture-windows
//!
//! Windows WASAPI backend for loopback-capture-core.
//!
//! Provides:
//! - `WasapiBackend`: `AudioBackend` over the default render endpoint
//! - `WasapiCaptureStream`: `IAudioCaptureClient` pull stream (MMCSS "Pro Audio")
//! - `SampleEncoding`: float / integer PCM mix-format decoding
//!
//! ## Platform Requirements
//! - Windows Vista+ for shared-mode loopback
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use loopback_capture_windows::WasapiCaptureEngine;
//! use loopback_capture_windows::WasapiBackend;
//!
//! let mut engine = WasapiCaptureEngine::new(WasapiBackend::new()?);
//! engine.set_callback(Arc::new(|samples: &[f32], frames: usize| {
//!     // mono 16 kHz frames
//! }))?;
//! engine.initialize()?;
//! engine.start()?;
//! ```

pub mod sample_format;

#[cfg(target_os = "windows")]
pub mod backend;
#[cfg(target_os = "windows")]
pub mod capture_stream;
#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
mod process;

pub use sample_format::SampleEncoding;

#[cfg(target_os = "windows")]
pub use backend::WasapiBackend;
#[cfg(target_os = "windows")]
pub use capture_stream::WasapiCaptureStream;

/// Capture engine bound to the WASAPI backend.
#[cfg(target_os = "windows")]
pub type WasapiCaptureEngine = loopback_capture_core::CaptureEngine<WasapiBackend>;
