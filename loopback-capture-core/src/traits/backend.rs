//! Capability interface consumed from the host audio subsystem.
//!
//! Every handle type owns exactly one OS resource and releases it in `Drop`.
//! The engine decides *when* handles are dropped; backends only decide *how*
//! a single handle is released.

use std::thread;
use std::time::Duration;

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;

/// Entry point to a platform loopback facility (WASAPI, test doubles, ...).
pub trait AudioBackend {
    /// Device enumerator capability.
    type Enumerator;
    /// Render endpoint handle.
    type Device;
    type Client: AudioClient<Stream = Self::Stream>;
    type Stream: CaptureStream;
    type SessionManager: SessionManager;

    /// Fails with `ActivationFailed` if the enumerator cannot be created.
    fn create_enumerator(&self) -> Result<Self::Enumerator, CaptureError>;

    /// Fails with `DeviceUnavailable` when no default render endpoint exists.
    fn default_render_endpoint(&self, enumerator: &Self::Enumerator) -> Result<Self::Device, CaptureError>;

    /// Human-readable endpoint name, used for logging only.
    fn endpoint_name(&self, _device: &Self::Device) -> Option<String> {
        None
    }

    /// Fails with `ActivationFailed` if the OS denies the audio client.
    fn activate_client(&self, device: &Self::Device) -> Result<Self::Client, CaptureError>;

    /// Fails with `SessionManagerUnavailable`.
    fn activate_session_manager(&self, device: &Self::Device) -> Result<Self::SessionManager, CaptureError>;

    /// Full executable path of a process, or `Unresolvable`.
    fn resolve_process_path(&self, process_id: u32) -> Result<String, CaptureError>;
}

/// Audio client bound to the render endpoint.
pub trait AudioClient {
    type Stream: CaptureStream;

    /// The endpoint's native shared-mode mix format.
    fn mix_format(&self) -> Result<AudioFormat, CaptureError>;

    /// Configure shared-mode loopback using `format`. Fails with `InitializationFailed`.
    fn initialize_loopback(&mut self, format: &AudioFormat) -> Result<(), CaptureError>;

    /// Acquire the capture-buffer capability. Fails with `ServiceUnavailable`.
    fn capture_stream(&self) -> Result<Self::Stream, CaptureError>;

    /// Fails with `StartFailed`.
    fn start(&self) -> Result<(), CaptureError>;

    /// Fails with `StopFailed`.
    fn stop(&self) -> Result<(), CaptureError>;
}

/// Status flags reported with a pulled buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// The OS marked the packet as silence.
    pub silent: bool,
    /// The OS reported a gap before this packet.
    pub discontinuity: bool,
}

/// One pulled packet of interleaved native samples.
///
/// `samples` holds `frames * channels` values and stays valid until the
/// packet is dropped and the buffer released.
#[derive(Debug)]
pub struct CapturePacket<'a> {
    pub samples: &'a [f32],
    pub frames: u32,
    pub flags: BufferFlags,
}

/// Capture-buffer capability, driven exclusively by the capture thread.
pub trait CaptureStream: Send + 'static {
    /// Per-thread OS setup, run once on the capture thread before pulling.
    fn enter_capture_thread(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    /// Undo `enter_capture_thread`, run once before the thread exits.
    fn leave_capture_thread(&mut self) {}

    /// Frames in the next packet; 0 means nothing is ready.
    fn next_packet_size(&mut self) -> Result<u32, CaptureError>;

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError>;

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError>;

    /// Called when no packet is ready. Polls by sleeping unless the backend
    /// can block on a readiness event instead.
    fn wait_for_data(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

/// Session-manager capability on the render endpoint.
pub trait SessionManager {
    /// One entry per session in OS enumeration order; an `Err` entry is a
    /// session whose owning process id could not be read.
    fn session_process_ids(&self) -> Result<Vec<Result<u32, CaptureError>>, CaptureError>;
}
