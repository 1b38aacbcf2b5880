//! Scripted in-memory backend for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::facade::CaptureEngine;
use crate::engine::handles::HandleKind;
use crate::models::audio_models::AudioFormat;
use crate::models::config::EngineConfig;
use crate::models::error::CaptureError;
use crate::traits::backend::{AudioBackend, AudioClient, BufferFlags, CapturePacket, CaptureStream, SessionManager};

/// Failure switches, all off by default.
#[derive(Default)]
pub(crate) struct Failures {
    pub no_device: AtomicBool,
    pub client_activation: AtomicBool,
    pub session_manager: AtomicBool,
    pub initialize: AtomicBool,
    pub capture_service: AtomicBool,
    pub start: AtomicBool,
    pub stop: AtomicBool,
    pub packet_size: AtomicBool,
    pub thread_entry_panic: AtomicBool,
}

pub(crate) struct MockPacket {
    pub samples: Vec<f32>,
    pub frames: u32,
    pub flags: BufferFlags,
}

/// Everything the mock handles read from and report to.
pub(crate) struct MockScript {
    pub format: Mutex<AudioFormat>,
    pub packets: Mutex<VecDeque<MockPacket>>,
    pub fail: Failures,
    pub released: Mutex<Vec<HandleKind>>,
    pub sessions: Mutex<Vec<Result<u32, CaptureError>>>,
    pub paths: Mutex<HashMap<u32, String>>,
    pub loopback_inits: AtomicUsize,
    pub client_starts: AtomicUsize,
    pub client_stops: AtomicUsize,
    pub released_buffers: AtomicUsize,
    pub capture_threads: Mutex<Vec<ThreadId>>,
}

#[derive(Clone)]
pub(crate) struct MockBackend {
    pub script: Arc<MockScript>,
}

impl MockBackend {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            script: Arc::new(MockScript {
                format: Mutex::new(format),
                packets: Mutex::new(VecDeque::new()),
                fail: Failures::default(),
                released: Mutex::new(Vec::new()),
                sessions: Mutex::new(Vec::new()),
                paths: Mutex::new(HashMap::new()),
                loopback_inits: AtomicUsize::new(0),
                client_starts: AtomicUsize::new(0),
                client_stops: AtomicUsize::new(0),
                released_buffers: AtomicUsize::new(0),
                capture_threads: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn stereo_48k() -> Self {
        Self::new(AudioFormat::new(48_000, 2, 32))
    }

    /// Queue one packet of interleaved samples.
    pub fn push_packet(&self, samples: Vec<f32>, silent: bool) {
        let channels = self.script.format.lock().channels.max(1) as usize;
        let frames = (samples.len() / channels) as u32;
        self.script.packets.lock().push_back(MockPacket {
            samples,
            frames,
            flags: BufferFlags {
                silent,
                discontinuity: false,
            },
        });
    }

    pub fn add_session(&self, process_id: u32, path: Option<&str>) {
        self.script.sessions.lock().push(Ok(process_id));
        if let Some(path) = path {
            self.script.paths.lock().insert(process_id, path.to_string());
        }
    }

    pub fn add_broken_session(&self) {
        self.script
            .sessions
            .lock()
            .push(Err(CaptureError::StreamError("session control lost".into())));
    }

    pub fn released(&self) -> Vec<HandleKind> {
        self.script.released.lock().clone()
    }

    /// Number of capture threads that have entered the stream.
    pub fn capture_thread_count(&self) -> usize {
        self.script.capture_threads.lock().len()
    }
}

fn status(message: &str) -> String {
    format!("mock: {}", message)
}

/// Handle that logs its release into the script.
pub(crate) struct Tracked {
    kind: HandleKind,
    script: Arc<MockScript>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.script.released.lock().push(self.kind);
    }
}

pub(crate) struct MockClient {
    _tracked: Tracked,
    script: Arc<MockScript>,
}

pub(crate) struct MockStream {
    _tracked: Tracked,
    script: Arc<MockScript>,
    current: Option<MockPacket>,
}

pub(crate) struct MockSessionManager {
    _tracked: Tracked,
    script: Arc<MockScript>,
}

impl MockBackend {
    fn tracked(&self, kind: HandleKind) -> Tracked {
        Tracked {
            kind,
            script: Arc::clone(&self.script),
        }
    }
}

impl AudioBackend for MockBackend {
    type Enumerator = Tracked;
    type Device = Tracked;
    type Client = MockClient;
    type Stream = MockStream;
    type SessionManager = MockSessionManager;

    fn create_enumerator(&self) -> Result<Tracked, CaptureError> {
        Ok(self.tracked(HandleKind::Enumerator))
    }

    fn default_render_endpoint(&self, _enumerator: &Tracked) -> Result<Tracked, CaptureError> {
        if self.script.fail.no_device.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceUnavailable);
        }
        Ok(self.tracked(HandleKind::Device))
    }

    fn endpoint_name(&self, _device: &Tracked) -> Option<String> {
        Some("Mock Speakers".into())
    }

    fn activate_client(&self, _device: &Tracked) -> Result<MockClient, CaptureError> {
        if self.script.fail.client_activation.load(Ordering::SeqCst) {
            return Err(CaptureError::ActivationFailed(status("access denied")));
        }
        Ok(MockClient {
            _tracked: self.tracked(HandleKind::Client),
            script: Arc::clone(&self.script),
        })
    }

    fn activate_session_manager(&self, _device: &Tracked) -> Result<MockSessionManager, CaptureError> {
        if self.script.fail.session_manager.load(Ordering::SeqCst) {
            return Err(CaptureError::SessionManagerUnavailable(status("not supported")));
        }
        Ok(MockSessionManager {
            _tracked: self.tracked(HandleKind::SessionManager),
            script: Arc::clone(&self.script),
        })
    }

    fn resolve_process_path(&self, process_id: u32) -> Result<String, CaptureError> {
        self.script
            .paths
            .lock()
            .get(&process_id)
            .cloned()
            .ok_or(CaptureError::Unresolvable(process_id))
    }
}

impl AudioClient for MockClient {
    type Stream = MockStream;

    fn mix_format(&self) -> Result<AudioFormat, CaptureError> {
        Ok(*self.script.format.lock())
    }

    fn initialize_loopback(&mut self, _format: &AudioFormat) -> Result<(), CaptureError> {
        if self.script.fail.initialize.load(Ordering::SeqCst) {
            return Err(CaptureError::InitializationFailed(status("format rejected")));
        }
        self.script.loopback_inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture_stream(&self) -> Result<MockStream, CaptureError> {
        if self.script.fail.capture_service.load(Ordering::SeqCst) {
            return Err(CaptureError::ServiceUnavailable(status("no capture service")));
        }
        Ok(MockStream {
            _tracked: Tracked {
                kind: HandleKind::CaptureStream,
                script: Arc::clone(&self.script),
            },
            script: Arc::clone(&self.script),
            current: None,
        })
    }

    fn start(&self) -> Result<(), CaptureError> {
        if self.script.fail.start.load(Ordering::SeqCst) {
            return Err(CaptureError::StartFailed(status("device in use")));
        }
        self.script.client_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), CaptureError> {
        self.script.client_stops.fetch_add(1, Ordering::SeqCst);
        if self.script.fail.stop.load(Ordering::SeqCst) {
            return Err(CaptureError::StopFailed(status("device removed")));
        }
        Ok(())
    }
}

impl CaptureStream for MockStream {
    fn enter_capture_thread(&mut self) -> Result<(), CaptureError> {
        self.script.capture_threads.lock().push(thread::current().id());
        if self.script.fail.thread_entry_panic.load(Ordering::SeqCst) {
            panic!("capture thread setup crashed");
        }
        Ok(())
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        if self.script.fail.packet_size.load(Ordering::SeqCst) {
            return Err(CaptureError::StreamError(status("device invalidated")));
        }
        Ok(self.script.packets.lock().front().map_or(0, |p| p.frames))
    }

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError> {
        self.current = self.script.packets.lock().pop_front();
        let packet = self
            .current
            .as_ref()
            .ok_or_else(|| CaptureError::StreamError(status("no packet")))?;
        Ok(CapturePacket {
            samples: &packet.samples,
            frames: packet.frames,
            flags: packet.flags,
        })
    }

    fn release_buffer(&mut self, _frames: u32) -> Result<(), CaptureError> {
        self.current = None;
        self.script.released_buffers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait_for_data(&mut self, interval: Duration) {
        thread::sleep(interval);
    }
}

impl SessionManager for MockSessionManager {
    fn session_process_ids(&self) -> Result<Vec<Result<u32, CaptureError>>, CaptureError> {
        Ok(self.script.sessions.lock().clone())
    }
}

/// Engine over `backend` with a 1 ms poll interval.
pub(crate) fn engine(backend: &MockBackend) -> CaptureEngine<MockBackend> {
    let config = EngineConfig {
        poll_interval: Duration::from_millis(1),
        ..Default::default()
    };
    match CaptureEngine::with_config(backend.clone(), config) {
        Ok(engine) => engine,
        Err(e) => panic!("test config rejected: {}", e),
    }
}
