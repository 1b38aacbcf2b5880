use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::models::audio_models::{ApplicationSession, AudioFormat, CaptureStats};
use crate::models::config::EngineConfig;
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::traits::backend::{AudioBackend, AudioClient};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::frame_callback::FrameCallback;

use super::capture_loop::{CaptureLoop, LoopExit, LoopShared};
use super::handles::{HandleKind, HandleSet};
use super::session_directory;

/// Loopback capture engine for the default render endpoint.
///
/// Generic over the host audio subsystem via [`AudioBackend`]. Delivers mono
/// 16 kHz float frames to a single registered [`FrameCallback`] from a
/// dedicated capture thread.
///
/// ```text
/// new → resolve_format → initialize → start ⇄ stop → destroy
/// ```
///
/// Control calls take `&mut self`; wrap the engine in a `Mutex` to drive it
/// from several threads.
pub struct CaptureEngine<B: AudioBackend> {
    backend: B,
    config: EngineConfig,
    handles: HandleSet<B>,
    native_format: Option<AudioFormat>,
    client_initialized: bool,
    state: CaptureState,
    shared: Arc<LoopShared>,
    capture_thread: Option<JoinHandle<LoopExit<B::Stream>>>,
}

impl<B: AudioBackend> CaptureEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: EngineConfig::default(),
            handles: HandleSet::new(),
            native_format: None,
            client_initialized: false,
            state: CaptureState::Created,
            shared: Arc::new(LoopShared::new()),
            capture_thread: None,
        }
    }

    pub fn with_config(backend: B, config: EngineConfig) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        let mut engine = Self::new(backend);
        engine.config = config;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The delivered format. Always `AudioFormat::TARGET`.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::TARGET
    }

    /// The endpoint mix format, once resolved.
    pub fn native_format(&self) -> Option<AudioFormat> {
        self.native_format
    }

    /// Current state. Reports `Faulted` once the capture thread has died, on
    /// a stream error or otherwise, until the next `stop()` or `start()`.
    pub fn state(&self) -> CaptureState {
        if self.state.is_capturing() {
            if let Some(error) = self.shared.fault.lock().clone() {
                return CaptureState::Faulted(error);
            }
            // The loop only exits cleanly after `running` is cleared.
            let exited = self.capture_thread.as_ref().is_some_and(|handle| handle.is_finished());
            if exited && self.shared.running.load(Ordering::SeqCst) {
                return CaptureState::Faulted(CaptureError::StreamError("capture thread exited unexpectedly".into()));
            }
        }
        self.state.clone()
    }

    /// Delivery counters for the current (or last) capture run.
    pub fn stats(&self) -> CaptureStats {
        *self.shared.stats.lock()
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    /// Register the frame consumer, replacing any previous one.
    ///
    /// Once this returns the previous callback will not be invoked again.
    pub fn set_callback(&mut self, callback: FrameCallback) -> Result<(), CaptureError> {
        self.ensure_alive()?;
        self.ensure_not_capture_thread()?;
        let previous = self.shared.callback.lock().replace(callback);
        if previous.is_some() {
            log::debug!("Replaced frame callback");
        }
        Ok(())
    }

    pub fn clear_callback(&mut self) -> Result<(), CaptureError> {
        self.ensure_alive()?;
        self.ensure_not_capture_thread()?;
        self.shared.callback.lock().take();
        Ok(())
    }

    /// Resolve (and memoize) the endpoint's native mix format.
    pub fn resolve_format(&mut self) -> Result<AudioFormat, CaptureError> {
        self.ensure_alive()?;
        if let Some(format) = self.native_format {
            return Ok(format);
        }

        let format = self.handles.client(&self.backend)?.mix_format()?;
        if format.sample_rate == 0 || format.channels == 0 {
            return Err(CaptureError::ActivationFailed(format!(
                "unusable mix format: {} Hz, {} ch",
                format.sample_rate, format.channels
            )));
        }

        log::info!(
            "Native mix format: {} Hz, {} ch, {} bit; delivering {} Hz mono",
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            AudioFormat::TARGET.sample_rate
        );
        self.native_format = Some(format);
        if matches!(self.state, CaptureState::Created) {
            self.set_state(CaptureState::FormatResolved);
        }
        Ok(format)
    }

    /// Configure shared-mode loopback and acquire the capture stream.
    ///
    /// On failure the engine stays in `FormatResolved` and the call can be
    /// retried; a client initialization that already succeeded is not re-run.
    pub fn initialize(&mut self) -> Result<(), CaptureError> {
        self.ensure_alive()?;
        if self.state.is_initialized() {
            return Ok(());
        }

        let native = self.resolve_format()?;
        if !self.client_initialized {
            self.handles
                .client(&self.backend)?
                .initialize_loopback(&native)
                .map_err(as_initialization_failure)?;
            self.client_initialized = true;
        }
        self.handles.ensure_capture_stream().map_err(as_initialization_failure)?;

        self.set_state(CaptureState::Initialized);
        log::info!("Loopback capture initialized");
        Ok(())
    }

    /// Start the OS stream and spawn the capture thread.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.ensure_alive()?;
        self.ensure_not_capture_thread()?;

        match self.state() {
            CaptureState::Capturing => return Ok(()),
            CaptureState::Faulted(error) => {
                log::warn!("Restarting capture after fault: {}", error);
                self.reap_capture_thread();
                if let Err(e) = self.stop_client() {
                    log::warn!("{}", e);
                }
                self.set_state(CaptureState::Stopped);
            }
            state if !state.is_initialized() => return Err(CaptureError::NotInitialized),
            _ => {}
        }

        let native = self.native_format.ok_or(CaptureError::NotInitialized)?;
        self.handles.ensure_capture_stream().map_err(as_start_failure)?;
        self.handles.client.as_ref().ok_or(CaptureError::NotInitialized)?.start()?;

        let Some(stream) = self.handles.capture.take() else {
            return Err(CaptureError::NotInitialized);
        };
        *self.shared.fault.lock() = None;
        *self.shared.stats.lock() = CaptureStats::default();
        self.shared.running.store(true, Ordering::SeqCst);

        let capture_loop = CaptureLoop::new(stream, Arc::clone(&self.shared), native, self.config.poll_interval);
        let spawned = thread::Builder::new()
            .name(self.config.capture_thread_name.clone())
            .spawn(move || capture_loop.run());

        match spawned {
            Ok(handle) => {
                self.capture_thread = Some(handle);
                self.set_state(CaptureState::Capturing);
                log::info!("Loopback capture started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                // The stream was dropped along with the unspawned closure.
                self.handles.forget(HandleKind::CaptureStream);
                if let Err(stop_error) = self.stop_client() {
                    log::warn!("{}", stop_error);
                }
                Err(CaptureError::StartFailed(format!("failed to spawn capture thread: {}", e)))
            }
        }
    }

    /// Start capture after a best-effort check that `process_id` owns an
    /// audio session on the endpoint.
    ///
    /// Loopback capture is endpoint-wide: this records everything the
    /// endpoint plays, not only the given process.
    pub fn start_for_process(&mut self, process_id: u32) -> Result<(), CaptureError> {
        match self.has_session(process_id) {
            Ok(true) => log::info!("Process {} owns an audio session; capturing the whole endpoint", process_id),
            Ok(false) => log::warn!("Process {} has no audio session; capturing the whole endpoint", process_id),
            Err(e) => log::warn!("Session lookup for process {} failed: {}", process_id, e),
        }
        self.start()
    }

    /// Signal the capture thread, wait for it to exit, then stop the OS stream.
    ///
    /// The wait is unbounded: an in-flight callback always runs to completion.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        self.ensure_alive()?;
        self.ensure_not_capture_thread()?;
        if !self.state.has_capture_thread() {
            return Ok(());
        }

        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(Err(e)) = self.reap_capture_thread() {
            log::debug!("Capture thread had exited with: {}", e);
        }
        let stopped = self.stop_client();
        self.set_state(CaptureState::Stopped);
        log::info!("Loopback capture stopped");
        stopped
    }

    /// Stop capture if active and release every handle in reverse
    /// acquisition order. Idempotent.
    pub fn destroy(&mut self) {
        if self.state.is_destroyed() {
            return;
        }

        if self.is_capture_thread() {
            // Cannot join ourselves: detach, and let the thread drop the
            // stream when its current callback returns.
            log::warn!("Engine destroyed from its own capture thread; detaching");
            self.shared.running.store(false, Ordering::SeqCst);
            self.capture_thread.take();
            self.handles.forget(HandleKind::CaptureStream);
            if let Err(e) = self.stop_client() {
                log::warn!("Stop during teardown failed: {}", e);
            }
        } else {
            if let Err(e) = self.stop() {
                log::warn!("Stop during teardown failed: {}", e);
            }
            self.shared.callback.lock().take();
        }

        let released = self.handles.release_all();
        log::debug!("Released handles: {:?}", released);
        self.native_format = None;
        self.client_initialized = false;
        self.set_state(CaptureState::Destroyed);
    }

    /// Applications that currently own an audio session, at most `max_count`.
    ///
    /// Returns an empty list if the session manager is unavailable.
    pub fn list_applications(&mut self, max_count: usize) -> Vec<ApplicationSession> {
        if max_count == 0 || self.state.is_destroyed() {
            return Vec::new();
        }
        match self.handles.session_manager(&self.backend) {
            Ok(manager) => session_directory::list_applications(&self.backend, manager, max_count),
            Err(e) => {
                log::warn!("Audio session listing unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// [`list_applications`](Self::list_applications) with the configured limit.
    pub fn applications(&mut self) -> Vec<ApplicationSession> {
        self.list_applications(self.config.max_applications)
    }

    pub fn has_session(&mut self, process_id: u32) -> Result<bool, CaptureError> {
        self.ensure_alive()?;
        let manager = self.handles.session_manager(&self.backend)?;
        session_directory::has_session(manager, process_id)
    }

    // --- Internal helpers ---

    fn set_state(&mut self, state: CaptureState) {
        log::debug!("State: {} → {}", self.state.name(), state.name());
        self.state = state.clone();
        if let Some(delegate) = self.shared.delegate() {
            delegate.on_state_changed(&state);
        }
    }

    fn ensure_alive(&self) -> Result<(), CaptureError> {
        if self.state.is_destroyed() {
            return Err(CaptureError::Destroyed);
        }
        Ok(())
    }

    fn is_capture_thread(&self) -> bool {
        self.capture_thread
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == thread::current().id())
    }

    fn ensure_not_capture_thread(&self) -> Result<(), CaptureError> {
        if self.is_capture_thread() {
            return Err(CaptureError::CaptureThreadReentry);
        }
        Ok(())
    }

    /// Join the capture thread and take the stream back.
    fn reap_capture_thread(&mut self) -> Option<Result<(), CaptureError>> {
        let handle = self.capture_thread.take()?;
        match handle.join() {
            Ok(exit) => {
                self.handles.capture = Some(exit.stream);
                Some(exit.result)
            }
            Err(_) => {
                log::error!("Capture thread panicked");
                self.handles.forget(HandleKind::CaptureStream);
                Some(Err(CaptureError::StreamError("capture thread panicked".into())))
            }
        }
    }

    fn stop_client(&self) -> Result<(), CaptureError> {
        match self.handles.client.as_ref() {
            Some(client) => client.stop(),
            None => Ok(()),
        }
    }
}

impl<B: AudioBackend> Drop for CaptureEngine<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn as_initialization_failure(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::InitializationFailed(_) => error,
        other => CaptureError::InitializationFailed(other.to_string()),
    }
}

fn as_start_failure(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::StartFailed(_) => error,
        other => CaptureError::StartFailed(other.to_string()),
    }
}
