use crate::models::error::CaptureError;
use crate::traits::backend::{AudioBackend, AudioClient};

/// The OS capabilities an engine can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum HandleKind {
    Enumerator,
    Device,
    Client,
    CaptureStream,
    SessionManager,
}

/// Owning arena for every backend handle held by one engine.
///
/// Acquisition order is recorded as handles are created. `release_all` pops
/// that record and drops each handle, so teardown runs in strict reverse
/// order and every handle is released at most once.
pub(crate) struct HandleSet<B: AudioBackend> {
    enumerator: Option<B::Enumerator>,
    device: Option<B::Device>,
    pub(crate) client: Option<B::Client>,
    /// `None` while the capture thread has borrowed the stream.
    pub(crate) capture: Option<B::Stream>,
    session_manager: Option<B::SessionManager>,
    order: Vec<HandleKind>,
}

impl<B: AudioBackend> HandleSet<B> {
    pub(crate) fn new() -> Self {
        Self {
            enumerator: None,
            device: None,
            client: None,
            capture: None,
            session_manager: None,
            order: Vec::new(),
        }
    }

    /// Record that `kind` was just acquired.
    pub(crate) fn acquired(&mut self, kind: HandleKind) {
        log::debug!("Acquired {:?}", kind);
        self.order.push(kind);
    }

    /// Drop `kind` from the release record without releasing it here.
    ///
    /// Used when the handle was consumed elsewhere (e.g. dropped together
    /// with a capture thread that failed to spawn).
    pub(crate) fn forget(&mut self, kind: HandleKind) {
        self.order.retain(|k| *k != kind);
    }

    pub(crate) fn device(&mut self, backend: &B) -> Result<&B::Device, CaptureError> {
        if self.device.is_none() {
            if self.enumerator.is_none() {
                self.enumerator = Some(backend.create_enumerator()?);
                self.acquired(HandleKind::Enumerator);
            }
            let Some(enumerator) = self.enumerator.as_ref() else {
                return Err(CaptureError::DeviceUnavailable);
            };
            let device = backend.default_render_endpoint(enumerator)?;
            if let Some(name) = backend.endpoint_name(&device) {
                log::info!("Default render endpoint: {}", name);
            }
            self.device = Some(device);
            self.acquired(HandleKind::Device);
        }
        self.device.as_ref().ok_or(CaptureError::DeviceUnavailable)
    }

    pub(crate) fn client(&mut self, backend: &B) -> Result<&mut B::Client, CaptureError> {
        if self.client.is_none() {
            let client = backend.activate_client(self.device(backend)?)?;
            self.client = Some(client);
            self.acquired(HandleKind::Client);
        }
        self.client
            .as_mut()
            .ok_or_else(|| CaptureError::ActivationFailed("audio client missing".into()))
    }

    pub(crate) fn session_manager(&mut self, backend: &B) -> Result<&B::SessionManager, CaptureError> {
        if self.session_manager.is_none() {
            let manager = backend.activate_session_manager(self.device(backend)?)?;
            self.session_manager = Some(manager);
            self.acquired(HandleKind::SessionManager);
        }
        self.session_manager
            .as_ref()
            .ok_or_else(|| CaptureError::SessionManagerUnavailable("session manager missing".into()))
    }

    /// Acquire the capture stream from an initialized client if it is not held.
    pub(crate) fn ensure_capture_stream(&mut self) -> Result<(), CaptureError> {
        if self.capture.is_some() {
            return Ok(());
        }
        let client = self.client.as_ref().ok_or(CaptureError::NotInitialized)?;
        let stream = client.capture_stream()?;
        self.capture = Some(stream);
        self.forget(HandleKind::CaptureStream);
        self.acquired(HandleKind::CaptureStream);
        Ok(())
    }

    /// Release every held handle in reverse acquisition order.
    ///
    /// Returns the order in which handles were released.
    pub(crate) fn release_all(&mut self) -> Vec<HandleKind> {
        let mut released = Vec::with_capacity(self.order.len());
        while let Some(kind) = self.order.pop() {
            match kind {
                HandleKind::Enumerator => drop(self.enumerator.take()),
                HandleKind::Device => drop(self.device.take()),
                HandleKind::Client => drop(self.client.take()),
                HandleKind::CaptureStream => drop(self.capture.take()),
                HandleKind::SessionManager => drop(self.session_manager.take()),
            }
            log::debug!("Released {:?}", kind);
            released.push(kind);
        }
        released
    }
}
