//! WASAPI implementation of the loopback capability traits.
//!
//! Every handle wraps a COM interface (released when the wrapper drops) or a
//! CoTaskMem allocation (freed in `Drop`).

use std::marker::PhantomData;

use windows::core::{Interface, GUID};
use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::{
    eConsole, eRender, IAudioCaptureClient, IAudioClient, IAudioSessionControl2, IAudioSessionEnumerator,
    IAudioSessionManager2, IMMDevice, IMMDeviceEnumerator, MMDeviceEnumerator, AUDCLNT_SHAREMODE_SHARED,
    AUDCLNT_STREAMFLAGS_LOOPBACK, WAVEFORMATEX, WAVEFORMATEXTENSIBLE,
};
use windows::Win32::System::Com::{CoCreateInstance, CoTaskMemFree, CLSCTX_ALL, STGM_READ};

use loopback_capture_core::{AudioBackend, AudioClient, AudioFormat, CaptureError, SessionManager};

use crate::capture_stream::WasapiCaptureStream;
use crate::com::ComApartment;
use crate::process;
use crate::sample_format::{SampleEncoding, WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM};

/// KSDATAFORMAT_SUBTYPE_IEEE_FLOAT GUID
const KSDATAFORMAT_SUBTYPE_IEEE_FLOAT: GUID = GUID::from_u128(0x00000003_0000_0010_8000_00aa00389b71);

/// KSDATAFORMAT_SUBTYPE_PCM GUID
const KSDATAFORMAT_SUBTYPE_PCM: GUID = GUID::from_u128(0x00000001_0000_0010_8000_00aa00389b71);

/// Loopback backend for the default Windows render endpoint.
///
/// Joins the multithreaded COM apartment on the creating thread. Create the
/// engine and issue its control calls from that thread.
pub struct WasapiBackend {
    _apartment: ComApartment,
    // The apartment must be left on the thread that entered it.
    _not_send: PhantomData<*const ()>,
}

impl WasapiBackend {
    pub fn new() -> Result<Self, CaptureError> {
        Ok(Self {
            _apartment: ComApartment::enter()?,
            _not_send: PhantomData,
        })
    }
}

pub struct WasapiEnumerator(IMMDeviceEnumerator);

pub struct WasapiDevice(IMMDevice);

pub struct WasapiSessionManager(IAudioSessionManager2);

/// Audio client plus the mix format it was activated with.
pub struct WasapiClient {
    client: IAudioClient,
    mix: MixFormat,
    encoding: Option<SampleEncoding>,
}

/// Mix format returned by `GetMixFormat`, freed with `CoTaskMemFree`.
struct MixFormat(*mut WAVEFORMATEX);

impl MixFormat {
    fn header(&self) -> WAVEFORMATEX {
        unsafe { std::ptr::read_unaligned(self.0) }
    }

    fn audio_format(&self) -> AudioFormat {
        let header = self.header();
        AudioFormat::new(header.nSamplesPerSec, header.nChannels, header.wBitsPerSample)
    }

    /// Encoding of capture buffers, resolving extensible SubFormat GUIDs.
    fn encoding(&self) -> Result<SampleEncoding, CaptureError> {
        let header = self.header();
        let tag = if header.wFormatTag == WAVE_FORMAT_EXTENSIBLE {
            let ext = self.0 as *const WAVEFORMATEXTENSIBLE;
            let sub_format = unsafe { std::ptr::read_unaligned(std::ptr::addr_of!((*ext).SubFormat)) };
            if sub_format == KSDATAFORMAT_SUBTYPE_IEEE_FLOAT {
                WAVE_FORMAT_IEEE_FLOAT
            } else if sub_format == KSDATAFORMAT_SUBTYPE_PCM {
                WAVE_FORMAT_PCM
            } else {
                0
            }
        } else {
            header.wFormatTag
        };
        SampleEncoding::from_format(tag, header.wBitsPerSample)
    }
}

impl Drop for MixFormat {
    fn drop(&mut self) {
        unsafe { CoTaskMemFree(Some(self.0 as *const _)) };
    }
}

impl AudioBackend for WasapiBackend {
    type Enumerator = WasapiEnumerator;
    type Device = WasapiDevice;
    type Client = WasapiClient;
    type Stream = WasapiCaptureStream;
    type SessionManager = WasapiSessionManager;

    fn create_enumerator(&self) -> Result<WasapiEnumerator, CaptureError> {
        let enumerator: IMMDeviceEnumerator = unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL) }
            .map_err(|e| CaptureError::ActivationFailed(format!("failed to create device enumerator: {}", e)))?;
        Ok(WasapiEnumerator(enumerator))
    }

    fn default_render_endpoint(&self, enumerator: &WasapiEnumerator) -> Result<WasapiDevice, CaptureError> {
        // Loopback reads from the render endpoint, not a capture endpoint.
        let device = unsafe { enumerator.0.GetDefaultAudioEndpoint(eRender, eConsole) }.map_err(|e| {
            log::debug!("GetDefaultAudioEndpoint failed: {}", e);
            CaptureError::DeviceUnavailable
        })?;
        Ok(WasapiDevice(device))
    }

    fn endpoint_name(&self, device: &WasapiDevice) -> Option<String> {
        unsafe {
            let store = device.0.OpenPropertyStore(STGM_READ).ok()?;
            let value = store.GetValue(&PKEY_Device_FriendlyName).ok()?;
            Some(value.to_string()).filter(|name| !name.is_empty())
        }
    }

    fn activate_client(&self, device: &WasapiDevice) -> Result<WasapiClient, CaptureError> {
        let client: IAudioClient = unsafe { device.0.Activate(CLSCTX_ALL, None) }
            .map_err(|e| CaptureError::ActivationFailed(format!("IAudioClient activation failed: {}", e)))?;
        let mix = unsafe { client.GetMixFormat() }
            .map_err(|e| CaptureError::ActivationFailed(format!("GetMixFormat failed: {}", e)))?;
        Ok(WasapiClient {
            client,
            mix: MixFormat(mix),
            encoding: None,
        })
    }

    fn activate_session_manager(&self, device: &WasapiDevice) -> Result<WasapiSessionManager, CaptureError> {
        let manager: IAudioSessionManager2 = unsafe { device.0.Activate(CLSCTX_ALL, None) }
            .map_err(|e| CaptureError::SessionManagerUnavailable(format!("activation failed: {}", e)))?;
        Ok(WasapiSessionManager(manager))
    }

    fn resolve_process_path(&self, process_id: u32) -> Result<String, CaptureError> {
        process::executable_path(process_id)
    }
}

impl AudioClient for WasapiClient {
    type Stream = WasapiCaptureStream;

    fn mix_format(&self) -> Result<AudioFormat, CaptureError> {
        Ok(self.mix.audio_format())
    }

    /// Shared-mode loopback on the client's own mix format; the engine
    /// converts to the target format itself.
    fn initialize_loopback(&mut self, format: &AudioFormat) -> Result<(), CaptureError> {
        let encoding = self.mix.encoding()?;
        log::debug!(
            "Initializing loopback: {} Hz, {} ch, {:?}",
            format.sample_rate,
            format.channels,
            encoding
        );

        // A zero buffer duration lets the audio engine choose its minimum.
        unsafe {
            self.client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_LOOPBACK,
                0,
                0,
                self.mix.0,
                None,
            )
        }
        .map_err(|e| CaptureError::InitializationFailed(format!("IAudioClient::Initialize failed: {}", e)))?;

        self.encoding = Some(encoding);
        Ok(())
    }

    fn capture_stream(&self) -> Result<WasapiCaptureStream, CaptureError> {
        let encoding = self
            .encoding
            .ok_or_else(|| CaptureError::ServiceUnavailable("audio client is not initialized".into()))?;
        let capture: IAudioCaptureClient = unsafe { self.client.GetService() }
            .map_err(|e| CaptureError::ServiceUnavailable(format!("GetService failed: {}", e)))?;
        Ok(WasapiCaptureStream::new(capture, encoding, self.mix.header().nChannels))
    }

    fn start(&self) -> Result<(), CaptureError> {
        unsafe { self.client.Start() }
            .map_err(|e| CaptureError::StartFailed(format!("IAudioClient::Start failed: {}", e)))
    }

    fn stop(&self) -> Result<(), CaptureError> {
        unsafe { self.client.Stop() }.map_err(|e| CaptureError::StopFailed(format!("IAudioClient::Stop failed: {}", e)))
    }
}

impl SessionManager for WasapiSessionManager {
    fn session_process_ids(&self) -> Result<Vec<Result<u32, CaptureError>>, CaptureError> {
        let sessions = unsafe { self.0.GetSessionEnumerator() }
            .map_err(|e| CaptureError::SessionManagerUnavailable(format!("GetSessionEnumerator failed: {}", e)))?;
        let count = unsafe { sessions.GetCount() }
            .map_err(|e| CaptureError::SessionManagerUnavailable(format!("GetCount failed: {}", e)))?;

        Ok((0..count).map(|index| session_process_id(&sessions, index)).collect())
    }
}

fn session_process_id(sessions: &IAudioSessionEnumerator, index: i32) -> Result<u32, CaptureError> {
    let unreadable = |e: windows::core::Error| {
        CaptureError::SessionManagerUnavailable(format!("session {} has no readable process id: {}", index, e))
    };
    let control = unsafe { sessions.GetSession(index) }.map_err(unreadable)?;
    let control: IAudioSessionControl2 = control.cast().map_err(unreadable)?;
    unsafe { control.GetProcessId() }.map_err(unreadable)
}
