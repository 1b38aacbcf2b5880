//! `IAudioCaptureClient` wrapper driven by the engine's capture thread.

use windows::core::w;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Media::Audio::{
    IAudioCaptureClient, AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY, AUDCLNT_BUFFERFLAGS_SILENT,
};
use windows::Win32::System::Threading::{AvRevertMmThreadCharacteristics, AvSetMmThreadCharacteristicsW};

use loopback_capture_core::{BufferFlags, CaptureError, CapturePacket, CaptureStream};

use crate::com::ComApartment;
use crate::sample_format::SampleEncoding;

/// Capture-buffer capability of an initialized loopback client.
///
/// Float mix formats are handed out zero-copy; integer formats are decoded
/// into a scratch buffer that only grows.
pub struct WasapiCaptureStream {
    capture: IAudioCaptureClient,
    encoding: SampleEncoding,
    channels: usize,
    scratch: Vec<f32>,
    apartment: Option<ComApartment>,
    mmcss: Option<HANDLE>,
}

// SAFETY: the capture client is created in the multithreaded apartment and
// is used by one thread at a time: the control thread until `start()`, then
// the capture thread until it is joined.
unsafe impl Send for WasapiCaptureStream {}

impl WasapiCaptureStream {
    pub(crate) fn new(capture: IAudioCaptureClient, encoding: SampleEncoding, channels: u16) -> Self {
        Self {
            capture,
            encoding,
            channels: channels as usize,
            scratch: Vec::new(),
            apartment: None,
            mmcss: None,
        }
    }
}

impl CaptureStream for WasapiCaptureStream {
    /// Join the MTA and register with MMCSS ("Pro Audio").
    ///
    /// MMCSS registration is best-effort.
    fn enter_capture_thread(&mut self) -> Result<(), CaptureError> {
        self.apartment = Some(ComApartment::enter().map_err(|e| CaptureError::StreamError(e.to_string()))?);

        let mut task_index: u32 = 0;
        match unsafe { AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) } {
            Ok(handle) => {
                log::debug!("Capture thread registered with MMCSS (task {})", task_index);
                self.mmcss = Some(handle);
            }
            Err(e) => log::warn!("MMCSS registration failed: {}", e),
        }
        Ok(())
    }

    fn leave_capture_thread(&mut self) {
        if let Some(handle) = self.mmcss.take() {
            let _ = unsafe { AvRevertMmThreadCharacteristics(handle) };
        }
        self.apartment = None;
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        unsafe { self.capture.GetNextPacketSize() }
            .map_err(|e| CaptureError::StreamError(format!("GetNextPacketSize failed: {}", e)))
    }

    fn get_buffer(&mut self) -> Result<CapturePacket<'_>, CaptureError> {
        let mut data: *mut u8 = std::ptr::null_mut();
        let mut frames: u32 = 0;
        let mut raw_flags: u32 = 0;
        unsafe { self.capture.GetBuffer(&mut data, &mut frames, &mut raw_flags, None, None) }
            .map_err(|e| CaptureError::StreamError(format!("GetBuffer failed: {}", e)))?;

        let flags = BufferFlags {
            silent: raw_flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0,
            discontinuity: raw_flags & (AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY.0 as u32) != 0,
        };
        let total_samples = frames as usize * self.channels;

        let samples: &[f32] = if flags.silent || data.is_null() || total_samples == 0 {
            // Silent packets carry undefined data; deliver zeros.
            self.scratch.clear();
            self.scratch.resize(total_samples, 0.0);
            &self.scratch
        } else if self.encoding == SampleEncoding::Float32 {
            // SAFETY: WASAPI guarantees `frames * nBlockAlign` readable bytes
            // until ReleaseBuffer, and float mix buffers are 4-byte aligned.
            unsafe { std::slice::from_raw_parts(data as *const f32, total_samples) }
        } else {
            let byte_len = total_samples * self.encoding.bytes_per_sample();
            // SAFETY: as above.
            let bytes = unsafe { std::slice::from_raw_parts(data as *const u8, byte_len) };
            self.encoding.decode_into(bytes, &mut self.scratch);
            &self.scratch
        };

        Ok(CapturePacket { samples, frames, flags })
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError> {
        unsafe { self.capture.ReleaseBuffer(frames) }
            .map_err(|e| CaptureError::StreamError(format!("ReleaseBuffer failed: {}", e)))
    }
}
