use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFormat, CaptureStats};
use crate::models::error::CaptureError;
use crate::models::state::CaptureState;
use crate::processing::mono_resampler::{self, MonoResampler};
use crate::traits::backend::CaptureStream;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::frame_callback::FrameCallback;

/// State shared between the control thread and the capture thread.
pub(crate) struct LoopShared {
    /// Cancellation flag. Cleared by `stop()` or by the loop itself on a fault.
    pub(crate) running: AtomicBool,
    /// Held for the whole callback invocation, so a replaced callback is
    /// never invoked once `set_callback()` has returned.
    pub(crate) callback: Mutex<Option<FrameCallback>>,
    pub(crate) fault: Mutex<Option<CaptureError>>,
    pub(crate) stats: Mutex<CaptureStats>,
    pub(crate) delegate: Mutex<Option<Arc<dyn CaptureDelegate>>>,
}

impl LoopShared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            callback: Mutex::new(None),
            fault: Mutex::new(None),
            stats: Mutex::new(CaptureStats::default()),
            delegate: Mutex::new(None),
        }
    }

    pub(crate) fn delegate(&self) -> Option<Arc<dyn CaptureDelegate>> {
        self.delegate.lock().clone()
    }
}

/// What the capture thread hands back when it is joined.
pub(crate) struct LoopExit<S> {
    pub(crate) stream: S,
    pub(crate) result: Result<(), CaptureError>,
}

/// Pull loop run on the dedicated capture thread.
///
/// ```text
/// [next_packet_size] ─0─→ [wait_for_data]
///        │>0
/// [get_buffer] → [MonoResampler] → [callback] → [release_buffer]
/// ```
pub(crate) struct CaptureLoop<S: CaptureStream> {
    stream: S,
    shared: Arc<LoopShared>,
    resampler: MonoResampler,
    poll_interval: Duration,
    next_progress_log: u64,
}

impl<S: CaptureStream> CaptureLoop<S> {
    pub(crate) fn new(stream: S, shared: Arc<LoopShared>, native: AudioFormat, poll_interval: Duration) -> Self {
        Self {
            stream,
            shared,
            resampler: MonoResampler::new(native, AudioFormat::TARGET.sample_rate),
            poll_interval,
            next_progress_log: native.sample_rate as u64,
        }
    }

    /// Run until cancelled or until the stream fails, then return the stream.
    pub(crate) fn run(mut self) -> LoopExit<S> {
        let native = self.resampler.native_format();
        log::debug!(
            "Capture thread running: {} Hz x{} → {} Hz mono",
            native.sample_rate,
            native.channels,
            self.resampler.target_rate()
        );

        let result = match self.stream.enter_capture_thread() {
            Ok(()) => {
                let result = self.pull_until_cancelled();
                self.stream.leave_capture_thread();
                result
            }
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            self.report_fault(e);
        }
        log::debug!("Capture thread exiting");

        LoopExit {
            stream: self.stream,
            result,
        }
    }

    fn pull_until_cancelled(&mut self) -> Result<(), CaptureError> {
        while self.shared.running.load(Ordering::SeqCst) {
            let packet_frames = self.stream.next_packet_size().map_err(as_stream_error)?;
            if packet_frames == 0 {
                self.stream.wait_for_data(self.poll_interval);
                continue;
            }
            self.deliver_next_packet()?;
        }
        Ok(())
    }

    /// Pull one packet, transform it, hand it to the callback and release it.
    fn deliver_next_packet(&mut self) -> Result<(), CaptureError> {
        let packet = self.stream.get_buffer().map_err(as_stream_error)?;
        let frames = packet.frames;
        let silent = packet.flags.silent;
        if packet.flags.discontinuity {
            log::debug!("Data discontinuity before packet of {} frames", frames);
        }

        // Silent packets still carry zeroed samples and are delivered.
        let output = self.resampler.process(packet.samples, frames as usize);
        let delivery = {
            let slot = self.shared.callback.lock();
            match slot.as_ref() {
                Some(callback) => panic::catch_unwind(AssertUnwindSafe(|| callback(output, output.len()))),
                None => Ok(()),
            }
        };
        if delivery.is_err() {
            // The packet is still handed back so the stream can be restarted.
            self.stream.release_buffer(frames).map_err(as_stream_error)?;
            return Err(CaptureError::StreamError("frame callback panicked".into()));
        }

        let delivered = output.len() as u64;
        let rms = mono_resampler::rms_level(output);
        let peak = mono_resampler::peak_level(output);
        let total_frames = {
            let mut stats = self.shared.stats.lock();
            stats.buffers_delivered += 1;
            stats.native_frames_captured += frames as u64;
            stats.frames_delivered += delivered;
            if silent {
                stats.silent_buffers += 1;
            }
            stats.last_rms = rms;
            stats.last_peak = peak;
            stats.native_frames_captured
        };

        if total_frames >= self.next_progress_log {
            log::debug!("Captured {} native frames", total_frames);
            self.next_progress_log = total_frames + self.resampler.native_format().sample_rate as u64;
        }

        self.stream.release_buffer(frames).map_err(as_stream_error)
    }

    fn report_fault(&self, error: &CaptureError) {
        log::error!("Capture thread stopped: {}", error);
        self.shared.running.store(false, Ordering::SeqCst);
        *self.shared.fault.lock() = Some(error.clone());

        if let Some(delegate) = self.shared.delegate() {
            delegate.on_error(error);
            delegate.on_state_changed(&CaptureState::Faulted(error.clone()));
        }
    }
}

fn as_stream_error(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::StreamError(_) => error,
        other => CaptureError::StreamError(other.to_string()),
    }
}
