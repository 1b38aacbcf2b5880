use serde::{Deserialize, Serialize};

/// Sample rate, channel count, and bit depth of an audio stream.
///
/// Describes either the device's native mix format or the fixed target
/// format delivered to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// The format every consumer receives: mono, 16-bit precision, 16 kHz.
    pub const TARGET: AudioFormat = AudioFormat {
        sample_rate: 16_000,
        channels: 1,
        bits_per_sample: 16,
    };

    pub const fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Bytes per second when stored as integer PCM at this format.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }
}

/// An audio session on the render endpoint and the process that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSession {
    pub process_id: u32,
    pub executable_path: String,
}

impl ApplicationSession {
    /// File name of the owning executable.
    ///
    /// Splits on both `\` and `/` so Windows paths read the same on every host.
    pub fn name(&self) -> &str {
        self.executable_path
            .rsplit(|c: char| c == '\\' || c == '/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.executable_path)
    }
}

/// Counters collected by the capture thread, reset on every `start()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureStats {
    pub buffers_delivered: u64,
    pub native_frames_captured: u64,
    pub frames_delivered: u64,
    pub silent_buffers: u64,
    /// RMS level of the last delivered buffer (0.0–1.0 for normalized audio).
    pub last_rms: f32,
    pub last_peak: f32,
}
