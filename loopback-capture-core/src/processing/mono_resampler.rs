use crate::models::audio_models::AudioFormat;

/// Mono downmix and linear-interpolation resampler.
///
/// Converts interleaved native buffers into mono buffers at the target rate.
/// Each call is independent: interpolation phase is not carried across
/// buffers, so small discontinuities can appear at buffer edges.
///
/// Scratch buffers grow to the largest buffer seen and are never shrunk,
/// so steady-state traffic does not reallocate.
#[derive(Debug, Clone)]
pub struct MonoResampler {
    native: AudioFormat,
    target_rate: u32,
    mono: Vec<f32>,
    output: Vec<f32>,
}

impl MonoResampler {
    pub fn new(native: AudioFormat, target_rate: u32) -> Self {
        Self {
            native,
            target_rate,
            mono: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn native_format(&self) -> AudioFormat {
        self.native
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Downmix and resample one interleaved native buffer.
    ///
    /// `frames` is clamped to the number of whole frames in `interleaved`.
    /// The returned slice is valid until the next call.
    pub fn process(&mut self, interleaved: &[f32], frames: usize) -> &[f32] {
        let channels = self.native.channels as usize;
        if channels == 0 {
            return &[];
        }
        let frames = frames.min(interleaved.len() / channels);

        grow(&mut self.mono, frames);
        downmix_into(&interleaved[..frames * channels], channels, &mut self.mono[..frames]);

        let out_frames = output_frame_count(frames, self.native.sample_rate, self.target_rate);
        grow(&mut self.output, out_frames);
        resample_into(
            &self.mono[..frames],
            self.native.sample_rate,
            self.target_rate,
            &mut self.output[..out_frames],
        );

        &self.output[..out_frames]
    }

    /// Current scratch capacity in frames (mono, output).
    pub fn scratch_len(&self) -> (usize, usize) {
        (self.mono.len(), self.output.len())
    }
}

/// `floor(input_frames * target_rate / native_rate)`, computed exactly.
pub fn output_frame_count(input_frames: usize, native_rate: u32, target_rate: u32) -> usize {
    if native_rate == 0 {
        return 0;
    }
    (input_frames as u64 * target_rate as u64 / native_rate as u64) as usize
}

/// Average each interleaved frame into one sample of `mono`.
///
/// Writes `mono.len()` frames; `interleaved` must hold at least
/// `mono.len() * channels` samples.
pub fn downmix_into(interleaved: &[f32], channels: usize, mono: &mut [f32]) {
    if channels == 1 {
        mono.copy_from_slice(&interleaved[..mono.len()]);
        return;
    }
    let scale = 1.0 / channels as f32;
    for (out, frame) in mono.iter_mut().zip(interleaved.chunks_exact(channels)) {
        *out = frame.iter().sum::<f32>() * scale;
    }
}

/// Linear interpolation from `native_rate` to `target_rate`.
///
/// Fills all of `output`; callers size it with [`output_frame_count`].
pub fn resample_into(mono: &[f32], native_rate: u32, target_rate: u32, output: &mut [f32]) {
    if mono.is_empty() {
        return;
    }
    let last = mono.len() - 1;
    let step = native_rate as f64 / target_rate as f64;

    for (i, sample) in output.iter_mut().enumerate() {
        let position = i as f64 * step;
        let index = position as usize;
        let fraction = (position - index as f64) as f32;

        *sample = if index >= last {
            mono[index.min(last)]
        } else {
            mono[index] * (1.0 - fraction) + mono[index + 1] * fraction
        };
    }
}

/// Compute RMS level of samples (0.0–1.0 range for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Compute peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

fn grow(buffer: &mut Vec<f32>, len: usize) {
    if buffer.len() < len {
        buffer.resize(len, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn alternating_stereo_at_44k1_becomes_160_zero_frames() {
        let mut resampler = MonoResampler::new(AudioFormat::new(44_100, 2, 32), 16_000);
        let input: Vec<f32> = (0..441).flat_map(|_| [1.0f32, -1.0]).collect();

        let output = resampler.process(&input, 441);

        assert_eq!(output.len(), 160);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn identical_rates_return_the_mono_signal_exactly() {
        let mut resampler = MonoResampler::new(AudioFormat::new(16_000, 2, 32), 16_000);
        let input = [0.2f32, 0.4, -0.6, 0.2, 1.0, 0.0, 0.3, 0.3];

        let output = resampler.process(&input, 4).to_vec();

        let mut mono = vec![0.0f32; 4];
        downmix_into(&input, 2, &mut mono);
        assert_eq!(output, mono);
    }

    #[test]
    fn mono_native_passthrough_at_same_rate() {
        let mut resampler = MonoResampler::new(AudioFormat::new(16_000, 1, 32), 16_000);
        let input = [0.1f32, -0.2, 0.3];

        assert_eq!(resampler.process(&input, 3), &input[..]);
    }

    #[test]
    fn output_frame_count_is_floor_of_ratio() {
        assert_eq!(output_frame_count(441, 44_100, 16_000), 160);
        assert_eq!(output_frame_count(480, 48_000, 16_000), 160);
        assert_eq!(output_frame_count(479, 48_000, 16_000), 159);
        assert_eq!(output_frame_count(1, 48_000, 16_000), 0);
        assert_eq!(output_frame_count(100, 8_000, 16_000), 200);
        assert_eq!(output_frame_count(10, 0, 16_000), 0);
        for frames in [1usize, 7, 100, 1023, 4096] {
            for native in [8_000u32, 11_025, 22_050, 44_100, 48_000, 96_000] {
                let expected = (frames as f64 * 16_000.0 / native as f64).floor() as usize;
                assert_eq!(output_frame_count(frames, native, 16_000), expected);
            }
        }
    }

    #[test]
    fn downmix_is_independent_of_channel_order() {
        let frame = [0.5f32, -0.25, 0.125, 0.75];
        let permuted = [0.75f32, 0.125, 0.5, -0.25];

        let mut a = [0.0f32; 1];
        let mut b = [0.0f32; 1];
        downmix_into(&frame, 4, &mut a);
        downmix_into(&permuted, 4, &mut b);

        assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-7);
        assert_abs_diff_eq!(a[0], 0.28125, epsilon = 1e-7);
    }

    #[test]
    fn downmix_averages_channels() {
        let stereo = [0.2f32, 0.8, 0.4, 0.6];
        let mut mono = [0.0f32; 2];
        downmix_into(&stereo, 2, &mut mono);
        assert_abs_diff_eq!(mono[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(mono[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn upsample_interpolates_midpoints() {
        let mut resampler = MonoResampler::new(AudioFormat::new(8_000, 1, 32), 16_000);
        let output = resampler.process(&[0.0, 1.0], 2);

        // 2 frames at 8 kHz → 4 frames at 16 kHz
        assert_eq!(output.len(), 4);
        assert_abs_diff_eq!(output[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output[1], 0.5, epsilon = 1e-6);
        // Past the last input frame the last sample is held
        assert_abs_diff_eq!(output[2], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn downsample_48k_ramp() {
        let mut resampler = MonoResampler::new(AudioFormat::new(48_000, 1, 32), 16_000);
        let ramp: Vec<f32> = (0..96).map(|i| i as f32).collect();

        let output = resampler.process(&ramp, 96);

        assert_eq!(output.len(), 32);
        for (i, &sample) in output.iter().enumerate() {
            assert_abs_diff_eq!(sample, (i * 3) as f32, epsilon = 1e-4);
        }
    }

    #[test]
    fn frames_clamped_to_whole_frames_in_input() {
        let mut resampler = MonoResampler::new(AudioFormat::new(16_000, 2, 32), 16_000);
        // 3 samples = one whole stereo frame
        let output = resampler.process(&[1.0, 0.0, 0.5], 10);
        assert_eq!(output.len(), 1);
        assert_abs_diff_eq!(output[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn scratch_grows_but_never_shrinks() {
        let mut resampler = MonoResampler::new(AudioFormat::new(48_000, 2, 32), 16_000);
        let large = vec![0.0f32; 960 * 2];
        let small = vec![0.0f32; 48 * 2];

        resampler.process(&large, 960);
        assert_eq!(resampler.scratch_len(), (960, 320));

        let output_len = resampler.process(&small, 48).len();
        assert_eq!(output_len, 16);
        assert_eq!(resampler.scratch_len(), (960, 320));
    }

    #[test]
    fn empty_input_produces_empty_output() {
        let mut resampler = MonoResampler::new(AudioFormat::new(44_100, 2, 32), 16_000);
        assert!(resampler.process(&[], 0).is_empty());
    }

    #[test]
    fn rms_and_peak_levels() {
        assert_eq!(rms_level(&[0.0, 0.0, 0.0]), 0.0);
        assert_abs_diff_eq!(rms_level(&[1.0, 1.0, 1.0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(peak_level(&[0.1, -0.5, 0.3]), 0.5, epsilon = 1e-6);
        assert_eq!(rms_level(&[]), 0.0);
    }
}
