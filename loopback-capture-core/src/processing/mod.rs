pub mod mono_resampler;
pub mod wav_format;
