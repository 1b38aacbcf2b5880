//! WAV file format utilities.
//!
//! Generates standard 44-byte RIFF WAV headers and converts normalized
//! float samples into 16-bit PCM for storage.

use crate::models::audio_models::AudioFormat;

/// Bytes in the canonical RIFF/WAVE header written before PCM data.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

const FMT_CHUNK_SIZE: u32 = 16;
const FORMAT_CODE_PCM: u16 = 1;

/// Build the canonical header for integer PCM at `format`.
///
/// `data_size` is the byte length of the data chunk; the RIFF size field
/// covers everything after itself (`36 + data_size`).
pub fn generate_wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&data_size.saturating_add(36).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_CODE_PCM.to_le_bytes());
    bytes.extend_from_slice(&format.channels.to_le_bytes());
    bytes.extend_from_slice(&format.sample_rate.to_le_bytes());
    bytes.extend_from_slice(&format.byte_rate().to_le_bytes());
    bytes.extend_from_slice(&format.block_align().to_le_bytes());
    bytes.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());

    let mut header = [0u8; WAV_HEADER_SIZE];
    header.copy_from_slice(&bytes);
    header
}

/// Convert f32 samples `[-1.0, 1.0]` to 16-bit PCM (little-endian bytes), appending to `out`.
///
/// Clamps out-of-range values. Appends `samples.len() * 2` bytes.
pub fn extend_int16_pcm(samples: &[f32], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}
