//! Decoding of shared-mode mix-format samples into normalized f32.
//!
//! Shared-mode endpoints almost always mix in 32-bit float. Integer PCM mix
//! formats are converted so the engine always sees `[-1.0, 1.0]` floats.

use loopback_capture_core::CaptureError;

/// WAVE_FORMAT_PCM constant (1)
pub const WAVE_FORMAT_PCM: u16 = 1;

/// WAVE_FORMAT_IEEE_FLOAT constant (3)
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 3;

/// WAVE_FORMAT_EXTENSIBLE constant (0xFFFE)
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Sample encoding of the endpoint's capture buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Float32,
    Int16,
    /// 32-bit container; 24-bit valid samples are left-aligned and decode the same way.
    Int32,
}

impl SampleEncoding {
    /// Pick the encoding for a mix format.
    ///
    /// `format_tag` is the plain format tag, or for `WAVE_FORMAT_EXTENSIBLE`
    /// the tag carried by its SubFormat GUID. `container_bits` is
    /// `wBitsPerSample`.
    pub fn from_format(format_tag: u16, container_bits: u16) -> Result<Self, CaptureError> {
        match (format_tag, container_bits) {
            (WAVE_FORMAT_IEEE_FLOAT, 32) => Ok(Self::Float32),
            (WAVE_FORMAT_PCM, 16) => Ok(Self::Int16),
            (WAVE_FORMAT_PCM, 32) => Ok(Self::Int32),
            _ => Err(CaptureError::InitializationFailed(format!(
                "unsupported mix format: tag {:#06x}, {} bit",
                format_tag, container_bits
            ))),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Float32 | Self::Int32 => 4,
        }
    }

    /// Decode little-endian `bytes` into `out`, replacing its contents.
    ///
    /// `out` keeps its capacity between calls.
    pub fn decode_into(self, bytes: &[u8], out: &mut Vec<f32>) {
        out.clear();
        match self {
            Self::Float32 => out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            ),
            Self::Int16 => out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32_768.0),
            ),
            Self::Int32 => out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|b| (i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64 / 2_147_483_648.0) as f32),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_encodings() {
        assert_eq!(SampleEncoding::from_format(WAVE_FORMAT_IEEE_FLOAT, 32), Ok(SampleEncoding::Float32));
        assert_eq!(SampleEncoding::from_format(WAVE_FORMAT_PCM, 16), Ok(SampleEncoding::Int16));
        assert_eq!(SampleEncoding::from_format(WAVE_FORMAT_PCM, 32), Ok(SampleEncoding::Int32));
    }

    #[test]
    fn rejects_other_encodings() {
        for (tag, bits) in [(WAVE_FORMAT_PCM, 8), (WAVE_FORMAT_PCM, 24), (WAVE_FORMAT_IEEE_FLOAT, 64), (0, 32)] {
            assert!(matches!(
                SampleEncoding::from_format(tag, bits),
                Err(CaptureError::InitializationFailed(_))
            ));
        }
    }

    #[test]
    fn float_samples_pass_through() {
        let bytes: Vec<u8> = [0.25f32, -1.0].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut out = Vec::new();
        SampleEncoding::Float32.decode_into(&bytes, &mut out);
        assert_eq!(out, vec![0.25, -1.0]);
    }

    #[test]
    fn int16_is_normalized() {
        let bytes: Vec<u8> = [i16::MIN, 0, 16_384].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut out = vec![9.0; 8];
        SampleEncoding::Int16.decode_into(&bytes, &mut out);
        assert_eq!(out, vec![-1.0, 0.0, 0.5]);
    }

    #[test]
    fn int32_is_normalized() {
        let bytes: Vec<u8> = [i32::MIN, 1 << 30].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut out = Vec::new();
        SampleEncoding::Int32.decode_into(&bytes, &mut out);
        assert_eq!(out, vec![-1.0, 0.5]);
        assert_eq!(SampleEncoding::Int32.bytes_per_sample(), 4);
    }
}
