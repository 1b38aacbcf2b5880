use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::processing::wav_format::{self, DATA_SIZE_OFFSET, RIFF_SIZE_OFFSET, WAV_HEADER_SIZE};
use crate::traits::frame_callback::FrameCallback;

/// Streaming 16-bit PCM WAV writer for delivered capture frames.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, sizes patched on finish]
/// [raw 16-bit little-endian PCM data...]
/// ```
///
/// Protect with `Mutex` for cross-thread access; see [`recording_callback`].
pub struct WavRecorder {
    file_path: PathBuf,
    format: AudioFormat,
    file: Option<BufWriter<File>>,
    data_bytes: u64,
    pcm: Vec<u8>,
}

impl WavRecorder {
    /// Create the file (and parent directories) and write a placeholder header.
    pub fn create(file_path: impl Into<PathBuf>, format: AudioFormat) -> Result<Self, CaptureError> {
        let file_path = file_path.into();
        if format.bits_per_sample != 16 || format.channels == 0 || format.sample_rate == 0 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported recording format: {} Hz, {} ch, {} bit",
                format.sample_rate, format.channels, format.bits_per_sample
            )));
        }

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::StorageError(format!("failed to create directory: {}", e)))?;
        }

        let file = File::create(&file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create file: {}", e)))?;
        let mut file = BufWriter::new(file);

        let header = wav_format::generate_wav_header(&format, 0);
        file.write_all(&header)
            .map_err(|e| CaptureError::StorageError(format!("failed to write header: {}", e)))?;

        log::debug!("Recording to {} ({} Hz, {} ch)", file_path.display(), format.sample_rate, format.channels);

        Ok(Self {
            file_path,
            format,
            file: Some(file),
            data_bytes: 0,
            pcm: Vec::new(),
        })
    }

    /// Append normalized samples, clamped to `[-1.0, 1.0]`.
    pub fn write_samples(&mut self, samples: &[f32]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;
        if samples.is_empty() {
            return Ok(());
        }

        self.pcm.clear();
        wav_format::extend_int16_pcm(samples, &mut self.pcm);
        file.write_all(&self.pcm)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.data_bytes += self.pcm.len() as u64;
        Ok(())
    }

    /// Finalize the file: patch the RIFF and data sizes, flush, and compute a SHA-256 checksum.
    pub fn finish(&mut self) -> Result<RecordingResult, CaptureError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;

        let data_size = u32::try_from(self.data_bytes).unwrap_or(u32::MAX);
        let riff_size = data_size.saturating_add(WAV_HEADER_SIZE as u32 - 8);

        patch_u32(&mut file, RIFF_SIZE_OFFSET, riff_size)?;
        patch_u32(&mut file, DATA_SIZE_OFFSET, data_size)?;
        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        drop(file);

        let checksum = sha256_file(&self.file_path)?;
        let frames = self.frames_written();
        let metadata = RecordingMetadata::new(self.format, frames, &self.file_path.to_string_lossy(), &checksum);

        log::info!(
            "Finished recording {} ({:.2}s, {} bytes)",
            self.file_path.display(),
            metadata.duration_secs,
            self.data_bytes
        );

        Ok(RecordingResult {
            file_path: self.file_path.clone(),
            duration_secs: metadata.duration_secs,
            metadata,
            checksum,
        })
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn frames_written(&self) -> u64 {
        self.data_bytes / self.format.block_align() as u64
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames_written() as f64 / self.format.sample_rate as f64
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Adapt a shared recorder into an engine frame callback.
///
/// Write failures are logged and the buffer is dropped; the capture thread
/// keeps running.
pub fn recording_callback(recorder: Arc<Mutex<WavRecorder>>) -> FrameCallback {
    Arc::new(move |samples: &[f32], _frames: usize| {
        if let Err(e) = recorder.lock().write_samples(samples) {
            log::error!("Failed to write audio data: {}", e);
        }
    })
}

fn patch_u32(file: &mut BufWriter<File>, offset: u64, value: u32) -> Result<(), CaptureError> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| CaptureError::StorageError(e.to_string()))?;
    file.write_all(&value.to_le_bytes())
        .map_err(|e| CaptureError::StorageError(e.to_string()))
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
