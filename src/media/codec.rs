//! Audio codec seam used by the segmenter for probing and trial encoding.

use crate::error::{Result, ScribeqError};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Basic facts about an audio file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioInfo {
    /// Total duration in seconds.
    pub duration_secs: f64,
    /// On-disk size in bytes.
    pub size_bytes: u64,
}

/// Trait for probing audio files and exporting time spans of them.
///
/// This is the seam the segmenter's trial-encoding loop runs through,
/// allowing tests to substitute a mock with a synthetic bitrate.
pub trait AudioCodec: Send + Sync {
    /// Read duration and size of the file at `path`.
    ///
    /// Fails with `UnreadableAudio` if the file cannot be decoded.
    fn probe(&self, path: &Path) -> Result<AudioInfo>;

    /// Re-encode the span `[start_secs, start_secs + duration_secs)` of
    /// `src` into `dest`, returning the exported byte size.
    fn export_span(
        &self,
        src: &Path,
        dest: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<u64>;
}

/// WAV codec backed by hound.
pub struct WavCodec;

impl WavCodec {
    fn open(path: &Path) -> Result<WavReader<std::io::BufReader<std::fs::File>>> {
        WavReader::open(path).map_err(|e| ScribeqError::UnreadableAudio {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl AudioCodec for WavCodec {
    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        let reader = Self::open(path)?;
        let spec = reader.spec();
        let frames = reader.duration();
        let size_bytes = std::fs::metadata(path)?.len();
        Ok(AudioInfo {
            duration_secs: frames as f64 / spec.sample_rate as f64,
            size_bytes,
        })
    }

    fn export_span(
        &self,
        src: &Path,
        dest: &Path,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<u64> {
        let mut reader = Self::open(src)?;
        let spec = reader.spec();
        let total_frames = reader.duration();

        let start_frame = ((start_secs * spec.sample_rate as f64).round() as u32).min(total_frames);
        let span_frames = ((duration_secs * spec.sample_rate as f64).round() as u32)
            .min(total_frames - start_frame);

        reader
            .seek(start_frame)
            .map_err(|e| ScribeqError::UnreadableAudio {
                path: src.display().to_string(),
                message: format!("seek to frame {start_frame} failed: {e}"),
            })?;

        let mut writer =
            WavWriter::create(dest, spec).map_err(|e| write_error(dest, &e.to_string()))?;

        let samples = span_frames as usize * spec.channels as usize;
        match spec.sample_format {
            SampleFormat::Int => {
                for sample in reader.samples::<i32>().take(samples) {
                    let sample = sample.map_err(|e| ScribeqError::UnreadableAudio {
                        path: src.display().to_string(),
                        message: e.to_string(),
                    })?;
                    writer
                        .write_sample(sample)
                        .map_err(|e| write_error(dest, &e.to_string()))?;
                }
            }
            SampleFormat::Float => {
                for sample in reader.samples::<f32>().take(samples) {
                    let sample = sample.map_err(|e| ScribeqError::UnreadableAudio {
                        path: src.display().to_string(),
                        message: e.to_string(),
                    })?;
                    writer
                        .write_sample(sample)
                        .map_err(|e| write_error(dest, &e.to_string()))?;
                }
            }
        }

        writer
            .finalize()
            .map_err(|e| write_error(dest, &e.to_string()))?;
        Ok(std::fs::metadata(dest)?.len())
    }
}

fn write_error(dest: &Path, message: &str) -> ScribeqError {
    ScribeqError::Other(format!(
        "failed to write chunk {}: {message}",
        dest.display()
    ))
}

/// Mock codec for testing the segmenter without real audio files.
///
/// Reports a fixed duration/size and exports spans at a synthetic bitrate.
/// `export_span` writes `dest` so cleanup paths behave like the real codec.
#[derive(Clone)]
pub struct MockCodec {
    duration_secs: f64,
    size_bytes: u64,
    /// Bytes per second used for exported spans; defaults to size/duration.
    export_bytes_per_sec: f64,
    /// Fixed per-file overhead added to every export (header bytes).
    export_overhead: u64,
    fail_probe: bool,
    exports: Arc<AtomicU32>,
}

impl MockCodec {
    pub fn new(duration_secs: f64, size_bytes: u64) -> Self {
        let export_bytes_per_sec = if duration_secs > 0.0 {
            size_bytes as f64 / duration_secs
        } else {
            0.0
        };
        Self {
            duration_secs,
            size_bytes,
            export_bytes_per_sec,
            export_overhead: 0,
            fail_probe: false,
            exports: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Override the bitrate used for exported spans, decoupling it from the
    /// probed size/duration ratio (simulates re-encoding overhead or VBR).
    pub fn with_export_rate(mut self, bytes_per_sec: f64) -> Self {
        self.export_bytes_per_sec = bytes_per_sec;
        self
    }

    pub fn with_export_overhead(mut self, bytes: u64) -> Self {
        self.export_overhead = bytes;
        self
    }

    pub fn with_probe_failure(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    /// Number of export calls made so far.
    pub fn export_count(&self) -> u32 {
        self.exports.load(Ordering::Relaxed)
    }
}

impl AudioCodec for MockCodec {
    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        if self.fail_probe {
            return Err(ScribeqError::UnreadableAudio {
                path: path.display().to_string(),
                message: "mock decode failure".to_string(),
            });
        }
        Ok(AudioInfo {
            duration_secs: self.duration_secs,
            size_bytes: self.size_bytes,
        })
    }

    fn export_span(
        &self,
        _src: &Path,
        dest: &Path,
        _start_secs: f64,
        duration_secs: f64,
    ) -> Result<u64> {
        self.exports.fetch_add(1, Ordering::Relaxed);
        std::fs::write(dest, b"mock chunk")?;
        Ok(self.export_overhead + (duration_secs * self.export_bytes_per_sec).round() as u64)
    }
}
