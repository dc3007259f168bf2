//! Size-bounded audio segmentation.
//!
//! Splits one audio file into chunks that each fit under a byte ceiling,
//! using bitrate estimation followed by trial encoding. This is heuristic
//! bin packing: the contract is "every chunk fits", not "fewest possible
//! chunks", though the greedy extension step biases toward fewer chunks.

use crate::config::SegmenterConfig;
use crate::error::{Result, ScribeqError};
use crate::media::codec::AudioCodec;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const EPS: f64 = 1e-6;

/// A contiguous slice of the source audio, sized to fit the upload ceiling.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// 1-based chunk index.
    pub index: usize,
    /// Total chunk count for the source.
    pub total: usize,
    /// Where the exported chunk lives on disk.
    pub path: PathBuf,
    /// Start offset in the source timeline, seconds.
    pub start_offset: f64,
    /// Chunk duration in seconds.
    pub duration: f64,
    /// Exported byte size.
    pub size_bytes: u64,
    /// True when the file was created by the segmenter and should be
    /// deleted once its transcription has been consumed. The single-chunk
    /// fast path points at the source file itself, which must survive.
    pub temporary: bool,
}

impl AudioChunk {
    /// Delete the chunk file if the segmenter created it.
    pub fn cleanup(&self) -> bool {
        if !self.temporary {
            return false;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!("failed to remove chunk {}: {e}", self.path.display());
                false
            }
        }
    }
}

/// Remove all temporary chunk files, returning how many were deleted.
pub fn cleanup_chunks(chunks: &[AudioChunk]) -> usize {
    let cleaned = chunks.iter().filter(|c| c.cleanup()).count();
    debug!("cleaned up {cleaned}/{} chunk file(s)", chunks.len());
    cleaned
}

struct ChunkSpec {
    path: PathBuf,
    start: f64,
    duration: f64,
    size_bytes: u64,
}

/// Splits audio files into byte-size-constrained chunks.
pub struct Segmenter {
    codec: Arc<dyn AudioCodec>,
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(codec: Arc<dyn AudioCodec>, config: SegmenterConfig) -> Self {
        Self { codec, config }
    }

    /// Split `audio_path` into chunks whose exported size is <= `max_bytes`.
    ///
    /// Chunks come back in strictly increasing, contiguous time order and
    /// together cover the whole source. A trailing remainder shorter than
    /// the configured minimum is merged into the previous chunk when that
    /// still fits the ceiling, and emitted as a short final chunk otherwise.
    pub fn split(&self, audio_path: &Path, max_bytes: u64) -> Result<Vec<AudioChunk>> {
        let info = self.codec.probe(audio_path)?;

        if info.size_bytes <= max_bytes {
            debug!(
                "{} fits under {max_bytes} bytes, no split needed",
                audio_path.display()
            );
            return Ok(vec![AudioChunk {
                index: 1,
                total: 1,
                path: audio_path.to_path_buf(),
                start_offset: 0.0,
                duration: info.duration_secs,
                size_bytes: info.size_bytes,
                temporary: false,
            }]);
        }

        if info.duration_secs <= 0.0 {
            return Err(ScribeqError::UnreadableAudio {
                path: audio_path.display().to_string(),
                message: "reported zero duration".to_string(),
            });
        }

        // Estimate a chunk duration that should land at ~90% of the ceiling.
        let bytes_per_sec = info.size_bytes as f64 / info.duration_secs;
        let target_secs = (max_bytes as f64 * self.config.safety_margin) / bytes_per_sec;
        debug!(
            "splitting {}: {:.1}s at {:.0} B/s, target chunk {:.1}s",
            audio_path.display(),
            info.duration_secs,
            bytes_per_sec,
            target_secs
        );

        let dir = audio_path.parent().unwrap_or_else(|| Path::new("."));
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut specs: Vec<ChunkSpec> = Vec::new();
        let mut cursor = 0.0f64;

        while cursor + EPS < info.duration_secs {
            let remaining = info.duration_secs - cursor;

            // Trailing remainder below the minimum: fold it into the
            // previous chunk unless that would overshoot the ceiling.
            if remaining + EPS < self.config.min_chunk_secs
                && let Some(previous) = specs.last()
            {
                let prev_path = previous.path.clone();
                let prev_start = previous.start;
                let prev_duration = previous.duration;
                let merged_duration = prev_duration + remaining;
                let merged_size = self.export_or_cleanup(
                    audio_path,
                    &prev_path,
                    prev_start,
                    merged_duration,
                    &specs,
                )?;
                if merged_size <= max_bytes {
                    debug!(
                        "merged {:.1}s remainder into chunk at {:.1}s",
                        remaining, prev_start
                    );
                    if let Some(previous) = specs.last_mut() {
                        previous.duration = merged_duration;
                        previous.size_bytes = merged_size;
                    }
                    cursor = info.duration_secs;
                    continue;
                }
                // Merge overshoots: restore the previous chunk and emit the
                // remainder as a short final chunk.
                let restored_size = self.export_or_cleanup(
                    audio_path,
                    &prev_path,
                    prev_start,
                    prev_duration,
                    &specs,
                )?;
                if let Some(previous) = specs.last_mut() {
                    previous.size_bytes = restored_size;
                }
            }

            let chunk_path = dir.join(format!("{stem}_chunk_{:03}.wav", specs.len() + 1));
            let is_final_remainder = remaining + EPS < self.config.min_chunk_secs;
            let mut duration = target_secs.max(self.config.min_chunk_secs).min(remaining);
            let mut size = self
                .export_or_cleanup(audio_path, &chunk_path, cursor, duration, &specs)?;

            // Overshoot: halve and retry until the trial fits. Going below
            // the minimum duration is only allowed for the final remainder.
            while size > max_bytes {
                duration /= 2.0;
                let below_min = duration + EPS < self.config.min_chunk_secs;
                if duration < 0.1 || (below_min && !is_final_remainder) {
                    self.discard(&specs, Some(&chunk_path));
                    return Err(ScribeqError::Other(format!(
                        "cannot split {}: no chunk of at least {:.0}s fits under {max_bytes} bytes",
                        audio_path.display(),
                        self.config.min_chunk_secs
                    )));
                }
                size = self.export_or_cleanup(audio_path, &chunk_path, cursor, duration, &specs)?;
            }

            // Greedily extend in fixed steps while the re-encoded chunk
            // still fits. Extension never swallows the tail outright;
            // a short tail is handled by the remainder merge above.
            loop {
                let extended = duration + self.config.extension_step_secs;
                if extended + EPS >= remaining {
                    break;
                }
                let trial =
                    self.export_or_cleanup(audio_path, &chunk_path, cursor, extended, &specs)?;
                if trial <= max_bytes {
                    duration = extended;
                    size = trial;
                } else {
                    // Re-export at the accepted duration; the file currently
                    // holds the rejected trial.
                    size = self
                        .export_or_cleanup(audio_path, &chunk_path, cursor, duration, &specs)?;
                    break;
                }
            }

            specs.push(ChunkSpec {
                path: chunk_path,
                start: cursor,
                duration,
                size_bytes: size,
            });
            cursor += duration;
        }

        if specs.is_empty() {
            return Err(ScribeqError::Other(format!(
                "splitting {} produced no chunks",
                audio_path.display()
            )));
        }

        let total = specs.len();
        let chunks: Vec<AudioChunk> = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| AudioChunk {
                index: i + 1,
                total,
                path: spec.path,
                start_offset: spec.start,
                duration: spec.duration,
                size_bytes: spec.size_bytes,
                temporary: true,
            })
            .collect();

        info!(
            "split {} into {total} chunk(s) covering {:.1}s",
            audio_path.display(),
            info.duration_secs
        );
        Ok(chunks)
    }

    fn export_or_cleanup(
        &self,
        src: &Path,
        dest: &Path,
        start: f64,
        duration: f64,
        emitted: &[ChunkSpec],
    ) -> Result<u64> {
        self.codec
            .export_span(src, dest, start, duration)
            .inspect_err(|_| self.discard(emitted, Some(dest)))
    }

    /// Best-effort removal of chunk files after a failed split.
    fn discard(&self, emitted: &[ChunkSpec], in_flight: Option<&Path>) {
        for spec in emitted {
            if let Err(e) = std::fs::remove_file(&spec.path) {
                warn!("failed to remove chunk {}: {e}", spec.path.display());
            }
        }
        if let Some(path) = in_flight
            && path.exists()
            && let Err(e) = std::fs::remove_file(path)
        {
            warn!("failed to remove chunk {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::codec::{AudioInfo, MockCodec};
    use tempfile::tempdir;

    fn config() -> SegmenterConfig {
        SegmenterConfig::default()
    }

    fn config_with_min(min_chunk_secs: f64) -> SegmenterConfig {
        SegmenterConfig {
            min_chunk_secs,
            ..SegmenterConfig::default()
        }
    }

    fn split_with(
        codec: MockCodec,
        config: SegmenterConfig,
        max_bytes: u64,
    ) -> Result<Vec<AudioChunk>> {
        let dir = tempdir().unwrap();
        let src = dir.path().join("talk.wav");
        std::fs::write(&src, b"source").unwrap();
        let segmenter = Segmenter::new(Arc::new(codec), config);
        segmenter.split(&src, max_bytes)
    }

    fn assert_contiguous(chunks: &[AudioChunk], total_duration: f64) {
        let mut cursor = 0.0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i + 1, "chunk index must be 1-based");
            assert_eq!(chunk.total, chunks.len());
            assert!(
                (chunk.start_offset - cursor).abs() < 1e-6,
                "chunk {} starts at {} but cursor is {}",
                chunk.index,
                chunk.start_offset,
                cursor
            );
            cursor += chunk.duration;
        }
        assert!(
            (cursor - total_duration).abs() < 1e-6,
            "chunks cover {cursor}s of a {total_duration}s source"
        );
    }

    #[test]
    fn test_small_file_returns_single_chunk() {
        let chunks = split_with(MockCodec::new(120.0, 1000), config(), 2000).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_offset, 0.0);
        assert_eq!(chunks[0].duration, 120.0);
        assert!(!chunks[0].temporary, "single chunk must reuse the source");
    }

    #[test]
    fn test_split_chunks_fit_ceiling_and_cover_source() {
        // 600s at 100 B/s = 60000 bytes against a 10000-byte ceiling.
        let max_bytes = 10_000;
        let chunks = split_with(MockCodec::new(600.0, 60_000), config(), max_bytes).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.size_bytes <= max_bytes,
                "chunk {} is {} bytes, ceiling {max_bytes}",
                chunk.index,
                chunk.size_bytes
            );
            assert!(chunk.temporary);
        }
        assert_contiguous(&chunks, 600.0);
    }

    #[test]
    fn test_scenario_130s_three_chunks() {
        // Ceiling chosen so the estimated chunk duration is ~60s: the 10s
        // remainder cannot merge without overshooting, so it stays as a
        // short final chunk at offset 120.
        let codec = MockCodec::new(130.0, 13_000);
        let config = SegmenterConfig {
            safety_margin: 0.9,
            extension_step_secs: 60.0,
            min_chunk_secs: 30.0,
            ..SegmenterConfig::default()
        };
        // 100 B/s; ceiling 6667 → target ≈ 60s.
        let chunks = split_with(codec, config, 6_667).unwrap();

        assert_eq!(chunks.len(), 3);
        let offsets: Vec<f64> = chunks.iter().map(|c| c.start_offset).collect();
        assert!((offsets[0] - 0.0).abs() < 1.0);
        assert!((offsets[1] - 60.0).abs() < 1.0);
        assert!((offsets[2] - 120.0).abs() < 1.0);
        for pair in offsets.windows(2) {
            assert!(pair[1] > pair[0], "offsets must be strictly increasing");
        }
        let last = chunks.last().unwrap();
        assert!((last.start_offset + last.duration - 130.0).abs() < 1e-6);
    }

    #[test]
    fn test_remainder_merges_into_previous_chunk() {
        // 130s at 100 B/s, ceiling 7100 → target ≈ 63.9s. Two chunks of
        // 63.9s leave a 2.2s remainder; merging it into the second chunk
        // gives 66.1s = 6610 bytes, under the ceiling.
        let codec = MockCodec::new(130.0, 13_000);
        let chunks = split_with(codec, config_with_min(30.0), 7_100).unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].duration > chunks[0].duration, "tail merges into the last chunk");
        for chunk in &chunks {
            assert!(chunk.size_bytes <= 7_100);
        }
        assert_contiguous(&chunks, 130.0);
    }

    #[test]
    fn test_greedy_extension_reduces_chunk_count() {
        // Export rate is half the probed rate, so the initial estimate is
        // pessimistic and extension should stretch chunks toward the ceiling.
        let codec = MockCodec::new(1200.0, 240_000).with_export_rate(100.0);
        let chunks = split_with(codec, config(), 30_000).unwrap();

        // Naive estimation from the probed 200 B/s gives 135s chunks; two
        // 60s extensions stretch the first chunks to 255s.
        assert!(
            chunks[0].duration > 200.0,
            "extension should grow chunks past the pessimistic estimate: {:?}",
            chunks.iter().map(|c| c.duration).collect::<Vec<_>>()
        );
        assert!(chunks.len() <= 6, "expected at most 6 chunks, got {}", chunks.len());
        assert_contiguous(&chunks, 1200.0);
    }

    #[test]
    fn test_overshoot_halving() {
        // Export rate is double the probed rate: every first trial
        // overshoots and must halve at least once.
        let codec = MockCodec::new(600.0, 60_000).with_export_rate(200.0);
        let chunks = split_with(codec, config_with_min(10.0), 10_000).unwrap();

        for chunk in &chunks {
            assert!(chunk.size_bytes <= 10_000);
        }
        assert_contiguous(&chunks, 600.0);
    }

    #[test]
    fn test_unreadable_audio_propagates() {
        let err = split_with(MockCodec::new(0.0, 0).with_probe_failure(), config(), 100)
            .unwrap_err();
        assert!(matches!(err, ScribeqError::UnreadableAudio { .. }));
    }

    #[test]
    fn test_no_chunk_satisfies_minimum_fails() {
        // 300s source so dense that even a 30s chunk overshoots the ceiling.
        let codec = MockCodec::new(300.0, 3_000_000).with_export_rate(10_000.0);
        let config = config_with_min(30.0);
        let err = split_with(codec, config, 100_000).unwrap_err();
        assert!(err.to_string().contains("no chunk"), "got: {err}");
    }

    #[test]
    fn test_failed_split_leaves_no_chunk_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("talk.wav");
        std::fs::write(&src, b"source").unwrap();

        let codec = MockCodec::new(300.0, 3_000_000).with_export_rate(10_000.0);
        let segmenter = Segmenter::new(Arc::new(codec), config_with_min(30.0));
        assert!(segmenter.split(&src, 100_000).is_err());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("_chunk_"))
            .collect();
        assert!(leftovers.is_empty(), "chunk files left behind: {leftovers:?}");
    }

    #[test]
    fn test_merge_export_failure_removes_emitted_chunks() {
        // Fails only the remainder-merge re-export, which is the one
        // export that starts mid-file with a widened duration. The two
        // chunks already on disk must be cleaned up before the error
        // propagates.
        struct MergeFailCodec;

        impl AudioCodec for MergeFailCodec {
            fn probe(&self, _path: &Path) -> Result<AudioInfo> {
                Ok(AudioInfo {
                    duration_secs: 130.0,
                    size_bytes: 13_000,
                })
            }

            fn export_span(
                &self,
                _src: &Path,
                dest: &Path,
                start: f64,
                duration: f64,
            ) -> Result<u64> {
                if start > 1.0 && duration > 65.0 {
                    return Err(ScribeqError::Other("disk full".to_string()));
                }
                std::fs::write(dest, b"mock chunk")?;
                Ok((duration * 100.0).round() as u64)
            }
        }

        let dir = tempdir().unwrap();
        let src = dir.path().join("talk.wav");
        std::fs::write(&src, b"source").unwrap();

        // Ceiling 6667 → two ~60s chunks and a ~10s remainder whose
        // merge export is the failing call.
        let segmenter = Segmenter::new(Arc::new(MergeFailCodec), config_with_min(30.0));
        let err = segmenter.split(&src, 6_667).unwrap_err();
        assert!(err.to_string().contains("disk full"), "got: {err}");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("_chunk_"))
            .collect();
        assert!(leftovers.is_empty(), "chunk files left behind: {leftovers:?}");
    }

    #[test]
    fn test_cleanup_chunks_removes_temporary_files_only() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.wav");
        let temp = dir.path().join("source_chunk_001.wav");
        std::fs::write(&source, b"src").unwrap();
        std::fs::write(&temp, b"chunk").unwrap();

        let chunks = vec![
            AudioChunk {
                index: 1,
                total: 2,
                path: source.clone(),
                start_offset: 0.0,
                duration: 10.0,
                size_bytes: 3,
                temporary: false,
            },
            AudioChunk {
                index: 2,
                total: 2,
                path: temp.clone(),
                start_offset: 10.0,
                duration: 10.0,
                size_bytes: 5,
                temporary: true,
            },
        ];

        assert_eq!(cleanup_chunks(&chunks), 1);
        assert!(source.exists(), "source file must not be deleted");
        assert!(!temp.exists(), "temporary chunk must be deleted");
    }
}
