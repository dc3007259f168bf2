use crate::defaults;
use crate::error::{Result, ScribeqError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
    pub segmenter: SegmenterConfig,
    pub output: OutputConfig,
}

/// Job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued jobs before `enqueue` rejects.
    pub capacity: usize,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Concurrency permits: how many jobs may execute at once.
    pub max_concurrent_jobs: usize,
    /// Retry budget per job for transient failures.
    pub max_retries: u32,
    /// Concurrent chunk transcriptions within one job.
    pub chunk_concurrency: usize,
    /// Queue poll timeout so the dequeue loop observes shutdown, in ms.
    pub dequeue_poll_ms: u64,
}

/// Audio segmenter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Byte ceiling for each exported chunk.
    pub max_chunk_bytes: u64,
    /// Fraction of the ceiling targeted by the first trial encode.
    pub safety_margin: f64,
    /// Greedy extension step in seconds.
    pub extension_step_secs: f64,
    /// Minimum chunk duration in seconds (remainder-merge threshold).
    pub min_chunk_secs: f64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory for transcript output.
    pub base_dir: PathBuf,
    /// Keep downloaded/intermediate audio after the job completes.
    pub keep_audio: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::QUEUE_CAPACITY,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: defaults::MAX_CONCURRENT_JOBS,
            max_retries: defaults::MAX_RETRIES,
            chunk_concurrency: defaults::CHUNK_CONCURRENCY,
            dequeue_poll_ms: defaults::DEQUEUE_POLL_MS,
        }
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: defaults::MAX_CHUNK_BYTES,
            safety_margin: defaults::SIZE_SAFETY_MARGIN,
            extension_step_secs: defaults::EXTENSION_STEP_SECS,
            min_chunk_secs: defaults::MIN_CHUNK_SECS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scribeq")
                .join("result"),
            keep_audio: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SCRIBEQ_OUTPUT_DIR → output.base_dir
    /// - SCRIBEQ_MAX_CHUNK_BYTES → segmenter.max_chunk_bytes
    /// - SCRIBEQ_MAX_CONCURRENT_JOBS → worker.max_concurrent_jobs
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SCRIBEQ_OUTPUT_DIR")
            && !dir.is_empty()
        {
            self.output.base_dir = PathBuf::from(dir);
        }

        if let Ok(bytes) = std::env::var("SCRIBEQ_MAX_CHUNK_BYTES")
            && let Ok(bytes) = bytes.parse::<u64>()
        {
            self.segmenter.max_chunk_bytes = bytes;
        }

        if let Ok(jobs) = std::env::var("SCRIBEQ_MAX_CONCURRENT_JOBS")
            && let Ok(jobs) = jobs.parse::<usize>()
        {
            self.worker.max_concurrent_jobs = jobs;
        }

        self
    }

    /// Validate the configuration, failing fast before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "queue.capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.worker.max_concurrent_jobs == 0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "worker.max_concurrent_jobs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.worker.chunk_concurrency == 0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "worker.chunk_concurrency".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.segmenter.max_chunk_bytes == 0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "segmenter.max_chunk_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(self.segmenter.safety_margin > 0.0 && self.segmenter.safety_margin <= 1.0) {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "segmenter.safety_margin".to_string(),
                message: "must be in (0, 1]".to_string(),
            });
        }
        if self.segmenter.extension_step_secs <= 0.0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "segmenter.extension_step_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.segmenter.min_chunk_secs < 0.0 {
            return Err(ScribeqError::ConfigInvalidValue {
                key: "segmenter.min_chunk_secs".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/scribeq/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scribeq")
            .join("config.toml")
    }
}
