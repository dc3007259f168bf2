//! Error types for scribeq.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeqError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Fatal input errors, never retried
    #[error("Unreadable audio at {path}: {message}")]
    UnreadableAudio { path: String, message: String },

    // Transient external-capability errors, retried at the job level
    #[error("Transcription service unavailable: {message}")]
    TranscriptionUnavailable { message: String },

    #[error("Transcription timed out: {message}")]
    TranscriptionTimeout { message: String },

    #[error("Media download failed for {reference}: {message}")]
    DownloadFailed { reference: String, message: String },

    // Job-level failures
    #[error("Transcript is empty after processing {chunks} chunk(s)")]
    InsufficientResult { chunks: usize },

    #[error("Job queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    // Revision (correction/translation) errors
    #[error("Revision failed: {message}")]
    RevisionFailed { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl ScribeqError {
    /// True for failures worth retrying at the job level with backoff.
    ///
    /// Bad input (`UnreadableAudio`), an empty transcript
    /// (`InsufficientResult`), and configuration errors are not transient:
    /// re-running the job cannot change the outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScribeqError::TranscriptionUnavailable { .. }
                | ScribeqError::TranscriptionTimeout { .. }
                | ScribeqError::DownloadFailed { .. }
        )
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScribeqError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unreadable_audio_display() {
        let error = ScribeqError::UnreadableAudio {
            path: "/media/talk.wav".to_string(),
            message: "not a RIFF file".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unreadable audio at /media/talk.wav: not a RIFF file"
        );
    }

    #[test]
    fn test_transcription_unavailable_display() {
        let error = ScribeqError::TranscriptionUnavailable {
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription service unavailable: quota exceeded"
        );
    }

    #[test]
    fn test_download_failed_display() {
        let error = ScribeqError::DownloadFailed {
            reference: "https://example.com/v/42".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Media download failed for https://example.com/v/42: connection reset"
        );
    }

    #[test]
    fn test_insufficient_result_display() {
        let error = ScribeqError::InsufficientResult { chunks: 3 };
        assert_eq!(
            error.to_string(),
            "Transcript is empty after processing 3 chunk(s)"
        );
    }

    #[test]
    fn test_queue_full_display() {
        let error = ScribeqError::QueueFull { capacity: 150 };
        assert_eq!(error.to_string(), "Job queue is full (capacity 150)");
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = ScribeqError::ConfigInvalidValue {
            key: "segmenter.safety_margin".to_string(),
            message: "must be between 0 and 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for segmenter.safety_margin: must be between 0 and 1"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            ScribeqError::TranscriptionUnavailable {
                message: "401".into()
            }
            .is_transient()
        );
        assert!(
            ScribeqError::TranscriptionTimeout {
                message: "30s".into()
            }
            .is_transient()
        );
        assert!(
            ScribeqError::DownloadFailed {
                reference: "x".into(),
                message: "y".into()
            }
            .is_transient()
        );

        assert!(
            !ScribeqError::UnreadableAudio {
                path: "a".into(),
                message: "b".into()
            }
            .is_transient()
        );
        assert!(!ScribeqError::InsufficientResult { chunks: 1 }.is_transient());
        assert!(!ScribeqError::QueueFull { capacity: 1 }.is_transient());
        assert!(!ScribeqError::Other("boom".into()).is_transient());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: ScribeqError = io_error.into();
        assert!(error.to_string().contains("file not found"));
        assert!(!error.is_transient());
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: ScribeqError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ScribeqError>();
        assert_sync::<ScribeqError>();
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
