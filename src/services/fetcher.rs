//! Media acquisition seam for remote jobs.

use crate::error::{Result, ScribeqError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Resolves a media reference (URL, media ID) to a local audio file.
///
/// Failures map to `DownloadFailed`, which the worker treats as
/// transient and retries.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Test fetcher that materializes a placeholder file in `dest_dir`.
#[derive(Default)]
pub struct MockFetcher {
    fail_times: u32,
    calls: AtomicU32,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_times(mut self, n: u32) -> Self {
        self.fail_times = n;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<PathBuf> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err(ScribeqError::DownloadFailed {
                reference: reference.to_string(),
                message: "mock network failure".to_string(),
            });
        }
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join("downloaded.wav");
        std::fs::write(&path, b"mock audio")?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_mock_fetch_writes_file() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new();
        let path = fetcher
            .fetch("https://example.com/talk", dir.path())
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_fetch_transient_failures() {
        let dir = tempdir().unwrap();
        let fetcher = MockFetcher::new().failing_times(1);
        let err = fetcher.fetch("ref", dir.path()).await.unwrap_err();
        assert!(matches!(err, ScribeqError::DownloadFailed { .. }));
        assert!(err.is_transient());
        assert!(fetcher.fetch("ref", dir.path()).await.is_ok());
    }
}
