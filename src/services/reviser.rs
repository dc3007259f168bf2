//! Revision seam: post-transcription text rewriting (translation or
//! cleanup), applied segment by segment so timestamps stay attached.

use crate::error::{Result, ScribeqError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

#[async_trait]
pub trait Reviser: Send + Sync {
    /// Rewrite `text` into `target_language`. The caller decides what to
    /// do with a failure; this crate keeps the original text and records
    /// a warning on the job rather than dropping the segment.
    async fn revise(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Test reviser that tags each segment with the target language.
#[derive(Default)]
pub struct MockReviser {
    fail_always: bool,
    calls: AtomicU32,
}

impl MockReviser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_always: true,
            calls: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reviser for MockReviser {
    async fn revise(&self, text: &str, target_language: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_always {
            return Err(ScribeqError::RevisionFailed {
                message: "mock reviser offline".to_string(),
            });
        }
        Ok(format!("[{target_language}] {text}"))
    }
}
