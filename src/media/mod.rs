//! Audio probing, trial encoding, and size-bounded segmentation.

pub mod codec;
pub mod segmenter;

pub use codec::{AudioCodec, AudioInfo, MockCodec, WavCodec};
pub use segmenter::{AudioChunk, Segmenter, cleanup_chunks};
