//! Per-job processing pipeline: chunk transcription and the stage
//! orchestrator that the worker pool drives.

pub mod chunk_processor;
pub mod orchestrator;

pub use chunk_processor::ChunkProcessor;
pub use orchestrator::PipelineOrchestrator;
