//! Persistence boundary for analysis results.
//!
//! This crate provides:
//! - The `AnalysisSink` contract (append-only, plus latest/history reads)
//! - `JsonlSink`, an append-only JSON-lines file
//! - `MemorySink`, a bounded in-process sink
//! - `FrameArchive`, which writes analysed frames as JPEG files

pub mod archive;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod sink;

pub use archive::FrameArchive;
pub use error::{StorageError, StorageResult};
pub use jsonl::JsonlSink;
pub use memory::MemorySink;
pub use sink::AnalysisSink;
