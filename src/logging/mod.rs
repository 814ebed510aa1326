//! Event journal written alongside the tracing output.

mod jsonl;

pub use jsonl::JsonlLogger;
