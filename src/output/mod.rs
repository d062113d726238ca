// src/output/mod.rs

//! Line-oriented output formatting for process stdout/stderr.

pub mod writer;

pub use writer::{OutputSink, OutputWriter};
