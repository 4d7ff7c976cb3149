//! Diagnostics for the analysis pipeline.
//!
//! Tracing is opt-in and never changes analysis results.

pub mod pipeline_tracer;
