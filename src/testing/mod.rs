//! Testability harness utilities.
//!
//! Deterministic fixture waveforms shared by unit tests, integration tests
//! and the `ir_cli` harness binary.

pub mod fixtures;
