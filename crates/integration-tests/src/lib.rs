//! Cross-crate integration tests for the drover workspace.
//!
//! The tests live in `tests/`; each file wires the real SQLite store to the
//! core services with mock time, rate-gate, and handler ports.
