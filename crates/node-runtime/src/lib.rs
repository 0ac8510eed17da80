//! # Node Runtime Library
//!
//! Exposes the wiring module for the `main.rs` binary and for
//! integration tests in the workspace's `tests/` crate.

pub mod wiring;
