//! # Proof-Request Lifecycle Engine — Integration Test Suite
//!
//! Exercises the lifecycle across component boundaries: the signing,
//! payment, and proving rendezvous sharing only a `KvStore`, the way
//! `node-runtime` actually wires them. Unit tests for a single
//! component's own closed error set live beside that component; this
//! crate is for behavior that only shows up once several components
//! are composed.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p proofport-tests
//! ```

#![allow(dead_code)]

pub mod integration;
