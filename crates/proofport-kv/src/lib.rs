//! # Key-Value Store Adapter (C1)
//!
//! The foundation every other lifecycle component is built on: strings
//! with TTL, atomic counters, lists, sets, and pub/sub, behind a single
//! `KvStore` trait.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `ports/` — the `KvStore` outbound port every component depends on
//! - `adapters/` — `RedisKvStore` (production) and `InMemoryKvStore` (tests)
//! - `domain/` — `StoreError`

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryKvStore, RedisKvStore};
pub use domain::StoreError;
pub use ports::outbound::{KvMessage, KvStore, KvSubscription};
