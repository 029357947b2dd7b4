//! Client-side data access for the fleet maintenance tracker.
//!
//! - [`storage`] - namespaced key-value storage with TTL expiry over
//!   memory, session or SQLite backends
//! - [`http`] - HTTP client that caches responses in that storage and
//!   retries failed calls
//! - [`clock`] - time source shared by both

pub mod clock;
pub mod config;
pub mod http;
pub mod logging;
pub mod storage;
