//! Namespaced key-value storage with TTL expiry over interchangeable backends.
//!
//! - `backend` - the backend contract plus the memory and session variants
//! - `sqlite` - the persistent variant
//! - `pipeline` - JSON / compression / encryption serialization stages
//! - `engine` - the `StorageEngine` callers use

mod backend;
mod engine;
mod pipeline;
mod sqlite;

pub use backend::{Backend, Driver, MemoryBackend, SessionBackend, SessionScope, StorageBackend};
pub use engine::{
  StorageEngine, StorageFailure, StorageItem, StorageObserver, StorageOp, StorageOptions,
};
pub use pipeline::{Pipeline, Transform};
pub use sqlite::SqliteBackend;
