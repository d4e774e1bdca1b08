//! Storage backends for shortened URLs.
//!
//! Three interchangeable implementations of [`Storage`]: an in-memory map,
//! an append-only binary log file and a Postgres table. Pick one at startup
//! and inject it into the shortening service.

pub mod file;
pub mod memory;
pub mod postgres;
mod pool;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use shrink_core::error::Result;
pub use shrink_core::{ReadStorage, ShortenedUrl, Stat, Storage, StorageError};
