//! Core types and traits for the Shrink URL shortener.
//!
//! This crate provides the data model, the storage contract every backend
//! implements and the shortener trait consumed by transport layers.

pub mod error;
pub mod shortened_url;
pub mod shortener;
pub mod slug;
pub mod storage;
pub mod url;

pub use error::{CoreError, ShortenerError, StorageError};
pub use shortened_url::{ShortenedUrl, Stat};
pub use shortener::Shortener;
pub use slug::Slug;
pub use storage::{ReadStorage, Storage};
pub use url::Url;
