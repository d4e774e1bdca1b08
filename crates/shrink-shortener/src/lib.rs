//! URL shortening service.
//!
//! [`ShortenerService`] validates incoming URLs, draws slugs from a
//! [`Generator`](shrink_generator::Generator) and persists the result in
//! whichever [`Storage`](shrink_core::Storage) backend it was built with.

pub mod service;
pub mod validate;

pub use service::ShortenerService;
pub use shrink_core::{ShortenedUrl, Shortener, ShortenerError, Url};
