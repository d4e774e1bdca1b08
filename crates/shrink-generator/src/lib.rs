pub mod base62;
pub mod seq;

pub use base62::{base62, Base62Generator, DEFAULT_SLUG_LENGTH};
pub use seq::SeqGenerator;

use shrink_core::{CoreError, Slug};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("zero size")]
    ZeroLength,
    #[error("failed to generate random uint64: {0}")]
    Entropy(String),
    #[error(transparent)]
    InvalidSlug(#[from] CoreError),
}

/// Trait for generating slugs.
///
/// Implementations are pure generators that don't interact with storage:
/// they neither retry on collision nor check uniqueness. Rejecting a
/// duplicate is the storage's job at write time.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> Result<Slug>;
}
