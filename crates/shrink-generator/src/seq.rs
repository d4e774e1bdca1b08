use crate::base62::DEFAULT_SLUG_LENGTH;
use crate::{Generator, Result};
use shrink_core::Slug;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic slug generator using a sequential counter.
///
/// Produces slugs like "s000000", "s000001", each padded to the configured
/// length. Unique within a single instance; for several nodes sharing one
/// storage, give each node its own prefix.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
    length: usize,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
            prefix: self.prefix.clone(),
            length: self.length,
        }
    }
}

impl SeqGenerator {
    /// Creates a generator emitting `DEFAULT_SLUG_LENGTH` slugs with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator starting from a specific counter value.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
            length: DEFAULT_SLUG_LENGTH,
        }
    }

    /// Overrides the total slug length.
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> Result<Slug> {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let width = self.length.saturating_sub(self.prefix.len());
        Ok(Slug::new(format!(
            "{}{:0width$}",
            self.prefix,
            count,
            width = width
        ))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeneratorError;

    #[test]
    fn produces_sequential_slugs() {
        let generator = SeqGenerator::with_prefix("s");

        assert_eq!(generator.generate().unwrap().as_str(), "s000000");
        assert_eq!(generator.generate().unwrap().as_str(), "s000001");
        assert_eq!(generator.generate().unwrap().as_str(), "s000002");
    }

    #[test]
    fn with_offset() {
        let generator = SeqGenerator::with_offset("nodeA", 42);

        assert_eq!(generator.generate().unwrap().as_str(), "nodeA42");
        assert_eq!(generator.generate().unwrap().as_str(), "nodeA43");
    }

    #[test]
    fn custom_length() {
        let generator = SeqGenerator::with_prefix("x").length(4);
        assert_eq!(generator.generate().unwrap().as_str(), "x000");
    }

    #[test]
    fn rejects_non_base62_prefix() {
        let generator = SeqGenerator::with_prefix("node-a");
        assert!(matches!(
            generator.generate(),
            Err(GeneratorError::InvalidSlug(_))
        ));
    }

    #[test]
    fn clone_preserves_counter_state() {
        let generator = SeqGenerator::with_prefix("s");
        generator.generate().unwrap();
        generator.generate().unwrap();

        let cloned = generator.clone();

        assert_eq!(generator.generate().unwrap().as_str(), "s000002");
        assert_eq!(cloned.generate().unwrap().as_str(), "s000002");
    }
}
