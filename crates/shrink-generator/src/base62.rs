use crate::{Generator, GeneratorError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use shrink_core::slug::BASE62_ALPHABET;
use shrink_core::Slug;
use typed_builder::TypedBuilder;

pub const DEFAULT_SLUG_LENGTH: usize = 7;

const BASE: u64 = BASE62_ALPHABET.len() as u64;

/// Returns a random base62 slug of exactly `length` symbols.
///
/// Digits are extracted from a single 64-bit value read from the OS
/// random source, least significant digit first. The eleventh symbol only
/// ranges over `a` to `v` and every symbol past it is always `a`.
pub fn base62(length: usize) -> Result<Slug> {
    if length == 0 {
        return Err(GeneratorError::ZeroLength);
    }

    let mut bytes = [0u8; 8];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| GeneratorError::Entropy(e.to_string()))?;
    let mut seed = u64::from_le_bytes(bytes);

    let mut slug = String::with_capacity(length);
    for _ in 0..length {
        slug.push(BASE62_ALPHABET[(seed % BASE) as usize] as char);
        seed /= BASE;
    }

    Ok(Slug::new_unchecked(slug))
}

/// Random fixed-length slug generator backed by [`base62`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct Base62Generator {
    #[builder(default = DEFAULT_SLUG_LENGTH)]
    length: usize,
}

impl Base62Generator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for Base62Generator {
    fn default() -> Self {
        Self::new(DEFAULT_SLUG_LENGTH)
    }
}

impl Generator for Base62Generator {
    fn generate(&self) -> Result<Slug> {
        base62(self.length)
    }
}
