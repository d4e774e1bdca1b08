use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Alphabet slugs are drawn from: `a-z`, `A-Z`, `0-9`.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A base62 identifier keying a shortened URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// Creates a new `Slug` after validating the input.
    ///
    /// Valid slugs are non-empty and contain only base62 characters.
    pub fn new(slug: impl Into<String>) -> Result<Self, CoreError> {
        let slug = slug.into();
        Self::validate(&slug)?;
        Ok(Self(slug))
    }

    /// Creates a `Slug` without validation.
    ///
    /// Use this only for slugs produced by generators that draw from
    /// [`BASE62_ALPHABET`].
    pub fn new_unchecked(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Builds the full short URL value: `base_url + "/" + slug`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url, self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn validate(slug: &str) -> Result<(), CoreError> {
        if slug.is_empty() {
            return Err(CoreError::InvalidSlug("slug cannot be empty".to_string()));
        }

        if !slug.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidSlug(format!(
                "must contain only base62 characters: '{}'",
                slug
            )));
        }

        Ok(())
    }
}

impl Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_has_62_distinct_symbols() {
        let mut symbols = BASE62_ALPHABET.to_vec();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), 62);
        assert!(symbols.iter().all(u8::is_ascii_alphanumeric));
    }

    #[test]
    fn valid_slugs() {
        assert!(Slug::new("abc").is_ok());
        assert!(Slug::new("aB3xY9z").is_ok());
    }

    #[test]
    fn invalid_slugs() {
        assert!(Slug::new("").is_err());
        assert!(Slug::new("abc-def").is_err());
        assert!(Slug::new("abc def").is_err());
    }

    #[test]
    fn to_url_appends_slug() {
        let slug = Slug::new("abc1234").unwrap();
        assert_eq!(
            slug.to_url("http://localhost:8080"),
            "http://localhost:8080/abc1234"
        );
    }
}
