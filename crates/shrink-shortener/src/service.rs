use crate::validate::validate;
use async_trait::async_trait;
use shrink_core::{ShortenedUrl, Shortener, ShortenerError, Storage, Url};
use shrink_generator::Generator;
use std::sync::Arc;
use tracing::{debug, warn};

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Storage` and a `Generator` to handle:
/// - URL validation
/// - Slug generation
/// - Translating storage conflicts into [`ShortenerError::UniqueViolation`]
///
/// No collision retry is performed: a duplicate slug is rejected by the
/// storage like any other uniqueness conflict.
#[derive(Debug)]
pub struct ShortenerService<S, G> {
    storage: Arc<S>,
    generator: Arc<G>,
    base_url: String,
}

impl<S, G> Clone for ShortenerService<S, G> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            generator: Arc::clone(&self.generator),
            base_url: self.base_url.clone(),
        }
    }
}

impl<S: Storage, G: Generator> ShortenerService<S, G> {
    /// Creates a new `ShortenerService` publishing short URLs under `base_url`.
    pub fn new(base_url: impl Into<String>, storage: S, generator: G) -> Self {
        Self {
            storage: Arc::new(storage),
            generator: Arc::new(generator),
            base_url: base_url.into(),
        }
    }

    /// Returns the storage, e.g. to resolve the existing mapping with
    /// `get_by_url` after a [`ShortenerError::UniqueViolation`].
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validates `url` and builds the entity to persist.
    fn shorten(&self, url: Url) -> Result<ShortenedUrl, ShortenerError> {
        validate(&url, &self.base_url)?;

        let slug = self.generator.generate().map_err(|e| {
            ShortenerError::InvalidCreation(format!("failed to create the slug: {e}"))
        })?;
        let value = slug.to_url(&self.base_url);

        Ok(ShortenedUrl::new(
            url.user_id,
            url.corr_id,
            url.raw,
            slug.into_string(),
            value,
        ))
    }
}

#[async_trait]
impl<S: Storage, G: Generator> Shortener for ShortenerService<S, G> {
    async fn short(&self, url: Url) -> Result<String, ShortenerError> {
        let shortened = self.shorten(url)?;
        let value = shortened.value.clone();
        let user_id = shortened.user_id.clone();

        self.storage.save(shortened).await.map_err(|e| {
            let err = ShortenerError::from(e);
            if matches!(err, ShortenerError::UniqueViolation) {
                warn!(user_id = %user_id, "url already shortened for this user");
            }
            err
        })?;

        debug!(user_id = %user_id, value = %value, "shortened url");
        Ok(value)
    }

    async fn batch(&self, urls: Vec<Url>) -> Result<Vec<ShortenedUrl>, ShortenerError> {
        if urls.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }

        let shortened = urls
            .into_iter()
            .map(|url| self.shorten(url))
            .collect::<Result<Vec<_>, _>>()?;

        self.storage.batch(shortened.clone()).await?;

        debug!(count = shortened.len(), "shortened url batch");
        Ok(shortened)
    }
}
