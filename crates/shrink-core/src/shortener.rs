use crate::shortened_url::ShortenedUrl;
use crate::url::Url;
use async_trait::async_trait;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates and saves a new shortened URL, returning its full short value.
    async fn short(&self, url: Url) -> Result<String>;

    /// Creates and saves a shortened URL for every item.
    /// The first invalid item aborts the whole call.
    async fn batch(&self, urls: Vec<Url>) -> Result<Vec<ShortenedUrl>>;
}
