use crate::error::Result;
use crate::shortened_url::{ShortenedUrl, Stat};
use async_trait::async_trait;

/// A read-only view of a storage.
///
/// Lookups report a missing record with the zero-value [`ShortenedUrl`]
/// rather than an error.
#[async_trait]
pub trait ReadStorage: Send + Sync + 'static {
    /// Finds a record by slug.
    async fn get_by_slug(&self, slug: &str) -> Result<ShortenedUrl>;

    /// Finds a record by its original URL.
    async fn get_by_url(&self, raw: &str) -> Result<ShortenedUrl>;

    /// Collects every record owned by `user_id`.
    /// Returns `Err(EmptyUserId)` when `user_id` is empty.
    async fn collect_by_user(&self, user_id: &str) -> Result<Vec<ShortenedUrl>>;

    /// Counts records and distinct users.
    async fn stat(&self) -> Result<Stat>;
}

/// The operation set every backend implements.
#[async_trait]
pub trait Storage: ReadStorage {
    /// Inserts a new record. Returns `Err(UniqueViolation)` if the
    /// `(raw, user_id)` pair is already stored.
    async fn save(&self, url: ShortenedUrl) -> Result<()>;

    /// Bulk insert. Atomicity is backend specific.
    async fn batch(&self, urls: Vec<ShortenedUrl>) -> Result<()>;

    /// Soft-deletes the slugs owned by `user_id`.
    /// Slugs that are unknown or owned by someone else are skipped.
    async fn delete(&self, user_id: &str, slugs: &[String]) -> Result<()>;

    /// Releases the resources held by the storage.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
