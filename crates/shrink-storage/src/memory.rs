use crate::pool::fan_out_blocking;
use async_trait::async_trait;
use parking_lot::RwLock;
use shrink_core::error::{Result, StorageError};
use shrink_core::{ReadStorage, ShortenedUrl, Stat, Storage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// In-memory implementation of the storage contract.
///
/// A single slug-keyed map behind one read/write lock. Lookups by URL or
/// user scan the whole map, which is fine at the scale this backend is
/// meant for (tests and single-node demos).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<HashMap<String, ShortenedUrl>>>,
}

impl MemoryStorage {
    /// Creates a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty storage with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
        }
    }
}

#[async_trait]
impl ReadStorage for MemoryStorage {
    async fn get_by_slug(&self, slug: &str) -> Result<ShortenedUrl> {
        Ok(self.data.read().get(slug).cloned().unwrap_or_default())
    }

    async fn get_by_url(&self, raw: &str) -> Result<ShortenedUrl> {
        Ok(self
            .data
            .read()
            .values()
            .find(|v| v.raw == raw)
            .cloned()
            .unwrap_or_default())
    }

    async fn collect_by_user(&self, user_id: &str) -> Result<Vec<ShortenedUrl>> {
        if user_id.is_empty() {
            return Err(StorageError::EmptyUserId);
        }

        Ok(self
            .data
            .read()
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn stat(&self) -> Result<Stat> {
        let data = self.data.read();
        let users: HashSet<&str> = data.values().map(|v| v.user_id.as_str()).collect();

        Ok(Stat {
            urls: data.len() as u64,
            users: users.len() as u64,
        })
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, url: ShortenedUrl) -> Result<()> {
        let mut data = self.data.write();

        let taken = data.contains_key(&url.slug)
            || data
                .values()
                .any(|v| v.raw == url.raw && v.user_id == url.user_id);
        if taken {
            warn!(slug = %url.slug, user_id = %url.user_id, "rejected duplicate shortened url");
            return Err(StorageError::UniqueViolation);
        }

        debug!(slug = %url.slug, user_id = %url.user_id, "saved shortened url");
        data.insert(url.slug.clone(), url);
        Ok(())
    }

    /// Inserts every record, or none if any slug is already taken (by a
    /// stored record or by another record of the same batch).
    async fn batch(&self, urls: Vec<ShortenedUrl>) -> Result<()> {
        let mut data = self.data.write();
        let count = urls.len();

        {
            let mut slugs = HashSet::with_capacity(count);
            for url in &urls {
                if data.contains_key(&url.slug) || !slugs.insert(url.slug.as_str()) {
                    warn!(slug = %url.slug, "rejected batch with a taken slug");
                    return Err(StorageError::UniqueViolation);
                }
            }
        }

        for url in urls {
            data.insert(url.slug.clone(), url);
        }

        debug!(count, "saved shortened url batch");
        Ok(())
    }

    async fn delete(&self, user_id: &str, slugs: &[String]) -> Result<()> {
        let data = Arc::clone(&self.data);
        let owner = user_id.to_string();
        fan_out_blocking(slugs.to_vec(), move |slug| {
            let mut data = data.write();
            if let Some(url) = data.get_mut(&slug) {
                if url.user_id == owner {
                    url.set_deleted();
                }
            }
        })
        .await?;

        debug!(user_id, count = slugs.len(), "processed delete request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const BASE_URL: &str = "http://127.0.0.1:8080";

    fn url(user_id: &str, raw: &str, slug: &str) -> ShortenedUrl {
        ShortenedUrl::new(user_id, "1", raw, slug, format!("{BASE_URL}/{slug}"))
    }

    #[tokio::test]
    async fn save_and_get_by_slug() {
        let storage = MemoryStorage::new();
        let saved = url("1", "http://demo.com", "slug1");

        storage.save(saved.clone()).await.unwrap();

        let got = storage.get_by_slug("slug1").await.unwrap();
        assert_eq!(got, saved);
    }

    #[tokio::test]
    async fn get_by_unknown_slug_is_empty() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();

        let got = storage.get_by_slug("no").await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn save_same_raw_for_same_user_conflicts() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();

        let err = storage
            .save(url("1", "http://demo.com", "slug2"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation));
    }

    #[tokio::test]
    async fn save_same_raw_for_other_user_succeeds() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();
        storage.save(url("2", "http://demo.com", "slug2")).await.unwrap();

        assert_eq!(storage.stat().await.unwrap(), Stat { urls: 2, users: 2 });
    }

    #[tokio::test]
    async fn save_taken_slug_conflicts() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();

        let err = storage
            .save(url("2", "http://other.com", "slug1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation));
    }

    #[tokio::test]
    async fn get_by_url() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();

        let got = storage.get_by_url("http://demo.com").await.unwrap();
        assert_eq!(got.user_id, "1");
        assert_eq!(got.slug, "slug1");

        let missing = storage.get_by_url("http://demo2.com").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn collect_by_user() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();
        storage.save(url("2", "http://demo.com", "slug2")).await.unwrap();
        storage.save(url("3", "http://demo.com", "slug3")).await.unwrap();

        let collected = storage.collect_by_user("1").await.unwrap();
        assert_eq!(collected, vec![url("1", "http://demo.com", "slug1")]);

        assert!(storage.collect_by_user("4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collect_by_empty_user_fails() {
        let storage = MemoryStorage::new();
        let err = storage.collect_by_user("").await.unwrap_err();
        assert!(matches!(err, StorageError::EmptyUserId));
    }

    #[tokio::test]
    async fn batch_inserts_every_record() {
        let storage = MemoryStorage::new();
        let urls = vec![
            url("1", "http://demo.com/1", "slug1"),
            url("2", "http://demo.com/2", "slug2"),
            url("1", "http://demo.com/3", "slug3"),
            url("3", "http://demo.com/4", "slug4"),
        ];

        storage.batch(urls).await.unwrap();

        assert_eq!(storage.stat().await.unwrap(), Stat { urls: 4, users: 3 });
        assert_eq!(storage.collect_by_user("1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn batch_with_stored_slug_keeps_existing_record() {
        let storage = MemoryStorage::new();
        let alice = url("alice", "http://alice.com", "abc1234");
        storage.save(alice.clone()).await.unwrap();

        let err = storage
            .batch(vec![
                url("bob", "http://bob.com/1", "fresh01"),
                url("bob", "http://bob.com", "abc1234"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UniqueViolation));
        assert_eq!(storage.get_by_slug("abc1234").await.unwrap(), alice);
        assert!(storage.get_by_slug("fresh01").await.unwrap().is_empty());
        assert_eq!(storage.stat().await.unwrap(), Stat { urls: 1, users: 1 });
    }

    #[tokio::test]
    async fn batch_with_repeated_slug_writes_nothing() {
        let storage = MemoryStorage::new();

        let err = storage
            .batch(vec![
                url("1", "http://demo.com/1", "slug1"),
                url("2", "http://demo.com/2", "slug1"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::UniqueViolation));
        assert_eq!(storage.stat().await.unwrap(), Stat::default());
    }

    #[tokio::test]
    async fn delete_only_touches_owned_slugs() {
        let storage = MemoryStorage::new();
        for i in 1..=5 {
            storage
                .save(url("1", &format!("http://demo.com/{i}"), &format!("slug{i}")))
                .await
                .unwrap();
        }
        for i in 6..=9 {
            storage
                .save(url("2", &format!("http://test.com/{i}"), &format!("slug{i}")))
                .await
                .unwrap();
        }

        let slugs: Vec<String> = (1..=9).map(|i| format!("slug{i}")).chain(["nope".to_string()]).collect();
        storage.delete("1", &slugs).await.unwrap();

        for i in 1..=5 {
            assert!(storage.get_by_slug(&format!("slug{i}")).await.unwrap().is_deleted);
        }
        for i in 6..=9 {
            assert!(!storage.get_by_slug(&format!("slug{i}")).await.unwrap().is_deleted);
        }
    }

    #[tokio::test]
    async fn delete_keeps_records() {
        let storage = MemoryStorage::new();
        storage.save(url("1", "http://demo.com", "slug1")).await.unwrap();

        storage.delete("1", &["slug1".to_string()]).await.unwrap();

        assert_eq!(storage.stat().await.unwrap().urls, 1);
        let got = storage.get_by_slug("slug1").await.unwrap();
        assert!(got.is_deleted);
        assert!(!got.is_empty());
    }

    #[tokio::test]
    async fn delete_with_no_slugs() {
        let storage = MemoryStorage::new();
        storage.delete("1", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn stat_counts_urls_and_distinct_users() {
        let storage = MemoryStorage::with_capacity(16);
        let owners = ["1", "1", "2", "3", "3", "3", "4", "5", "6", "7"];
        for (i, owner) in owners.iter().enumerate() {
            storage
                .save(url(owner, &format!("http://demo.com/{i}"), &format!("slug{i}")))
                .await
                .unwrap();
        }

        assert_eq!(storage.stat().await.unwrap(), Stat { urls: 10, users: 7 });
    }

    #[tokio::test]
    async fn concurrent_access() {
        let storage = Arc::new(MemoryStorage::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage
                    .save(url(&format!("{}", i % 3), &format!("http://example{i}.com"), &format!("code{i:03}")))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(storage.stat().await.unwrap(), Stat { urls: 10, users: 3 });
    }
}
