use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A persisted shortened URL.
///
/// The zero value (every field empty, not deleted) is how storages report
/// that nothing was found, see [`ShortenedUrl::is_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortenedUrl {
    pub user_id: String,
    pub corr_id: String,
    /// The original URL.
    pub raw: String,
    pub slug: String,
    /// The full short URL, `base_url + "/" + slug`. Stored verbatim.
    pub value: String,
    /// Soft-delete flag. Deleted records are kept but read as logically gone.
    pub is_deleted: bool,
}

impl ShortenedUrl {
    pub fn new(
        user_id: impl Into<String>,
        corr_id: impl Into<String>,
        raw: impl Into<String>,
        slug: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            corr_id: corr_id.into(),
            raw: raw.into(),
            slug: slug.into(),
            value: value.into(),
            is_deleted: false,
        }
    }

    pub fn set_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Returns `true` for the not-found sentinel.
    pub fn is_empty(&self) -> bool {
        self.user_id.is_empty()
            && self.corr_id.is_empty()
            && self.raw.is_empty()
            && self.slug.is_empty()
            && self.value.is_empty()
            && !self.is_deleted
    }
}

impl Display for ShortenedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "shortenedURL[userID: {}, corrID: {}, raw: {}, slug: {}, value: {}, deleted: {}]",
            self.user_id, self.corr_id, self.raw, self.slug, self.value, self.is_deleted
        )
    }
}

/// Aggregate counters over every stored record, deleted ones included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub urls: u64,
    /// Number of distinct user ids.
    pub users: u64,
}
