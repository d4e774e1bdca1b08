use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A long URL that should be shortened on behalf of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
    /// Owner of the future shortened URL.
    pub user_id: String,
    /// Client-supplied token pairing batch request items with batch results.
    pub corr_id: String,
    /// The original URL text.
    pub raw: String,
}

impl Url {
    pub fn new(
        user_id: impl Into<String>,
        corr_id: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            corr_id: corr_id.into(),
            raw: raw.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_empty() && self.corr_id.is_empty() && self.raw.is_empty()
    }
}

impl Display for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "url[userID: {}, corrID: {}, value: {}]",
            self.user_id, self.corr_id, self.raw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_is_empty() {
        assert!(Url::default().is_empty());
        assert!(!Url::new("u1", "", "").is_empty());
    }

    #[test]
    fn display() {
        let url = Url::new("u1", "c1", "http://example.com");
        assert_eq!(
            url.to_string(),
            "url[userID: u1, corrID: c1, value: http://example.com]"
        );
    }
}
