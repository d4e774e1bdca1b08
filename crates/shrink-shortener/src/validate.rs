//! Structural checks applied before a URL is shortened.

use shrink_core::{ShortenerError, Url};
use url::Host;

/// Checks that `url` can be shortened under `base_url`.
///
/// `user_id` and `raw` must be non-empty, `raw` must parse as an absolute
/// URL, and its host must be an IP literal or contain at least one `.`.
/// This is a coarse heuristic, not DNS validation. No normalization is
/// performed.
pub fn validate(url: &Url, base_url: &str) -> Result<(), ShortenerError> {
    if url.user_id.is_empty() {
        return Err(invalid("empty userID"));
    }
    if url.raw.is_empty() {
        return Err(invalid("empty URI"));
    }

    let parsed = url::Url::parse(&url.raw).map_err(|_| invalid("failed to parse URI"))?;
    match parsed.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
        Some(Host::Domain(domain)) if domain.contains('.') => {}
        _ => return Err(invalid("URI host must be an IP or a dotted domain")),
    }

    if base_url.is_empty() {
        return Err(invalid("empty baseURL"));
    }

    Ok(())
}

fn invalid(reason: &str) -> ShortenerError {
    ShortenerError::InvalidCreation(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_URL: &str = "http://localhost:8080";

    fn check(user_id: &str, raw: &str, base_url: &str) -> Result<(), ShortenerError> {
        validate(&Url::new(user_id, "", raw), base_url)
    }

    #[test]
    fn accepts_domains_and_ip_literals() {
        assert!(check("u1", "http://example.com", BASE_URL).is_ok());
        assert!(check("u1", "https://sub.example.com/path?q=1", BASE_URL).is_ok());
        assert!(check("u1", "http://127.0.0.1:8080/x", BASE_URL).is_ok());
        assert!(check("u1", "http://[::1]/x", BASE_URL).is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(matches!(
            check("", "http://example.com", BASE_URL),
            Err(ShortenerError::InvalidCreation(_))
        ));
        assert!(matches!(
            check("u1", "", BASE_URL),
            Err(ShortenerError::InvalidCreation(_))
        ));
        assert!(matches!(
            check("u1", "http://example.com", ""),
            Err(ShortenerError::InvalidCreation(_))
        ));
    }

    #[test]
    fn rejects_malformed_uris() {
        for raw in ["not-a-valid-url", "example.com", "/relative/path", "http://"] {
            assert!(check("u1", raw, BASE_URL).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn rejects_dotless_hosts() {
        assert!(check("u1", "http://localhost:8080", BASE_URL).is_err());
        assert!(check("u1", "mailto:someone@example.com", BASE_URL).is_err());
    }
}
