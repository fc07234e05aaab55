use crate::error::{Result, SessionError};
use url::Url;

/// Query string of the sector view page.
const SECTOR_VIEW_QUERY: &str = "page=ingame&component=galaxy";

/// Query string of the sector content endpoint.
const SECTOR_FETCH_QUERY: &str =
    "page=ingame&component=galaxy&action=fetchGalaxyContent&ajax=1&asJson=1";

/// URLs of the remote game server derived from its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    base: String,
    origin: String,
    host: String,
}

impl ServerEndpoint {
    /// Parse a base URL such as `https://s1-en.example.com/game`.
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| SessionError::InvalidUrl(format!("{trimmed}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::InvalidUrl(format!(
                "{trimmed}: unsupported scheme {}",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| SessionError::InvalidUrl(format!("{trimmed}: no host")))?
            .to_string();

        Ok(Self {
            base: trimmed.to_string(),
            origin: url.origin().ascii_serialization(),
            host,
        })
    }

    /// Page probed to check authentication; also the `Referer` of fetches.
    #[must_use]
    pub fn sector_view_url(&self) -> String {
        format!("{}/index.php?{SECTOR_VIEW_QUERY}", self.base)
    }

    /// Endpoint returning one sector as JSON.
    #[must_use]
    pub fn sector_fetch_url(&self) -> String {
        format!("{}/index.php?{SECTOR_FETCH_QUERY}", self.base)
    }

    /// Scheme, host and port, as sent in the `Origin` header.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Host name, used to select cookies.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let endpoint = ServerEndpoint::new("https://s1-en.example.com/game/").unwrap();
        assert_eq!(
            endpoint.sector_view_url(),
            "https://s1-en.example.com/game/index.php?page=ingame&component=galaxy"
        );
        assert!(endpoint
            .sector_fetch_url()
            .ends_with("action=fetchGalaxyContent&ajax=1&asJson=1"));
        assert_eq!(endpoint.origin(), "https://s1-en.example.com");
        assert_eq!(endpoint.host(), "s1-en.example.com");
    }

    #[test]
    fn test_origin_keeps_port() {
        let endpoint = ServerEndpoint::new("http://127.0.0.1:8080/game").unwrap();
        assert_eq!(endpoint.origin(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_urls() {
        assert!(ServerEndpoint::new("not-a-url").is_err());
        assert!(ServerEndpoint::new("ftp://example.com/game").is_err());
    }
}
