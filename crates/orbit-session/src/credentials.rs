//! Credential acquisition.
//!
//! Obtaining a logged-in cookie jar is left to an external collaborator (an
//! embedded browser, a login script, a file exported by hand). The scanner
//! only sees the [`CredentialSupplier`] seam.

use crate::error::{Result, SessionError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the cookie export read by [`CookieFileSupplier`].
pub const COOKIE_FILE_NAME: &str = "cookies.json";

/// Cookies and extra headers for one authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Cookie name to value
    pub cookies: BTreeMap<String, String>,
    /// Extra request headers (e.g. `User-Agent`)
    pub default_headers: BTreeMap<String, String>,
}

/// Source of authenticated credentials.
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    /// Produce credentials for the browser profile at `profile_dir`.
    ///
    /// May block for as long as an interactive login takes.
    async fn acquire_session(&self, profile_dir: &Path) -> Result<Credentials>;
}

/// One cookie as exported by common browser cookie-export tools.
#[derive(Debug, Deserialize)]
struct ExportedCookie {
    name: String,
    value: String,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CookieExport {
    List(Vec<ExportedCookie>),
    Map(BTreeMap<String, String>),
}

#[derive(Debug, Default, Deserialize)]
struct HeaderExport {
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

/// Reads `cookies.json` from the profile directory.
///
/// The file is either a list of `{name, value, domain}` objects, in which case
/// only cookies whose domain matches the server host are kept, or a flat
/// `{name: value}` map taken as-is. An optional `headers.json` next to it adds
/// default headers.
#[derive(Debug, Clone)]
pub struct CookieFileSupplier {
    host: String,
}

impl CookieFileSupplier {
    /// Supplier for cookies of `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    fn domain_matches(&self, domain: Option<&str>) -> bool {
        let Some(domain) = domain else {
            return true;
        };
        let domain = domain.trim_start_matches('.');
        self.host == domain || self.host.ends_with(&format!(".{domain}"))
    }

    async fn read_cookies(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            SessionError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;

        let cookies = match serde_json::from_str::<CookieExport>(&raw)? {
            CookieExport::Map(map) => map,
            CookieExport::List(list) => list
                .into_iter()
                .filter(|c| self.domain_matches(c.domain.as_deref()))
                .map(|c| (c.name, c.value))
                .collect(),
        };

        Ok(cookies)
    }
}

#[async_trait]
impl CredentialSupplier for CookieFileSupplier {
    async fn acquire_session(&self, profile_dir: &Path) -> Result<Credentials> {
        let cookie_path = profile_dir.join(COOKIE_FILE_NAME);
        let cookies = self.read_cookies(&cookie_path).await?;

        if cookies.is_empty() {
            return Err(SessionError::Credentials(format!(
                "no cookies for {} in {}",
                self.host,
                cookie_path.display()
            )));
        }

        let header_path: PathBuf = profile_dir.join("headers.json");
        let default_headers = match tokio::fs::read_to_string(&header_path).await {
            Ok(raw) => serde_json::from_str::<HeaderExport>(&raw)?.headers,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "Loaded {} cookies for {} from {}",
            cookies.len(),
            self.host,
            cookie_path.display()
        );

        Ok(Credentials {
            cookies,
            default_headers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_cookie_list_filtered_by_domain() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(COOKIE_FILE_NAME),
            r#"[
                {"name": "prsess_100170", "value": "abc", "domain": ".example.com"},
                {"name": "PHPSESSID", "value": "xyz", "domain": "s1-en.example.com"},
                {"name": "tracker", "value": "nope", "domain": "ads.other.net"}
            ]"#,
        )
        .unwrap();

        let supplier = CookieFileSupplier::new("s1-en.example.com");
        let creds = supplier.acquire_session(dir.path()).await.unwrap();

        assert_eq!(creds.cookies.len(), 2);
        assert_eq!(creds.cookies["prsess_100170"], "abc");
        assert!(!creds.cookies.contains_key("tracker"));
        assert!(creds.default_headers.is_empty());
    }

    #[tokio::test]
    async fn test_reads_cookie_map_and_headers() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(COOKIE_FILE_NAME),
            r#"{"prsess_100170": "abc"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("headers.json"),
            r#"{"headers": {"User-Agent": "Mozilla/5.0"}}"#,
        )
        .unwrap();

        let supplier = CookieFileSupplier::new("s1-en.example.com");
        let creds = supplier.acquire_session(dir.path()).await.unwrap();

        assert_eq!(creds.cookies["prsess_100170"], "abc");
        assert_eq!(creds.default_headers["User-Agent"], "Mozilla/5.0");
    }

    #[tokio::test]
    async fn test_unreadable_headers_fail_the_attempt() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(COOKIE_FILE_NAME),
            r#"{"prsess_100170": "abc"}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("headers.json")).unwrap();

        let supplier = CookieFileSupplier::new("s1-en.example.com");
        let result = supplier.acquire_session(dir.path()).await;
        assert!(matches!(result, Err(SessionError::Io(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_credentials_error() {
        let dir = TempDir::new().unwrap();
        let supplier = CookieFileSupplier::new("s1-en.example.com");

        let result = supplier.acquire_session(dir.path()).await;
        assert!(matches!(result, Err(SessionError::Credentials(_))));
    }

    #[tokio::test]
    async fn test_no_matching_cookies_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(COOKIE_FILE_NAME),
            r#"[{"name": "a", "value": "b", "domain": "other.net"}]"#,
        )
        .unwrap();

        let supplier = CookieFileSupplier::new("s1-en.example.com");
        let result = supplier.acquire_session(dir.path()).await;
        assert!(matches!(result, Err(SessionError::Credentials(_))));
    }
}
