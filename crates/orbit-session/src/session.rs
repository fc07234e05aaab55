//! An authenticated HTTP session against the game server.

use crate::credentials::Credentials;
use crate::endpoint::ServerEndpoint;
use crate::error::{Result, SessionError};
use orbit_core::ServerConfig;
use parking_lot::Mutex;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE,
};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

const XHR_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// HTTP client plus the cookie jar of one login.
///
/// The cookie jar is shared by every worker holding this session. The
/// session-continuity cookie rotates on most responses; [`Session::rotate_token`]
/// is last-write-wins.
#[derive(Debug)]
pub struct Session {
    client: Client,
    endpoint: ServerEndpoint,
    token_name: String,
    cookies: Mutex<BTreeMap<String, String>>,
}

impl Session {
    /// Build a session from supplied credentials.
    ///
    /// Every request carries the XHR headers the sector endpoint expects,
    /// with `Referer` set to the sector view and `Origin` to the server.
    pub fn new(credentials: Credentials, config: &ServerConfig) -> Result<Self> {
        let endpoint = ServerEndpoint::new(&config.base_url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &credentials.default_headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| SessionError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| SessionError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(XHR_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(REFERER, header_value(&endpoint.sector_view_url())?);
        headers.insert(ORIGIN, header_value(endpoint.origin())?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token_name: config.session_cookie.clone(),
            cookies: Mutex::new(credentials.cookies),
        })
    }

    /// Underlying HTTP client (default headers already applied).
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Server URLs.
    #[must_use]
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Current value of the session-continuity cookie.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.cookies.lock().get(&self.token_name).cloned()
    }

    /// Replace the session-continuity cookie.
    pub fn rotate_token(&self, value: impl Into<String>) {
        let value = value.into();
        tracing::trace!("Rotating {} token", self.token_name);
        self.cookies.lock().insert(self.token_name.clone(), value);
    }

    /// Apply a fresh session-continuity token from response headers, if any.
    ///
    /// Returns `true` when the token was rotated.
    pub fn absorb_set_cookies(&self, headers: &HeaderMap) -> bool {
        let fresh = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .filter(|(name, _)| *name == self.token_name)
            .map(|(_, value)| value.to_string())
            .last();

        match fresh {
            Some(value) => {
                self.rotate_token(value);
                true
            }
            None => false,
        }
    }

    /// `Cookie` header value for the current jar.
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies
            .lock()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Fetch the sector view page and check it contains `marker`.
    ///
    /// # Errors
    /// Returns `SessionError::NotAuthenticated` when the page is served
    /// without the marker (a login redirect), `SessionError::Http` on
    /// transport failure.
    pub async fn probe(&self, marker: &str) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint.sector_view_url())
            .header(COOKIE, self.cookie_header())
            .send()
            .await?;

        self.absorb_set_cookies(response.headers());
        let body = response.text().await?;

        if body.contains(marker) {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated)
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| SessionError::InvalidHeader {
        name: value.to_string(),
        reason: e.to_string(),
    })
}

/// Split `name=value; attr...` into its leading pair.
fn parse_set_cookie(raw: &str) -> Option<(&str, &str)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn config() -> ServerConfig {
        ServerConfig {
            base_url: "https://s1-en.example.com/game".to_string(),
            ..ServerConfig::default()
        }
    }

    fn credentials() -> Credentials {
        let mut creds = Credentials::default();
        creds
            .cookies
            .insert("prsess_100170".to_string(), "initial".to_string());
        creds
            .cookies
            .insert("PHPSESSID".to_string(), "php".to_string());
        creds
    }

    #[test]
    fn test_cookie_header() {
        let session = Session::new(credentials(), &config()).unwrap();
        assert_eq!(
            session.cookie_header(),
            "PHPSESSID=php; prsess_100170=initial"
        );
    }

    #[test]
    fn test_absorb_set_cookies_rotates_only_token() {
        let session = Session::new(credentials(), &config()).unwrap();

        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("other=zzz; path=/"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("prsess_100170=rotated; path=/; secure; HttpOnly"),
        );

        assert!(session.absorb_set_cookies(&headers));
        assert_eq!(session.token().as_deref(), Some("rotated"));
        assert!(!session.cookie_header().contains("other="));
    }

    #[test]
    fn test_no_token_in_response() {
        let session = Session::new(credentials(), &config()).unwrap();
        assert!(!session.absorb_set_cookies(&HeaderMap::new()));
        assert_eq!(session.token().as_deref(), Some("initial"));
    }

    #[test]
    fn test_invalid_default_header_rejected() {
        let mut creds = credentials();
        creds
            .default_headers
            .insert("Bad Header".to_string(), "x".to_string());

        let result = Session::new(creds, &config());
        assert!(matches!(result, Err(SessionError::InvalidHeader { .. })));
    }

    #[test]
    fn test_parse_set_cookie() {
        assert_eq!(
            parse_set_cookie("a=b; path=/"),
            Some(("a", "b"))
        );
        assert_eq!(parse_set_cookie("a="), Some(("a", "")));
        assert_eq!(parse_set_cookie("garbage"), None);
    }

    #[tokio::test]
    async fn test_concurrent_rotation_last_write_wins() {
        let session = Arc::new(Session::new(credentials(), &config()).unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                session.rotate_token(format!("token-{i}"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let token = session.token().unwrap();
        assert!(token.starts_with("token-"));
        session.rotate_token("final");
        assert_eq!(session.token().as_deref(), Some("final"));
    }
}
