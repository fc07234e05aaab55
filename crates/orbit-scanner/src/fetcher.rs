//! Sector requests against the remote API.

use crate::error::FetchError;
use async_trait::async_trait;
use orbit_core::Coordinate;
use orbit_session::Session;
use reqwest::header::COOKIE;
use reqwest::StatusCode;

/// Source of raw sector bodies.
#[async_trait]
pub trait SectorSource: Send + Sync {
    /// Fetch the raw body for `coordinate` using `session`.
    async fn fetch(&self, session: &Session, coordinate: Coordinate) -> Result<String, FetchError>;
}

/// Fetches sectors with a form POST to the sector endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSectorFetcher;

impl HttpSectorFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        None
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Some(FetchError::ServerBusy {
            status: status.as_u16(),
        })
    } else {
        Some(FetchError::StaleSession {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl SectorSource for HttpSectorFetcher {
    async fn fetch(&self, session: &Session, coordinate: Coordinate) -> Result<String, FetchError> {
        let galaxy = coordinate.galaxy.to_string();
        let system = coordinate.system.to_string();

        let response = session
            .client()
            .post(session.endpoint().sector_fetch_url())
            .header(COOKIE, session.cookie_header())
            .form(&[("galaxy", galaxy.as_str()), ("system", system.as_str())])
            .send()
            .await?;

        // Rotate before anything else so a failing body still keeps the jar fresh.
        if session.absorb_set_cookies(response.headers()) {
            tracing::trace!("Token rotated by {}", coordinate);
        }

        if let Some(err) = classify_status(response.status()) {
            tracing::debug!("{} answered {}", coordinate, response.status());
            return Err(err);
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use orbit_core::ServerConfig;
    use orbit_session::Credentials;

    fn session_for(base_url: &str) -> Session {
        let mut creds = Credentials::default();
        creds
            .cookies
            .insert("prsess_100170".to_string(), "old".to_string());
        let config = ServerConfig {
            base_url: format!("{base_url}/game"),
            ..ServerConfig::default()
        };
        Session::new(creds, &config).unwrap()
    }

    fn coordinate() -> Coordinate {
        Coordinate {
            galaxy: 3,
            system: 142,
        }
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(FetchError::ServerBusy { status: 503 })
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(FetchError::ServerBusy { status: 429 })
        ));
        assert!(matches!(
            classify_status(StatusCode::FOUND),
            Some(FetchError::StaleSession { status: 302 })
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Some(FetchError::StaleSession { status: 403 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_posts_form_and_rotates_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/game/index.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("component".into(), "galaxy".into()),
                Matcher::UrlEncoded("action".into(), "fetchGalaxyContent".into()),
            ]))
            .match_header("cookie", "prsess_100170=old")
            .match_header("x-requested-with", "XMLHttpRequest")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("galaxy".into(), "3".into()),
                Matcher::UrlEncoded("system".into(), "142".into()),
            ]))
            .with_status(200)
            .with_header("set-cookie", "prsess_100170=new; path=/")
            .with_body(r#"{"system":{"galaxyContent":[]}}"#)
            .create_async()
            .await;

        let session = session_for(&server.url());
        let body = HttpSectorFetcher::new()
            .fetch(&session, coordinate())
            .await
            .unwrap();

        assert!(body.starts_with('{'));
        assert_eq!(session.token().as_deref(), Some("new"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_maps_server_error_to_busy() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/game/index.php")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let session = session_for(&server.url());
        let err = HttpSectorFetcher::new()
            .fetch(&session, coordinate())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::ServerBusy { status: 502 }));
    }

    #[tokio::test]
    async fn test_fetch_returns_login_page_body_untouched() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/game/index.php")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<!DOCTYPE html><html>login</html>")
            .create_async()
            .await;

        let session = session_for(&server.url());
        let body = HttpSectorFetcher::new()
            .fetch(&session, coordinate())
            .await
            .unwrap();

        assert!(body.starts_with("<!DOCTYPE"));
    }
}
