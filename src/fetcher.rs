use std::time::Duration;

use reqwest::header::COOKIE;
use tracing::{debug, info};

use crate::config::{FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::error::Result;

/// GETs scrape targets with a browser user-agent and a fixed timeout.
/// No retries; a failed fetch fails the run.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: reqwest::Client,
}

impl HtmlFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the body on 2xx.
    /// `session_cookie` is sent verbatim as the `Cookie` header when present.
    pub async fn fetch(&self, url: &str, session_cookie: Option<&str>) -> Result<String> {
        info!(url = %url, "Fetching {url}");

        let mut req = self.client.get(url);
        if let Some(cookie) = session_cookie {
            req = req.header(COOKIE, cookie);
        }

        let resp = req.send().await?.error_for_status()?;
        let body = resp.text().await?;

        debug!(url = %url, bytes = body.len(), "Fetched {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn returns_body_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ladder")
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("<html><table></table></html>")
            .create_async()
            .await;

        let fetcher = HtmlFetcher::new().unwrap();
        let body = fetcher
            .fetch(&format!("{}/ladder", server.url()), None)
            .await
            .unwrap();

        assert_eq!(body, "<html><table></table></html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_session_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fixtures")
            .match_header("cookie", "ASP.NET_SessionId=abc123")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let fetcher = HtmlFetcher::new().unwrap();
        fetcher
            .fetch(&format!("{}/fixtures", server.url()), Some("ASP.NET_SessionId=abc123"))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_2xx_is_a_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ladder")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = HtmlFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/ladder", server.url()), None)
            .await
            .unwrap_err();

        match err {
            AppError::Network(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(503)),
            other => panic!("expected Network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        // Grab a free port, then close it so nothing is listening there.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();

        let fetcher = HtmlFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("http://{addr}/"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
