//! Redirect-following URL resolver

use async_trait::async_trait;
use crypto_scout_domain::UrlResolver;
use reqwest::Client;
use std::time::Duration;

/// Resolves a URL to where its redirects end up
pub struct HttpUrlResolver {
    client: Client,
}

impl HttpUrlResolver {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UrlResolver for HttpUrlResolver {
    async fn resolve(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return raw.to_string();
        }

        match self.client.get(raw).send().await {
            Ok(response) if response.status().is_success() => {
                let resolved = response.url().to_string();
                if resolved != raw {
                    tracing::debug!(from = %raw, to = %resolved, "Resolved URL");
                }
                resolved
            }
            Ok(response) => {
                tracing::debug!(url = %raw, status = %response.status(), "URL not resolved");
                raw.to_string()
            }
            Err(e) => {
                tracing::debug!(url = %raw, error = %e, "URL not resolved");
                raw.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> HttpUrlResolver {
        HttpUrlResolver::new("test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/go/foo"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/projects/foo"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/foo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let resolved = resolver().resolve(&format!("{}/go/foo", server.uri())).await;
        assert_eq!(resolved, format!("{}/projects/foo", server.uri()));
    }

    #[tokio::test]
    async fn test_failure_returns_input() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let raw = format!("{}/missing", server.uri());
        assert_eq!(resolver().resolve(&raw).await, raw);
        assert_eq!(resolver().resolve("not a url").await, "not a url");
        assert_eq!(resolver().resolve("").await, "");
    }
}
