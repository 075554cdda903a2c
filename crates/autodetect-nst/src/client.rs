use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{error, info};

use autodetect_core::NstBrowserConfig;

use crate::error::{NstError, Result};

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnceBrowser {
    profile_id: Option<String>,
}

// ─── NstClient ────────────────────────────────────────────────────────────────

pub struct NstClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl NstClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("autodetect/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| NstError::InvalidApiKey)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    /// Build a client, reading the API key from the configured env var.
    pub fn from_config(config: &NstBrowserConfig) -> Result<Self> {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Like [`NstClient::from_config`], resolving the key through `lookup`.
    pub fn from_config_with(
        config: &NstBrowserConfig,
        lookup: impl FnOnce(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_key = lookup(&config.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| NstError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(&config.base_url, &api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the agent for a one-shot browser and return its profile id.
    ///
    /// `Ok(None)` means the agent answered but gave no profile id.
    pub async fn create_profile(&self) -> Result<Option<String>> {
        info!("creating NSTBrowser profile");
        let url = format!("{}/api/v2/browsers/once", self.base_url);

        let resp = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .body("{}")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            error!(status, "failed to create NSTBrowser profile");
            return Err(NstError::Api { url, status, body });
        }

        let text = resp.text().await?;
        let envelope: Envelope<OnceBrowser> =
            serde_json::from_str(&text).map_err(|e| NstError::Parse(e.to_string()))?;

        let profile_id = envelope.data.and_then(|data| data.profile_id);
        match &profile_id {
            Some(id) => info!(profile_id = %id, "created NSTBrowser profile"),
            None => error!(response = %text, "NSTBrowser response had no profile id"),
        }
        Ok(profile_id)
    }

    /// Delete a profile. Rejections by the agent are logged, not returned.
    pub async fn delete_profile(&self, profile_id: &str) -> Result<()> {
        info!(profile_id, "deleting NSTBrowser profile");
        let url = format!("{}/api/v2/profiles/{profile_id}", self.base_url);

        let resp = self
            .client
            .delete(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        if resp.status() == StatusCode::NO_CONTENT {
            info!(profile_id, "deleted NSTBrowser profile");
        } else {
            error!(
                profile_id,
                status = resp.status().as_u16(),
                "failed to delete NSTBrowser profile"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_create_profile_returns_id() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/api/v2/browsers/once")
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::JsonString("{}".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"profileId": "prof-123", "port": 9222}, "err": false}"#)
            .create_async()
            .await;

        let client = NstClient::new(&server.url(), "test-key").unwrap();
        let id = client.create_profile().await.unwrap();

        assert_eq!(id.as_deref(), Some("prof-123"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_profile_without_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v2/browsers/once")
            .with_status(200)
            .with_body(r#"{"data": null}"#)
            .create_async()
            .await;

        let client = NstClient::new(&server.url(), "k").unwrap();
        assert_eq!(client.create_profile().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_profile_http_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v2/browsers/once")
            .with_status(401)
            .with_body("bad token")
            .create_async()
            .await;

        let client = NstClient::new(&server.url(), "k").unwrap();
        let err = client.create_profile().await.unwrap_err();
        match err {
            NstError::Api { status, body, .. } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_profile_malformed_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v2/browsers/once")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = NstClient::new(&server.url(), "k").unwrap();
        assert!(matches!(
            client.create_profile().await,
            Err(NstError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_profile_no_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v2/profiles/prof-123")
            .match_header("authorization", "Bearer k")
            .with_status(204)
            .create_async()
            .await;

        let client = NstClient::new(&format!("{}/", server.url()), "k").unwrap();
        client.delete_profile("prof-123").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_profile_rejection_is_not_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/api/v2/profiles/gone")
            .with_status(404)
            .create_async()
            .await;

        let client = NstClient::new(&server.url(), "k").unwrap();
        assert!(client.delete_profile("gone").await.is_ok());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = NstBrowserConfig::default();
        let err = NstClient::from_config_with(&config, |_| None).err().unwrap();
        assert!(matches!(err, NstError::MissingApiKey(ref name) if name == "NSTBROWSER_API_KEY"));

        let blank = NstClient::from_config_with(&config, |_| Some("  ".into()));
        assert!(blank.is_err());
    }

    #[test]
    fn test_from_config_uses_base_url() {
        let config = NstBrowserConfig {
            base_url: "http://nst.local:8848/".to_string(),
            ..NstBrowserConfig::default()
        };
        let client = NstClient::from_config_with(&config, |name| {
            assert_eq!(name, "NSTBROWSER_API_KEY");
            Some("secret".into())
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://nst.local:8848");
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            NstClient::new("http://localhost", "bad\nkey"),
            Err(NstError::InvalidApiKey)
        ));
    }
}
