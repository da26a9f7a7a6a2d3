//! Shared HTTP client for the Suraksha backend.
//!
//! Provides a minimal client that attaches the session's bearer token (and no
//! `Authorization` header at all when signed out), generic GET/POST helpers,
//! and the signed upload flow (signed URL, direct storage upload,
//! verify-and-publish). The CLI uses this client directly.

pub mod upload;
pub mod uploader;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use suraksha_core::{ClientConfig, Session};

/// Failure of a single HTTP exchange.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to send request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse response as JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body for status errors, otherwise the error text.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// HTTP client for the Suraksha backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    bearer: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, bearer: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer,
        })
    }

    /// Client for the configured backend, authenticated as the given session.
    pub fn from_config(config: &ClientConfig, session: &Session) -> Result<Self, ApiError> {
        Self::new(
            &config.api_url,
            session.bearer().map(str::to_string),
            config.http_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    /// GET request with query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.get(&url).query(query));

        let response = request.send().await.map_err(ApiError::Transport)?;
        read_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));

        let response = request.send().await.map_err(ApiError::Transport)?;
        read_json(response).await
    }

    /// POST a multipart form to an absolute URL outside the backend.
    ///
    /// No `Authorization` header is attached and the content type is left to
    /// reqwest so the multipart boundary is set correctly.
    pub async fn post_form_external(
        &self,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> Result<u16, ApiError> {
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(status.as_u16())
    }

}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(ApiError::Decode)
}

// Re-export the upload flow for convenience.
pub use uploader::SignedUploader;

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server, bearer: Option<&str>) -> ApiClient {
        ApiClient::new(
            &server.url(),
            bearer.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_signed_in() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let body: serde_json::Value = client(&server, Some("secret"))
            .get("/ping", &[("a", "1")])
            .await
            .unwrap();
        assert_eq!(body["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_authorization_header_when_anonymous() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let _: serde_json::Value = client(&server, None)
            .get("/ping", &[] as &[(&str, &str)])
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_error_keeps_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/things")
            .with_status(422)
            .with_body("folder is invalid")
            .create_async()
            .await;

        let err = client(&server, None)
            .post_json::<serde_json::Value, _>("/things", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.detail(), "folder is invalid");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = client(&server, None)
            .get::<serde_json::Value, _>("/ping", &[] as &[(&str, &str)])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_from_config_follows_session() {
        let config = ClientConfig {
            api_url: "http://localhost:3000".to_string(),
            ..ClientConfig::default()
        };

        let anonymous = ApiClient::from_config(&config, &Session::anonymous()).unwrap();
        assert_eq!(anonymous.base_url(), "http://localhost:3000");
        assert!(!anonymous.is_authenticated());

        let signed_in = ApiClient::from_config(&config, &Session::with_token("t")).unwrap();
        assert!(signed_in.is_authenticated());
        assert_eq!(signed_in.build_url("/x"), "http://localhost:3000/x");
    }
}
