//! Configuration module
//!
//! Client configuration is read from the environment (and an optional `.env`
//! file): backend API URL, public storage host, HTTP timeout, upload size cap
//! and where the access token comes from.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::public_url::{PublicUrlResolver, DEFAULT_STORAGE_BASE_URL};

// Common constants
const DEFAULT_API_URL: &str = "https://api.suraksha.lk";
const HTTP_TIMEOUT_SECS: u64 = 60;
const MAX_UPLOAD_MB: u64 = 10;

/// Upload client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage_base_url: String,
    pub http_timeout_secs: u64,
    pub max_upload_bytes: u64,
    /// Token given directly (takes precedence over the token file)
    pub access_token: Option<String>,
    /// JSON file the session token is persisted in
    pub token_file: Option<PathBuf>,
    pub environment: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let api_url = non_empty("SURAKSHA_API_URL")
            .or_else(|| non_empty("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let storage_base_url = non_empty("SURAKSHA_STORAGE_URL")
            .unwrap_or_else(|| DEFAULT_STORAGE_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let max_upload_mb: u64 = non_empty("SURAKSHA_MAX_UPLOAD_MB")
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_UPLOAD_MB);

        let token_file = non_empty("SURAKSHA_TOKEN_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("suraksha").join("token.json")));

        let config = ClientConfig {
            api_url,
            storage_base_url,
            http_timeout_secs: non_empty("SURAKSHA_HTTP_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(HTTP_TIMEOUT_SECS),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            access_token: non_empty("SURAKSHA_ACCESS_TOKEN"),
            token_file,
            environment: non_empty("ENVIRONMENT")
                .or_else(|| non_empty("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the client is running against production
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn public_url_resolver(&self) -> PublicUrlResolver {
        PublicUrlResolver::new(self.storage_base_url.clone())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, url) in [
            ("SURAKSHA_API_URL", &self.api_url),
            ("SURAKSHA_STORAGE_URL", &self.storage_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "{} must start with http:// or https:// (got {})",
                    name,
                    url
                ));
            }
        }

        if self.is_production() && self.api_url.starts_with("http://") {
            return Err(anyhow::anyhow!(
                "SURAKSHA_API_URL must use https:// in production"
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "SURAKSHA_HTTP_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!(
                "SURAKSHA_MAX_UPLOAD_MB must be greater than 0"
            ));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_url: DEFAULT_API_URL.to_string(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            max_upload_bytes: MAX_UPLOAD_MB * 1024 * 1024,
            access_token: None,
            token_file: None,
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, "https://api.suraksha.lk");
        assert_eq!(config.storage_base_url, "https://storage.suraksha.lk");
        assert_eq!(config.http_timeout(), Duration::from_secs(60));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.access_token, None);
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("API_URL", "http://localhost:8080/"),
            ("SURAKSHA_STORAGE_URL", "http://localhost:9000/bucket/"),
            ("SURAKSHA_MAX_UPLOAD_MB", "25"),
            ("SURAKSHA_HTTP_TIMEOUT_SECS", "not-a-number"),
            ("SURAKSHA_ACCESS_TOKEN", "tok"),
            ("SURAKSHA_TOKEN_FILE", "/tmp/suraksha-token.json"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.storage_base_url, "http://localhost:9000/bucket");
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(config.http_timeout_secs, HTTP_TIMEOUT_SECS);
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert_eq!(
            config.token_file,
            Some(PathBuf::from("/tmp/suraksha-token.json"))
        );
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config =
            ClientConfig::from_lookup(lookup(&[("SURAKSHA_ACCESS_TOKEN", "  ")])).unwrap();
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn test_validation_rejects_bad_urls() {
        let result = ClientConfig::from_lookup(lookup(&[("SURAKSHA_API_URL", "api.suraksha.lk")]));
        assert!(result.is_err());

        let result = ClientConfig::from_lookup(lookup(&[
            ("SURAKSHA_API_URL", "http://api.suraksha.lk"),
            ("ENVIRONMENT", "production"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        assert!(
            ClientConfig::from_lookup(lookup(&[("SURAKSHA_HTTP_TIMEOUT_SECS", "0")])).is_err()
        );
        assert!(ClientConfig::from_lookup(lookup(&[("SURAKSHA_MAX_UPLOAD_MB", "0")])).is_err());
    }

    #[test]
    fn test_resolver_uses_storage_host() {
        let config = ClientConfig::default();
        assert_eq!(
            config.public_url_resolver().resolve("a/b.png"),
            "https://storage.suraksha.lk/a/b.png"
        );
    }
}
