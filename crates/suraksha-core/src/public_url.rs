//! Maps backend relative paths to publicly servable URLs.

/// Default public storage host.
pub const DEFAULT_STORAGE_BASE_URL: &str = "https://storage.suraksha.lk";

/// Resolves `relativePath` values against a fixed storage host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrlResolver {
    host: String,
}

impl PublicUrlResolver {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `{host}/{relative_path}`
    pub fn resolve(&self, relative_path: &str) -> String {
        format!("{}/{}", self.host, relative_path)
    }
}

impl Default for PublicUrlResolver {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_concatenates_host_and_path() {
        let resolver = PublicUrlResolver::default();
        assert_eq!(
            resolver.resolve("institute-images/abc-logo.png"),
            "https://storage.suraksha.lk/institute-images/abc-logo.png"
        );
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = PublicUrlResolver::new("https://cdn.example.com");
        let first = resolver.resolve("class-images/x.jpg");
        let second = resolver.resolve("class-images/x.jpg");
        assert_eq!(first, second);
    }

    #[test]
    fn test_trailing_slash_on_host_is_trimmed() {
        let resolver = PublicUrlResolver::new("https://storage.suraksha.lk/");
        assert_eq!(resolver.host(), "https://storage.suraksha.lk");
        assert_eq!(
            resolver.resolve("profile-images/u.png"),
            "https://storage.suraksha.lk/profile-images/u.png"
        );
    }
}
