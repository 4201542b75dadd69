use std::time::Duration;

/// Connection settings for the Galaxy server.
#[derive(Debug, Clone)]
pub struct GalaxyConfig {
    /// Base URL, e.g. `https://galaxy.example.org` (no trailing slash).
    pub url: String,
    /// API key sent in the `x-api-key` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Prefix joined with a dataset's bucket path to build the URL Galaxy
    /// fetches the input from. When unset the bucket path is sent as-is.
    pub dataset_base_url: Option<String>,
}

impl GalaxyConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default     |
    /// |---------------------------|-------------|
    /// | `GALAXY_URL`              | (required)  |
    /// | `GALAXY_API_KEY`          | (required)  |
    /// | `GALAXY_TIMEOUT_SECS`     | `30`        |
    /// | `GALAXY_DATASET_BASE_URL` | unset       |
    pub fn from_env() -> Self {
        let url = std::env::var("GALAXY_URL").expect("GALAXY_URL must be set");
        let api_key = std::env::var("GALAXY_API_KEY").expect("GALAXY_API_KEY must be set");

        let timeout_secs: u64 = std::env::var("GALAXY_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("GALAXY_TIMEOUT_SECS must be a valid u64");

        let dataset_base_url = std::env::var("GALAXY_DATASET_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Self::new(url, api_key)
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_dataset_base_url(dataset_base_url)
    }

    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            dataset_base_url: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dataset_base_url(mut self, base: Option<String>) -> Self {
        self.dataset_base_url = base;
        self
    }

    /// URL Galaxy should fetch a dataset from.
    pub fn dataset_url(&self, location: &str) -> String {
        match &self.dataset_base_url {
            Some(base) => format!("{base}/{}", location.trim_start_matches('/')),
            None => location.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_url() {
        let config = GalaxyConfig::new("http://galaxy:8080/", "key");
        assert_eq!(config.url, "http://galaxy:8080");
    }

    #[test]
    fn dataset_url_joins_base_and_location() {
        let config = GalaxyConfig::new("http://galaxy", "key")
            .with_dataset_base_url(Some("https://storage.example/bucket".into()));
        assert_eq!(
            config.dataset_url("/LAS/tree.laz"),
            "https://storage.example/bucket/LAS/tree.laz"
        );
    }

    #[test]
    fn dataset_url_without_base_is_location() {
        let config = GalaxyConfig::new("http://galaxy", "key");
        assert_eq!(config.dataset_url("s3://b/LAS/tree.laz"), "s3://b/LAS/tree.laz");
    }
}
