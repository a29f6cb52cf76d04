use std::time::Duration;

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid search URL '{url}': {source}")]
    InvalidSearchUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Search URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("Feedback URL must be a mailto: link, got '{0}'")]
    InvalidFeedbackUrl(String),
    #[error("Timeout must be greater than 0")]
    ZeroTimeout,
}

/// Override points for the portal constants and the HTTP client.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Search initialization page. Also used as the `info_url` of every record,
    /// since the portal has no stable per-application link.
    pub search_url: String,
    /// `mailto:` target for public comments.
    pub feedback_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_url: crate::SEARCH_URL.to_string(),
            feedback_url: crate::FEEDBACK_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl ScraperConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        let url = Url::parse(&self.search_url).map_err(|source| ConfigError::InvalidSearchUrl {
            url: self.search_url.clone(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(self.search_url));
        }
        let has_address = self
            .feedback_url
            .strip_prefix("mailto:")
            .is_some_and(|address| address.contains('@'));
        if !has_address {
            return Err(ConfigError::InvalidFeedbackUrl(self.feedback_url));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }

    pub(crate) fn parsed_search_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.search_url)
    }
}
