use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;
use wq_core::{Article, Error, Result};

use crate::wikipedia::parse_article;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_FETCH_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

// Wikipedia rejects requests without an identifying agent.
const USER_AGENT: &str = concat!("wikiquiz/", env!("CARGO_PKG_VERSION"), " (Wikipedia quiz generator)");

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timeout: Duration,
    /// Extra attempts after a timeout, connection failure or 5xx response
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            retries: DEFAULT_FETCH_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

enum FetchFailure {
    Transient(String),
    Permanent(String),
}

impl FetchFailure {
    fn into_error(self) -> Error {
        match self {
            FetchFailure::Transient(message) | FetchFailure::Permanent(message) => {
                Error::Fetch(message)
            }
        }
    }
}

/// Only absolute http(s) URLs are accepted.
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            url, scheme
        ))),
    }
}

/// Fetches a Wikipedia page and turns it into an [`Article`].
#[derive(Debug, Clone)]
pub struct WikipediaExtractor {
    client: Client,
    config: ExtractorConfig,
}

impl WikipediaExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub async fn extract(&self, url: &str) -> Result<Article> {
        let parsed = validate_url(url)?;
        let html = self.fetch_html(&parsed).await?;
        let article = parse_article(url.trim(), &html)?;
        info!(
            url = %parsed,
            title = %article.title,
            sections = article.sections.len(),
            chars = article.body_text.len(),
            "📰 Extracted article"
        );
        Ok(article)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(html) => return Ok(html),
                Err(FetchFailure::Transient(message)) if attempt <= self.config.retries => {
                    warn!(
                        url = %url,
                        attempt,
                        error = %message,
                        "Fetch failed, retrying {}/{}...",
                        attempt,
                        self.config.retries
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(failure) => return Err(failure.into_error()),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> std::result::Result<String, FetchFailure> {
        debug!(url = %url, "Fetching page");
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Transient(format!("request to {} timed out", url))
            } else if e.is_connect() || e.is_request() {
                FetchFailure::Transient(format!("request to {} failed: {}", url, e))
            } else {
                FetchFailure::Permanent(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("{} returned HTTP {}", url, status);
            return Err(if is_transient_status(status) {
                FetchFailure::Transient(message)
            } else {
                FetchFailure::Permanent(message)
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchFailure::Transient(format!("failed to read body of {}: {}", url, e)))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
