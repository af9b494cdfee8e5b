// src/marketscreener/client.rs
use crate::utils::error::ReaderError;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

pub const DEFAULT_BASE_URL: &str = "https://www.marketscreener.com";

/// Environment override for the base URL (mirrors or test servers).
pub const BASE_URL_ENV: &str = "FINANCE_READER_BASE_URL";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Header bundle attached to every request. Built once per process.
pub static DEFAULT_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
});

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub base_url: String,
    pub headers: HeaderMap,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: DEFAULT_HEADERS.clone(),
        }
    }
}

impl ReaderConfig {
    /// Default configuration with the base URL taken from `FINANCE_READER_BASE_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            tracing::debug!("Using base URL {} from {}", base_url, BASE_URL_ENV);
            config.base_url = base_url;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Joins a site-relative link onto the base URL.
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), href.trim_start_matches('/'))
    }
}

/// Something that can fetch a page body for a URL.
pub trait PageSource {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ReaderError>;
}

/// Blocking HTTP page source.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    /// Creates a client carrying the configured header bundle.
    pub fn new(config: &ReaderConfig) -> Result<Self, ReaderError> {
        let client = reqwest::blocking::Client::builder()
            .default_headers(config.headers.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl HttpSource {
    fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::blocking::Response, ReaderError> {
        tracing::info!("Fetching {}", url);
        if !query.is_empty() {
            tracing::debug!("Query parameters: {:?}", query);
        }

        let response = self.client.get(url).query(query).send()?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            return Err(ReaderError::Http(status));
        }
        Ok(response)
    }
}

impl PageSource for HttpSource {
    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ReaderError> {
        let body = self.send(url, query)?.text()?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Something that can download a binary file (spreadsheets) for a URL.
pub trait FileSource {
    fn download(&self, url: &str) -> Result<Vec<u8>, ReaderError>;
}

impl FileSource for HttpSource {
    fn download(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        let body = self.send(url, &[])?.bytes()?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}
