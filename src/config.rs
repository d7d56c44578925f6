use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Configuration for one crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL to start crawling from
    pub start_url: String,

    /// Directory the crawl writes logs, manifests and downloads into
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Per-download timeout in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Fixed delay between downloads in seconds
    #[serde(default)]
    pub wait_secs: u64,

    /// Full-match pattern for anchor display text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_pattern: Option<String>,

    /// Search-match pattern for anchor hrefs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,

    /// Full-match pattern for anchor class tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_pattern: Option<String>,

    /// Download matching links instead of only recording them
    #[serde(default)]
    pub download: bool,
}

impl CrawlConfig {
    /// Create a configuration with default values.
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            output_dir: default_output_dir(),
            webdriver_url: default_webdriver_url(),
            download_timeout_secs: default_download_timeout_secs(),
            wait_secs: 0,
            text_pattern: None,
            url_pattern: None,
            class_pattern: None,
            download: false,
        }
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// The WebDriver URL, honoring a `WEBDRIVER_URL` environment override.
    pub fn effective_webdriver_url(&self) -> String {
        match std::env::var("WEBDRIVER_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => self.webdriver_url.clone(),
        }
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn wait_between(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

/// Default value for output_dir
fn default_output_dir() -> String {
    "crawl_output".to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default per-download timeout in seconds
fn default_download_timeout_secs() -> u64 {
    10
}
