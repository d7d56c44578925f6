use thiserror::Error;

/// Errors raised by crawl operations.
///
/// Per-link download failures (timeouts, non-200 responses) are reported as
/// `DownloadOutcome` values rather than errors; only the session-wide timeout
/// budget breach escalates to `TooManyTimeouts`.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A requested single element (by id/title/text) does not exist
    #[error("element not found: {0}")]
    NotFound(String),

    /// More than one table matched the given criteria
    #[error("{count} tables matched the given criteria, expected at most one")]
    AmbiguousTable { count: usize },

    /// A required selector was missing or a value cannot apply to the element
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The session-wide download timeout budget is exhausted
    #[error("too many download timeouts ({})", .urls.len())]
    TooManyTimeouts { urls: Vec<String> },

    /// A WebDriver command failed
    #[error("webdriver command failed: {0}")]
    Session(#[from] fantoccini::error::CmdError),

    /// A WebDriver session could not be established
    #[error("failed to establish webdriver session: {0}")]
    Connect(#[from] fantoccini::error::NewSessionError),

    /// The download client could not be built. Per-request failures are
    /// reported as `DownloadOutcome` values instead.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A filter pattern failed to compile
    #[error("invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A manifest or config record failed to (de)serialize
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
