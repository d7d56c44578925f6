use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CrawlError, Result};
use crate::link::Link;
use crate::state::{CrawlState, LinkRecord};

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What happened to one link.
///
/// None of these are errors: a timed-out or failed download leaves the crawl
/// running. Only exhausting the session timeout budget is fatal, and that is
/// raised as `CrawlError::TooManyTimeouts` by the caller's next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched and written to disk
    Saved(PathBuf),
    /// A file of the link's derived name already exists; nothing was fetched
    AlreadyExists(PathBuf),
    /// The request timed out or the connection failed; counted against the
    /// session budget
    TimedOut,
    /// The server answered with a non-200 status
    HttpError(u16),
}

/// Sequential, timeout-budgeted downloader writing under the crawl cursor.
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, timeout })
    }

    /// Fetch one link into the crawl's current output directory.
    ///
    /// A file of the link's derived name short-circuits to `AlreadyExists`
    /// without touching the network - this filename-keyed skip is the crawl's
    /// resumability mechanism. Transport failures of any kind are recorded
    /// against the timeout budget; once the budget is exhausted every further
    /// call fails with `TooManyTimeouts` before any I/O.
    pub async fn download(&self, state: &mut CrawlState, link: &Link) -> Result<DownloadOutcome> {
        state.ensure_budget()?;

        let name = link.name();
        if name.is_empty() {
            return Err(CrawlError::InvalidArgument(format!(
                "link {} has no file name to save under",
                link.url()
            )));
        }

        let file_path = state.dir().join(&name);
        if file_path.exists() {
            ::log::debug!("already downloaded: {}", file_path.display());
            return Ok(DownloadOutcome::AlreadyExists(file_path));
        }

        let url = link.url().to_string();
        let response = match self.client.get(url.as_str()).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                ::log::warn!("request failed for {url}: {e}");
                state.record_timeout(&url);
                return Ok(DownloadOutcome::TimedOut);
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(DownloadOutcome::HttpError(status));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                ::log::warn!("failed reading body of {url}: {e}");
                state.record_timeout(&url);
                return Ok(DownloadOutcome::TimedOut);
            }
        };

        fs::write(&file_path, &body)?;
        ::log::info!("downloaded {url} to {}", file_path.display());
        Ok(DownloadOutcome::Saved(file_path))
    }

    /// Download each link in order and append a manifest record per success.
    ///
    /// Failures are logged and skipped; only the timeout-budget breach
    /// propagates. An optional fixed delay is honored between downloads.
    pub async fn save_links(
        &self,
        state: &mut CrawlState,
        links: &[Link],
        wait_between: Duration,
    ) -> Result<Vec<LinkRecord>> {
        self.save_links_with_columns(state, links, wait_between, &BTreeMap::new())
            .await
    }

    /// `save_links` with caller-supplied manifest columns, one value per
    /// input link. Values are keyed by the link's input position, so columns
    /// stay aligned even when some downloads fail.
    pub async fn save_links_with_columns(
        &self,
        state: &mut CrawlState,
        links: &[Link],
        wait_between: Duration,
        extra_columns: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<LinkRecord>> {
        for (field, values) in extra_columns {
            if values.len() != links.len() {
                return Err(CrawlError::InvalidArgument(format!(
                    "column {field:?} has {} values for {} links",
                    values.len(),
                    links.len()
                )));
            }
        }

        let crawl_dir = state.crawl_dir_name();
        let mut records = Vec::new();

        for (idx, link) in links.iter().enumerate() {
            let outcome = match self.download(state, link).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Flush what the batch saved so far; files already on
                    // disk would otherwise skip as AlreadyExists on resume
                    // and never reach the manifest.
                    state.append_records(&records)?;
                    return Err(e);
                }
            };
            match outcome {
                DownloadOutcome::Saved(file_path) => {
                    let mut record = LinkRecord::downloaded(link, &crawl_dir, &file_path);
                    for (field, values) in extra_columns {
                        record.extra.insert(field.clone(), values[idx].clone());
                    }
                    records.push(record);
                }
                DownloadOutcome::AlreadyExists(file_path) => {
                    ::log::debug!("skipping existing file {}", file_path.display());
                }
                DownloadOutcome::TimedOut => {
                    ::log::warn!("download timed out: {}", link.url());
                }
                DownloadOutcome::HttpError(code) => {
                    ::log::warn!("download failed: {} {code}", link.text());
                }
            }
            tokio::time::sleep(wait_between).await;
        }

        state.append_records(&records)?;
        Ok(records)
    }
}
