use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};
use crate::link::Link;

/// Name of the zero-byte marker signalling a directory's crawl is finished.
pub const DONE_MARKER: &str = ".done";

/// Downloads refused once more than this many timeouts are recorded.
pub const TIMEOUT_BUDGET: usize = 5;

const LOG_FILE: &str = "log.txt";
const MANIFEST_FILE: &str = "urls.jsonl";

/// One manifest entry. Discovery-only entries carry just the url, text and
/// crawl directory; download entries add the timestamp and file path.
///
/// Appended to the manifest one JSON object per line, so every append is a
/// self-contained fragment and a crash never leaves a half-open container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,

    /// Display text with newlines replaced by spaces
    pub text: String,

    /// Name of the cursor directory at the time of the append
    pub crawl_dir: String,

    /// ISO-8601 download timestamp; absent for discovery-only entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    /// Caller-supplied extra columns, flattened into the record
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, String>,
}

impl LinkRecord {
    /// Discovery-only record for a link that was seen but not fetched.
    pub fn discovered(link: &Link, crawl_dir: &str) -> Self {
        Self {
            url: link.url().to_string(),
            text: link.text().replace('\n', " "),
            crawl_dir: crawl_dir.to_string(),
            download_time: None,
            file_path: None,
            extra: BTreeMap::new(),
        }
    }

    /// Record for a completed download.
    pub fn downloaded(link: &Link, crawl_dir: &str, file_path: &Path) -> Self {
        Self {
            url: link.url().to_string(),
            text: link.text().replace('\n', " "),
            crawl_dir: crawl_dir.to_string(),
            download_time: Some(chrono::Local::now().to_rfc3339()),
            file_path: Some(file_path.display().to_string()),
            extra: BTreeMap::new(),
        }
    }
}

/// On-disk bookkeeping for one crawl: the output-directory cursor, the log
/// and manifest files, and the session-wide download timeout budget.
///
/// The cursor descends and ascends as the crawl walks a site's logical
/// hierarchy; the log and manifest stay fixed at the root. Nothing here is
/// ever deleted - cleanup belongs to the caller.
#[derive(Debug)]
pub struct CrawlState {
    root: PathBuf,
    cursor: PathBuf,
    log_file: PathBuf,
    manifest_file: PathBuf,
    timeout_urls: Vec<String>,
}

impl CrawlState {
    /// Open (creating if absent) a crawl rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let log_file = root.join(LOG_FILE);
        let manifest_file = root.join(MANIFEST_FILE);
        Ok(Self {
            cursor: root.clone(),
            root,
            log_file,
            manifest_file,
            timeout_urls: Vec::new(),
        })
    }

    /// Current position of the output-directory cursor.
    pub fn dir(&self) -> &Path {
        &self.cursor
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the cursor directory, as recorded in manifest entries.
    pub fn crawl_dir_name(&self) -> String {
        self.cursor
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Append a timestamped line to the crawl log.
    pub fn log(&self, message: &str) -> Result<()> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(log, "{stamp} - {message}")?;
        Ok(())
    }

    /// Move the cursor into a child directory, creating it if absent.
    /// Re-descending into an existing directory is not an error.
    pub fn descend(&mut self, subdirectory: &str) -> Result<()> {
        self.cursor = self.cursor.join(subdirectory);
        fs::create_dir_all(&self.cursor)?;
        self.log(&format!("Changed output directory to {}", self.cursor.display()))?;
        Ok(())
    }

    /// Move the cursor to the parent directory, optionally touching the
    /// completion marker first.
    pub fn ascend(&mut self, mark_complete: bool) -> Result<()> {
        if mark_complete {
            File::create(self.cursor.join(DONE_MARKER))?;
        }
        self.cursor.pop();
        self.log(&format!("Changed output directory to {}", self.cursor.display()))?;
        Ok(())
    }

    /// True when the cursor directory carries the completion marker.
    pub fn is_complete(&self) -> bool {
        self.cursor.join(DONE_MARKER).exists()
    }

    /// Record one download timeout against the session budget.
    pub fn record_timeout(&mut self, url: &str) {
        self.timeout_urls.push(url.to_string());
    }

    pub fn timeout_count(&self) -> usize {
        self.timeout_urls.len()
    }

    pub fn timeout_urls(&self) -> &[String] {
        &self.timeout_urls
    }

    /// Fails once the recorded timeout count exceeds the budget. Fatal for
    /// the session: there is no recovery path.
    pub fn ensure_budget(&self) -> Result<()> {
        if self.timeout_urls.len() > TIMEOUT_BUDGET {
            return Err(CrawlError::TooManyTimeouts {
                urls: self.timeout_urls.clone(),
            });
        }
        Ok(())
    }

    /// Append records to the manifest, one JSON line each.
    pub fn append_records(&self, records: &[LinkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut manifest = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.manifest_file)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(manifest, "{line}")?;
        }
        Ok(())
    }

    /// Append discovery-only entries for links without downloading them.
    pub fn write_links(&self, links: &[Link]) -> Result<()> {
        let crawl_dir = self.crawl_dir_name();
        let records: Vec<LinkRecord> = links
            .iter()
            .map(|link| LinkRecord::discovered(link, &crawl_dir))
            .collect();
        self.append_records(&records)
    }

    pub fn manifest_file(&self) -> &Path {
        &self.manifest_file
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn open_creates_root_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("crawl");
        let state = CrawlState::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(state.dir(), root);
    }

    #[test]
    fn descend_creates_and_ascend_returns() {
        let dir = tempdir().unwrap();
        let mut state = CrawlState::open(dir.path().join("crawl")).unwrap();
        state.descend("subdir").unwrap();
        assert!(dir.path().join("crawl/subdir").is_dir());
        assert_eq!(state.crawl_dir_name(), "subdir");

        // Idempotent
        state.ascend(false).unwrap();
        state.descend("subdir").unwrap();

        state.ascend(false).unwrap();
        assert_eq!(state.dir(), dir.path().join("crawl"));
    }

    #[test]
    fn ascend_with_mark_writes_done_marker() {
        let dir = tempdir().unwrap();
        let mut state = CrawlState::open(dir.path().join("crawl")).unwrap();

        state.descend("a").unwrap();
        state.ascend(true).unwrap();
        assert!(dir.path().join("crawl/a/.done").exists());

        state.descend("a").unwrap();
        assert!(state.is_complete());
        state.ascend(false).unwrap();

        state.descend("b").unwrap();
        assert!(!state.is_complete());
        state.ascend(false).unwrap();
        assert!(!dir.path().join("crawl/b/.done").exists());
    }

    #[test]
    fn log_lines_are_timestamped() {
        let dir = tempdir().unwrap();
        let state = CrawlState::open(dir.path().join("crawl")).unwrap();
        state.log("Started crawling at https://example.com").unwrap();
        state.log("Clicked on link").unwrap();

        let contents = fs::read_to_string(state.log_file()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let re = regex::Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} - ").unwrap();
        assert!(re.is_match(lines[0]), "{}", lines[0]);
        assert!(lines[1].ends_with("Clicked on link"));
    }

    #[test]
    fn budget_allows_up_to_five_timeouts() {
        let dir = tempdir().unwrap();
        let mut state = CrawlState::open(dir.path().join("crawl")).unwrap();
        for i in 0..5 {
            state.record_timeout(&format!("https://example.com/{i}"));
        }
        assert!(state.ensure_budget().is_ok());

        state.record_timeout("https://example.com/5");
        let err = state.ensure_budget().unwrap_err();
        match err {
            CrawlError::TooManyTimeouts { urls } => assert_eq!(urls.len(), 6),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(state.timeout_count(), state.timeout_urls().len());
    }

    #[test]
    fn write_links_appends_discovery_records() {
        let dir = tempdir().unwrap();
        let state = CrawlState::open(dir.path().join("crawl")).unwrap();
        let links = vec![Link::new("https://example.com/file1.pdf", "Download\nfile 1")];
        state.write_links(&links).unwrap();

        let contents = fs::read_to_string(state.manifest_file()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let record: LinkRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record.url, "https://example.com/file1.pdf");
        assert_eq!(record.text, "Download file 1");
        assert_eq!(record.crawl_dir, "crawl");
        assert!(record.download_time.is_none());
        assert!(record.file_path.is_none());
    }

    #[test]
    fn download_records_carry_timestamp_and_path() {
        let link = Link::new("https://example.com/file1.pdf", "File 1");
        let record = LinkRecord::downloaded(&link, "crawl", Path::new("crawl/file1.pdf"));
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(json["url"], "https://example.com/file1.pdf");
        assert_eq!(json["file_path"], "crawl/file1.pdf");
        assert!(json["download_time"].is_string());
    }

    #[test]
    fn manifest_appends_accumulate() {
        let dir = tempdir().unwrap();
        let state = CrawlState::open(dir.path().join("crawl")).unwrap();
        let links = vec![Link::new("https://example.com/a.pdf", "a")];
        state.write_links(&links).unwrap();
        state.write_links(&links).unwrap();

        let contents = fs::read_to_string(state.manifest_file()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
