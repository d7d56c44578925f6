//! Browser-driven crawling toolkit: navigate pages through a WebDriver
//! session, extract links and tables by regex filters, click and fill
//! elements, and persist crawl results (downloads, manifests, logs,
//! screenshots) to a directory tree.
//!
//! The caller drives the crawl page by page; nothing here schedules work
//! on its own.

// Re-export modules
pub mod config;
pub mod crawler;
pub mod download;
pub mod error;
pub mod extract;
pub mod link;
pub mod session;
pub mod state;
pub mod table;

// Re-export commonly used types for convenience
pub use crawler::Crawler;
pub use download::{DownloadOutcome, Downloader};
pub use error::{CrawlError, Result};
pub use extract::{ElementFilter, LinkFilter, PageSnapshot, TableFilter};
pub use link::Link;
pub use session::{ClickTarget, FormValue, Session};
pub use state::{CrawlState, LinkRecord};
pub use table::Table;
