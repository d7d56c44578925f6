use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::download::Downloader;
use crate::error::Result;
use crate::extract::{self, ElementFilter, LinkFilter, PageSnapshot, TableFilter};
use crate::link::Link;
use crate::session::{ClickTarget, FormValue, Session};
use crate::state::{CrawlState, LinkRecord};
use crate::table::Table;

/// One browser-driven crawl: a live session, the on-disk crawl state, and a
/// downloader sharing the state's timeout budget.
///
/// The crawler sequences nothing on its own - the caller drives it page by
/// page, which keeps every operation explicit and every interaction strictly
/// sequential.
pub struct Crawler {
    session: Session,
    state: CrawlState,
    downloader: Downloader,
}

impl Crawler {
    /// Connect to the WebDriver server, navigate to the start URL, and open
    /// the output directory.
    pub async fn start(
        webdriver_url: &str,
        start_url: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let session = Session::connect(webdriver_url).await?;
        session.goto(start_url).await?;
        let state = CrawlState::open(output_dir)?;
        state.log(&format!("Started crawling at {start_url}"))?;
        ::log::info!("started crawling at {start_url}");
        Ok(Self {
            session,
            state,
            downloader: Downloader::new()?,
        })
    }

    /// Replace the default downloader, e.g. to change the request timeout.
    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub async fn current_url(&self) -> Result<Url> {
        self.session.current_url().await
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.state.log(&format!("Navigating to {url}"))?;
        self.session.goto(url).await
    }

    pub async fn go_back(&self) -> Result<()> {
        self.session.back().await
    }

    /// Snapshot the current page for extraction.
    pub async fn snapshot(&self) -> Result<PageSnapshot> {
        self.session.snapshot().await
    }

    /// Links on the current page passing the filter.
    pub async fn links(&self, filter: &LinkFilter) -> Result<Vec<Link>> {
        let snapshot = self.snapshot().await?;
        Ok(extract::find_links(&snapshot, filter))
    }

    /// Tables on the current page passing the filter.
    pub async fn tables(&self, filter: &TableFilter) -> Result<Vec<Table>> {
        let snapshot = self.snapshot().await?;
        Ok(extract::find_tables(&snapshot, filter))
    }

    /// Anchors of the single table matching the filter.
    pub async fn table_links(&self, filter: &TableFilter) -> Result<Vec<Link>> {
        let snapshot = self.snapshot().await?;
        extract::find_table_links(&snapshot, filter)
    }

    /// True when at least one `tag` element passes the filter.
    pub async fn has_element(&self, tag: &str, filter: &ElementFilter) -> Result<bool> {
        let snapshot = self.snapshot().await?;
        extract::has_element(&snapshot, tag, filter)
    }

    /// Click the described element, logging the action.
    pub async fn click(&self, target: &ClickTarget, ignore_missing: bool) -> Result<bool> {
        let clicked = self.session.click(target, ignore_missing).await?;
        if clicked {
            self.state.log(&format!("Clicked on link with {target}"))?;
        } else {
            self.state.log(&format!("Click target {target} not found"))?;
        }
        Ok(clicked)
    }

    /// Click a previously extracted link and wait for the page to settle.
    pub async fn click_link(&self, link: &Link, wait: Duration) -> Result<()> {
        self.session.click_link(link).await?;
        self.state.log(&format!("Clicked on link {}", link.url()))?;
        self.session.wait(wait).await;
        Ok(())
    }

    /// Put a value into the form control with the given id.
    pub async fn fill(&self, id: &str, value: &FormValue) -> Result<()> {
        self.session.fill(id, value).await
    }

    pub async fn dropdown_options(
        &self,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        self.session.dropdown_options(id, name).await
    }

    pub async fn text_of(&self, id: Option<&str>, class: Option<&str>) -> Result<Option<String>> {
        self.session.text_of(id, class).await
    }

    /// Move the output-directory cursor into a child directory.
    pub fn descend(&mut self, subdirectory: &str) -> Result<()> {
        self.state.descend(subdirectory)
    }

    /// Move the output-directory cursor up, optionally marking the directory
    /// complete first.
    pub fn ascend(&mut self, mark_complete: bool) -> Result<()> {
        self.state.ascend(mark_complete)
    }

    /// True when the cursor directory finished in an earlier crawl.
    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    /// Download the links into the cursor directory and record each success
    /// in the manifest.
    pub async fn save_links(
        &mut self,
        links: &[Link],
        wait_between: Duration,
    ) -> Result<Vec<LinkRecord>> {
        self.downloader
            .save_links(&mut self.state, links, wait_between)
            .await
    }

    /// Record the links in the manifest without downloading.
    pub fn write_links(&self, links: &[Link]) -> Result<()> {
        self.state.write_links(links)
    }

    pub async fn save_screenshot(&self, name: &str) -> Result<PathBuf> {
        self.session.save_screenshot(&self.state, name).await
    }

    pub async fn save_html(&self, name: &str) -> Result<PathBuf> {
        self.session.save_html(&self.state, name).await
    }

    pub async fn wait(&self, duration: Duration) {
        self.session.wait(duration).await;
    }

    /// Release the browser session. The output directory is left as-is.
    pub async fn close(self) -> Result<()> {
        self.session.close().await
    }
}
