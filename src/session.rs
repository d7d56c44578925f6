use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use url::Url;

use crate::error::{CrawlError, Result};
use crate::extract::PageSnapshot;
use crate::link::Link;
use crate::state::CrawlState;

/// Which element a click should land on.
#[derive(Debug, Clone)]
pub enum ClickTarget {
    /// Anchor with a matching title attribute
    Title(String),
    /// Element with matching link text, falling back to any element with
    /// that exact text
    Text(String),
    /// Element with a matching id
    Id(String),
}

impl fmt::Display for ClickTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickTarget::Title(title) => write!(f, "title='{title}'"),
            ClickTarget::Text(text) => write!(f, "text='{text}'"),
            ClickTarget::Id(id) => write!(f, "id='{id}'"),
        }
    }
}

/// A value to put into a form control.
///
/// The variant carries the capability, so the caller says what kind of
/// control it is addressing instead of the session sniffing tag names.
#[derive(Debug, Clone)]
pub enum FormValue {
    /// Replace the content of a text-like input or textarea
    Text(String),
    /// Choose the option with this value in a select
    Select(String),
    /// Click a radio button
    Radio,
    /// Check or uncheck a checkbox
    Checkbox(bool),
}

/// One live WebDriver browser session.
///
/// Exclusively owned by a crawl and explicitly released with `close`. All
/// operations block the crawl until the browser answers; there is no
/// parallelism across pages.
pub struct Session {
    client: Client,
}

impl Session {
    /// Connect to a running WebDriver server.
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        let client = ClientBuilder::native().connect(webdriver_url).await?;
        ::log::debug!("connected to WebDriver at {webdriver_url}");
        Ok(Self { client })
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        ::log::debug!("navigating to {url}");
        self.client.goto(url).await?;
        Ok(())
    }

    pub async fn back(&self) -> Result<()> {
        self.client.back().await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<Url> {
        Ok(self.client.current_url().await?)
    }

    /// Serialize the current page into a snapshot for extraction.
    pub async fn snapshot(&self) -> Result<PageSnapshot> {
        let url = self.client.current_url().await?;
        let html = self.client.source().await?;
        Ok(PageSnapshot::new(html, Some(url.as_str())))
    }

    /// Click the element the target describes.
    ///
    /// Returns `Ok(true)` on a click, `Ok(false)` when the element is absent
    /// and `ignore_missing` is set, and `NotFound` otherwise.
    pub async fn click(&self, target: &ClickTarget, ignore_missing: bool) -> Result<bool> {
        let element = match target {
            ClickTarget::Title(title) => {
                let css = format!("a[title=\"{title}\"]");
                self.find_optional(Locator::Css(&css)).await?
            }
            ClickTarget::Text(text) => match self.find_optional(Locator::LinkText(text)).await? {
                Some(element) => Some(element),
                None => {
                    let xpath = format!(r#"//*[normalize-space()="{text}"]"#);
                    self.find_optional(Locator::XPath(&xpath)).await?
                }
            },
            ClickTarget::Id(id) => self.find_optional(Locator::Id(id)).await?,
        };

        match element {
            Some(element) => {
                element.click().await?;
                Ok(true)
            }
            None if ignore_missing => Ok(false),
            None => Err(CrawlError::NotFound(target.to_string())),
        }
    }

    /// Click the anchor whose href attribute equals the link's raw href.
    pub async fn click_link(&self, link: &Link) -> Result<()> {
        let css = format!("a[href=\"{}\"]", link.href());
        match self.find_optional(Locator::Css(&css)).await? {
            Some(element) => {
                element.click().await?;
                Ok(())
            }
            None => Err(CrawlError::NotFound(format!("a[href={}]", link.href()))),
        }
    }

    /// Put a value into the form control with the given id.
    ///
    /// Fails with `InvalidArgument` when no element has the id or when the
    /// element's tag cannot take the given kind of value.
    pub async fn fill(&self, id: &str, value: &FormValue) -> Result<()> {
        let element = self
            .find_optional(Locator::Id(id))
            .await?
            .ok_or_else(|| CrawlError::InvalidArgument(format!("no element with id {id:?}")))?;

        let tag = element
            .prop("tagName")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        if !value_applies_to(&tag, value) {
            return Err(CrawlError::InvalidArgument(format!(
                "element {id:?} is a <{tag}> and cannot take this value"
            )));
        }

        match value {
            FormValue::Text(text) => {
                element.clear().await?;
                element.send_keys(text).await?;
            }
            FormValue::Select(option_value) => {
                element.select_by_value(option_value).await?;
            }
            FormValue::Radio => {
                element.click().await?;
            }
            FormValue::Checkbox(desired) => {
                let checked = element
                    .prop("checked")
                    .await?
                    .map(|v| v == "true")
                    .unwrap_or(false);
                if checked != *desired {
                    element.click().await?;
                }
            }
        }
        Ok(())
    }

    /// `(value, label)` pairs of a dropdown's options, selected by the
    /// dropdown's id, its name, or every select on the page.
    pub async fn dropdown_options(
        &self,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<(String, String)>> {
        let css = match (id, name) {
            (Some(id), _) => format!("#{id} > option"),
            (None, Some(name)) => format!("select[name=\"{name}\"] option"),
            (None, None) => "select option".to_string(),
        };

        let options = self.client.find_all(Locator::Css(&css)).await?;
        let mut pairs = Vec::with_capacity(options.len());
        for option in options {
            let value = option.attr("value").await?.unwrap_or_default();
            let label = option.text().await?;
            pairs.push((value, label));
        }
        Ok(pairs)
    }

    /// Text of the element with the given id or class; `Ok(None)` when no
    /// such element exists.
    pub async fn text_of(&self, id: Option<&str>, class: Option<&str>) -> Result<Option<String>> {
        let css = match (id, class) {
            (Some(id), _) => format!("#{id}"),
            (None, Some(class)) => format!(".{class}"),
            (None, None) => {
                return Err(CrawlError::InvalidArgument(
                    "either an id or a class is required".to_string(),
                ));
            }
        };

        match self.find_optional(Locator::Css(&css)).await? {
            Some(element) => Ok(Some(element.text().await?)),
            None => Ok(None),
        }
    }

    /// Capture a PNG screenshot into the crawl's current output directory.
    pub async fn save_screenshot(&self, state: &CrawlState, name: &str) -> Result<PathBuf> {
        let png = self.client.screenshot().await?;
        let file_path = state.dir().join(format!("{name}.png"));
        fs::write(&file_path, &png)?;
        state.log(&format!("Saved screenshot as {}", file_path.display()))?;
        Ok(file_path)
    }

    /// Write the current page's HTML into the crawl's current output
    /// directory.
    pub async fn save_html(&self, state: &CrawlState, name: &str) -> Result<PathBuf> {
        let html = self.client.source().await?;
        let file_path = state.dir().join(name);
        fs::write(&file_path, html)?;
        state.log(&format!("Saved HTML as {}", file_path.display()))?;
        Ok(file_path)
    }

    /// Block for the given duration.
    pub async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Release the browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }

    async fn find_optional(&self, locator: Locator<'_>) -> Result<Option<Element>> {
        match self.client.find(locator).await {
            Ok(element) => Ok(Some(element)),
            // "No such element" arrives as a standard WebDriver error
            // payload, not a dedicated CmdError variant
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether a form control with this tag can take the given value.
fn value_applies_to(tag: &str, value: &FormValue) -> bool {
    match value {
        FormValue::Text(_) => matches!(tag, "input" | "textarea"),
        FormValue::Select(_) => tag == "select",
        FormValue::Radio | FormValue::Checkbox(_) => tag == "input",
    }
}
