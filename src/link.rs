use std::sync::OnceLock;
use url::Url;

/// An anchor discovered on a page: the raw href as authored, the display
/// text, and optionally the URL of the page it was found on.
///
/// The absolute URL is derived lazily by joining the href onto the base URL
/// (RFC 3986 relative-reference resolution) and cached on first use, so
/// resolving an already-resolved link is idempotent.
#[derive(Debug, Clone)]
pub struct Link {
    href: String,
    text: String,
    base_url: Option<Url>,
    resolved: OnceLock<String>,
}

impl Link {
    /// Create a link with no base; `url()` returns the href unchanged.
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
            base_url: None,
            resolved: OnceLock::new(),
        }
    }

    /// Create a link resolved against the URL of the page it came from.
    ///
    /// The base is kept only when `page_url` is an absolute http(s) URL;
    /// anything else (file paths, about:blank, unparsable strings) leaves the
    /// href unresolved.
    pub fn with_base(href: impl Into<String>, text: impl Into<String>, page_url: &str) -> Self {
        let base_url = Url::parse(page_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"));
        Self {
            href: href.into(),
            text: text.into(),
            base_url,
            resolved: OnceLock::new(),
        }
    }

    /// The href exactly as authored in the document.
    pub fn href(&self) -> &str {
        &self.href
    }

    /// The anchor's display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The absolute URL, resolving the href against the base on first call.
    ///
    /// An href the base cannot absorb falls back to the raw href; the source
    /// never validated hrefs and callers depend on always getting a string.
    pub fn url(&self) -> &str {
        self.resolved.get_or_init(|| match &self.base_url {
            Some(base) => base
                .join(&self.href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| self.href.clone()),
            None => self.href.clone(),
        })
    }

    /// Override the resolved URL, replacing any cached value.
    pub fn set_url(&mut self, new_url: impl Into<String>) {
        let cell = OnceLock::new();
        let _ = cell.set(new_url.into());
        self.resolved = cell;
    }

    /// Final segment of the URL path, e.g. `report.pdf`.
    pub fn name(&self) -> String {
        let path = url_path(self.url());
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string()
    }

    /// Suffix of the URL path including the dot, e.g. `.pdf`; empty when the
    /// final segment has none.
    pub fn extension(&self) -> String {
        let name = self.name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => name[idx..].to_string(),
            _ => String::new(),
        }
    }

    /// True when the URL path ends in `.pdf`, case-insensitively.
    pub fn is_pdf(&self) -> bool {
        self.extension().eq_ignore_ascii_case(".pdf")
    }

    /// True when the href has neither a scheme nor a network location.
    pub fn is_relative(&self) -> bool {
        if self.href.starts_with("//") {
            return false;
        }
        matches!(
            Url::parse(&self.href),
            Err(url::ParseError::RelativeUrlWithoutBase)
        )
    }

    /// Directory portion of the URL path, without a leading slash.
    pub fn directory(&self) -> String {
        let path = url_path(self.url());
        match path.rfind('/') {
            Some(idx) => path[..idx].trim_start_matches('/').to_string(),
            None => String::new(),
        }
    }
}

/// Path component of a URL string, tolerating relative references.
fn url_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        // Relative reference: strip query and fragment by hand
        Err(_) => {
            let end = raw.find(['?', '#']).unwrap_or(raw.len());
            raw[..end].to_string()
        }
    }
}
