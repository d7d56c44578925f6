use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{CrawlError, Result};
use crate::link::Link;
use crate::table::Table;

/// A parsed-ready view of one page: the serialized HTML plus the page's own
/// URL for resolving relative hrefs.
///
/// Snapshots come from a live `Session` or from any fetched HTML string, so
/// extraction works identically for browser-driven and static crawls.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    html: String,
    base: Option<Url>,
}

impl PageSnapshot {
    /// Build a snapshot from raw HTML and the URL it was served from.
    ///
    /// Only absolute http(s) page URLs are kept as a resolution base.
    pub fn new(html: impl Into<String>, page_url: Option<&str>) -> Self {
        let base = page_url
            .and_then(|u| Url::parse(u).ok())
            .filter(|u| matches!(u.scheme(), "http" | "https"));
        Self {
            html: html.into(),
            base,
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    fn build_link(&self, href: &str, text: String) -> Link {
        match &self.base {
            Some(base) => Link::with_base(href, text, base.as_str()),
            None => Link::new(href, text),
        }
    }
}

/// Anchor filter: zero or more independent regex predicates composed as AND.
///
/// Display text and class tokens are full-matched, hrefs are search-matched.
#[derive(Debug, Default)]
pub struct LinkFilter {
    text: Option<Regex>,
    url: Option<Regex>,
    class: Option<Regex>,
}

impl LinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-match pattern for the anchor's display text.
    pub fn text(mut self, pattern: &str) -> Result<Self> {
        self.text = Some(anchored(pattern)?);
        Ok(self)
    }

    /// Search-match pattern for the anchor's href.
    pub fn url(mut self, pattern: &str) -> Result<Self> {
        self.url = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Full-match pattern for any one of the anchor's class tokens.
    pub fn class(mut self, pattern: &str) -> Result<Self> {
        self.class = Some(anchored(pattern)?);
        Ok(self)
    }

    fn accepts(&self, element: &ElementRef<'_>, href: &str) -> bool {
        if let Some(re) = &self.text {
            if !re.is_match(&element_text(element)) {
                return false;
            }
        }
        if let Some(re) = &self.url {
            if !re.is_match(href) {
                return false;
            }
        }
        if let Some(re) = &self.class {
            if !any_class_token_matches(element, re) {
                return false;
            }
        }
        true
    }
}

/// Table filter: one criterion applies at a time, id taking precedence over
/// class, class over caption. No criterion selects every table.
#[derive(Debug, Default)]
pub struct TableFilter {
    id: Option<Regex>,
    class: Option<Regex>,
    caption: Option<Regex>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, pattern: &str) -> Result<Self> {
        self.id = Some(anchored(pattern)?);
        Ok(self)
    }

    pub fn class(mut self, pattern: &str) -> Result<Self> {
        self.class = Some(anchored(pattern)?);
        Ok(self)
    }

    pub fn caption(mut self, pattern: &str) -> Result<Self> {
        self.caption = Some(anchored(pattern)?);
        Ok(self)
    }

    fn accepts(&self, table: &ElementRef<'_>) -> bool {
        if let Some(re) = &self.id {
            let id = table.value().attr("id").unwrap_or("");
            return re.is_match(id);
        }
        if let Some(re) = &self.class {
            return any_class_token_matches(table, re);
        }
        if let Some(re) = &self.caption {
            let caption_selector = Selector::parse("caption").unwrap();
            return table
                .select(&caption_selector)
                .any(|c| re.is_match(&element_text(&c)));
        }
        true
    }
}

/// Existence-probe filter for `has_element`: id, class token, or text, full
/// matched, one criterion at a time.
#[derive(Debug, Default)]
pub struct ElementFilter {
    id: Option<Regex>,
    class: Option<Regex>,
    text: Option<Regex>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, pattern: &str) -> Result<Self> {
        self.id = Some(anchored(pattern)?);
        Ok(self)
    }

    pub fn class(mut self, pattern: &str) -> Result<Self> {
        self.class = Some(anchored(pattern)?);
        Ok(self)
    }

    pub fn text(mut self, pattern: &str) -> Result<Self> {
        self.text = Some(anchored(pattern)?);
        Ok(self)
    }

    fn accepts(&self, element: &ElementRef<'_>) -> bool {
        if let Some(re) = &self.id {
            return re.is_match(element.value().attr("id").unwrap_or(""));
        }
        if let Some(re) = &self.class {
            return any_class_token_matches(element, re);
        }
        if let Some(re) = &self.text {
            return re.is_match(&element_text(element));
        }
        true
    }
}

/// All anchors accepted by the filter, in document order. Anchors without an
/// href attribute are skipped.
pub fn find_links(snapshot: &PageSnapshot, filter: &LinkFilter) -> Vec<Link> {
    let document = snapshot.document();
    let anchor_selector = Selector::parse("a").unwrap();

    let links: Vec<Link> = document
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href").map(|href| (a, href)))
        .filter(|(a, href)| filter.accepts(a, href))
        .map(|(a, href)| snapshot.build_link(href, element_text(&a)))
        .collect();

    ::log::debug!("found {} matching links", links.len());
    links
}

/// All tables accepted by the filter, fully parsed.
pub fn find_tables(snapshot: &PageSnapshot, filter: &TableFilter) -> Vec<Table> {
    let document = snapshot.document();
    select_tables(&document, filter)
        .into_iter()
        .map(|t| build_table(snapshot, &t))
        .collect()
}

/// Anchors of the single table matching the filter, in row-then-cell document
/// order.
///
/// Zero matching tables yields an empty list; more than one is
/// `AmbiguousTable` — picking one silently would corrupt downstream data.
pub fn find_table_links(snapshot: &PageSnapshot, filter: &TableFilter) -> Result<Vec<Link>> {
    let document = snapshot.document();
    let tables = select_tables(&document, filter);

    match tables.len() {
        0 => Ok(Vec::new()),
        1 => {
            let anchor_selector = Selector::parse("a").unwrap();
            Ok(tables[0]
                .select(&anchor_selector)
                .filter_map(|a| {
                    a.value()
                        .attr("href")
                        .map(|href| snapshot.build_link(href, element_text(&a)))
                })
                .collect())
        }
        count => Err(CrawlError::AmbiguousTable { count }),
    }
}

/// True when at least one `tag` element on the page passes the filter.
pub fn has_element(snapshot: &PageSnapshot, tag: &str, filter: &ElementFilter) -> Result<bool> {
    let selector = Selector::parse(tag)
        .map_err(|e| CrawlError::InvalidArgument(format!("bad element type {tag:?}: {e}")))?;
    let document = snapshot.document();
    Ok(document.select(&selector).any(|el| filter.accepts(&el)))
}

fn select_tables<'a>(document: &'a Html, filter: &TableFilter) -> Vec<ElementRef<'a>> {
    let table_selector = Selector::parse("table").unwrap();
    document
        .select(&table_selector)
        .filter(|t| filter.accepts(t))
        .collect()
}

fn build_table(snapshot: &PageSnapshot, table: &ElementRef<'_>) -> Table {
    let row_selector = Selector::parse("tr").unwrap();
    let th_selector = Selector::parse("th").unwrap();
    let td_selector = Selector::parse("td").unwrap();
    let anchor_selector = Selector::parse("a").unwrap();

    let mut header: Vec<String> = Vec::new();
    let mut rows_texts = Vec::new();
    let mut rows_links = Vec::new();

    for row in table.select(&row_selector) {
        let header_cells: Vec<_> = row.select(&th_selector).collect();
        if !header_cells.is_empty() {
            // First header row wins
            if header.is_empty() {
                header = header_cells.iter().map(element_text).collect();
            }
            continue;
        }

        let mut row_texts = Vec::new();
        let mut row_links = Vec::new();
        for cell in row.select(&td_selector) {
            row_texts.push(element_text(&cell));
            row_links.push(
                cell.select(&anchor_selector)
                    .filter_map(|a| {
                        a.value()
                            .attr("href")
                            .map(|href| snapshot.build_link(href, element_text(&a)))
                    })
                    .collect(),
            );
        }
        rows_texts.push(row_texts);
        rows_links.push(row_links);
    }

    Table::new(header, rows_texts, rows_links)
}

/// Rendered text of an element with whitespace collapsed.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn any_class_token_matches(element: &ElementRef<'_>, re: &Regex) -> bool {
    element
        .value()
        .attr("class")
        .map(|classes| classes.split_whitespace().any(|token| re.is_match(token)))
        .unwrap_or(false)
}

/// Compile a pattern so it must match the whole input.
fn anchored(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
            <p id="paragraph">This is a sample paragraph.</p>
            <a href="https://example.com/file1.pdf" title="file1" class="download pdf-link">File 1</a>
            <a href="https://example.com/file2.pdf" class="download">File 2</a>
            <a href="docs/file3.pdf">File 3</a>
            <a href="https://example.com/about.html">About</a>
            <a>No href here</a>
            <table id="test-table" class="data">
                <tr><th>Name</th><th>Report</th></tr>
                <tr><td>Alpha</td><td><a href="https://example.com/file3.pdf">file3</a></td></tr>
            </table>
        </body></html>
    "#;

    fn snapshot() -> PageSnapshot {
        PageSnapshot::new(SAMPLE, Some("https://example.com/reports/index.html"))
    }

    #[test]
    fn url_pattern_selects_pdf_links() {
        let filter = LinkFilter::new().url(r"file\d\.pdf").unwrap();
        let links = find_links(&snapshot(), &filter);
        assert_eq!(links.len(), 4); // three loose anchors plus one in the table
        assert!(links.iter().all(|l| l.is_pdf()));
    }

    #[test]
    fn relative_href_resolves_against_page_url() {
        let filter = LinkFilter::new().text("File 3").unwrap();
        let links = find_links(&snapshot(), &filter);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url(), "https://example.com/reports/docs/file3.pdf");
    }

    #[test]
    fn text_pattern_is_a_full_match() {
        let partial = LinkFilter::new().text("File").unwrap();
        assert!(find_links(&snapshot(), &partial).is_empty());

        let full = LinkFilter::new().text(r"File \d").unwrap();
        assert_eq!(find_links(&snapshot(), &full).len(), 3);
    }

    #[test]
    fn class_pattern_matches_single_tokens() {
        let filter = LinkFilter::new().class("download").unwrap();
        assert_eq!(find_links(&snapshot(), &filter).len(), 2);

        // Full match against a token, not a substring of the attribute
        let filter = LinkFilter::new().class("pdf").unwrap();
        assert!(find_links(&snapshot(), &filter).is_empty());
    }

    #[test]
    fn predicates_compose_as_and() {
        let filter = LinkFilter::new()
            .url(r"\.pdf")
            .unwrap()
            .class("pdf-link")
            .unwrap();
        let links = find_links(&snapshot(), &filter);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text(), "File 1");
    }

    #[test]
    fn no_filter_returns_every_anchor_with_href() {
        let links = find_links(&snapshot(), &LinkFilter::new());
        assert_eq!(links.len(), 5);
    }

    #[test]
    fn tables_parse_header_and_rows() {
        let tables = find_tables(&snapshot(), &TableFilter::new());
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.header(), ["Name", "Report"]);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.col(0), vec!["Alpha"]);
        assert_eq!(table.col_links(1).len(), 1);
    }

    #[test]
    fn table_links_for_a_unique_match() {
        let filter = TableFilter::new().id("test-table").unwrap();
        let links = find_table_links(&snapshot(), &filter).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url(), "https://example.com/file3.pdf");
    }

    #[test]
    fn table_links_with_no_match_is_empty() {
        let filter = TableFilter::new().id("absent").unwrap();
        let links = find_table_links(&snapshot(), &filter).unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn table_links_with_multiple_matches_is_an_error() {
        let html = r#"
            <table class="data"><tr><td><a href="a.pdf">a</a></td></tr></table>
            <table class="data"><tr><td><a href="b.pdf">b</a></td></tr></table>
        "#;
        let snap = PageSnapshot::new(html, None);
        let filter = TableFilter::new().class("data").unwrap();
        let err = find_table_links(&snap, &filter).unwrap_err();
        assert!(matches!(
            err,
            crate::error::CrawlError::AmbiguousTable { count: 2 }
        ));
    }

    #[test]
    fn tables_select_by_caption() {
        let html = r#"
            <table><caption>Quarterly results</caption>
                <tr><th>Q</th></tr><tr><td>Q1</td></tr></table>
            <table><caption>Staff</caption><tr><td>Ann</td></tr></table>
        "#;
        let snap = PageSnapshot::new(html, None);
        let filter = TableFilter::new().caption("Quarterly results").unwrap();
        let tables = find_tables(&snap, &filter);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header(), ["Q"]);
    }

    #[test]
    fn has_element_probes_by_id_class_and_text() {
        let snap = snapshot();
        let by_id = ElementFilter::new().id("paragraph").unwrap();
        assert!(has_element(&snap, "p", &by_id).unwrap());

        let missing = ElementFilter::new().id("nonexistent").unwrap();
        assert!(!has_element(&snap, "a", &missing).unwrap());

        let by_text = ElementFilter::new().text("File 2").unwrap();
        assert!(has_element(&snap, "a", &by_text).unwrap());

        let by_class = ElementFilter::new().class("data").unwrap();
        assert!(has_element(&snap, "table", &by_class).unwrap());
    }
}
