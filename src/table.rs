use crate::link::Link;

/// A parsed table: one header row, per-row cell text, and per-cell link
/// collections.
///
/// `rows_texts` and `rows_links` always have the same length and per-row cell
/// counts; both are filled cell-by-cell from the same rows. Column indexes out
/// of range are a programming error and panic rather than returning empty.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows_texts: Vec<Vec<String>>,
    rows_links: Vec<Vec<Vec<Link>>>,
}

impl Table {
    pub fn new(
        header: Vec<String>,
        rows_texts: Vec<Vec<String>>,
        rows_links: Vec<Vec<Vec<Link>>>,
    ) -> Self {
        debug_assert_eq!(rows_texts.len(), rows_links.len());
        Self {
            header,
            rows_texts,
            rows_links,
        }
    }

    /// Column names from the first header row.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn row_count(&self) -> usize {
        self.rows_texts.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows_texts
    }

    /// Cell text of one column, top to bottom. Panics on an out-of-range
    /// index.
    pub fn col(&self, idx: usize) -> Vec<&str> {
        self.rows_texts.iter().map(|row| row[idx].as_str()).collect()
    }

    /// All links in one column, flattened in row order. Panics on an
    /// out-of-range index.
    pub fn col_links(&self, idx: usize) -> Vec<&Link> {
        self.rows_links
            .iter()
            .flat_map(|row| row[idx].iter())
            .collect()
    }

    /// Text of the columns whose header entry appears in `names`; all columns
    /// when `names` is empty.
    pub fn cols(&self, names: &[&str]) -> Vec<Vec<&str>> {
        self.select_indexes(names)
            .into_iter()
            .map(|idx| self.col(idx))
            .collect()
    }

    /// Links of the columns whose header entry appears in `names`; all
    /// columns when `names` is empty.
    pub fn cols_links(&self, names: &[&str]) -> Vec<Vec<&Link>> {
        self.select_indexes(names)
            .into_iter()
            .map(|idx| self.col_links(idx))
            .collect()
    }

    /// Every link in the table, in row-then-cell document order.
    pub fn links(&self) -> Vec<&Link> {
        self.rows_links
            .iter()
            .flat_map(|row| row.iter())
            .flat_map(|cell| cell.iter())
            .collect()
    }

    fn select_indexes(&self, names: &[&str]) -> Vec<usize> {
        if names.is_empty() {
            (0..self.header.len()).collect()
        } else {
            (0..self.header.len())
                .filter(|&idx| names.contains(&self.header[idx].as_str()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let header = vec!["Name".to_string(), "Report".to_string()];
        let rows_texts = vec![
            vec!["Alpha".to_string(), "2023".to_string()],
            vec!["Beta".to_string(), "2024".to_string()],
        ];
        let rows_links = vec![
            vec![vec![], vec![Link::new("a/2023.pdf", "2023")]],
            vec![vec![], vec![Link::new("a/2024.pdf", "2024")]],
        ];
        Table::new(header, rows_texts, rows_links)
    }

    #[test]
    fn col_returns_cells_top_to_bottom() {
        let table = sample();
        assert_eq!(table.col(0), vec!["Alpha", "Beta"]);
        assert_eq!(table.col(1), vec!["2023", "2024"]);
    }

    #[test]
    fn col_links_flattens_in_row_order() {
        let table = sample();
        let links = table.col_links(1);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href(), "a/2023.pdf");
        assert_eq!(links[1].href(), "a/2024.pdf");
        assert!(table.col_links(0).is_empty());
    }

    #[test]
    #[should_panic]
    fn out_of_range_column_panics() {
        sample().col(5);
    }

    #[test]
    fn cols_selects_by_header_name() {
        let table = sample();
        let cols = table.cols(&["Report"]);
        assert_eq!(cols, vec![vec!["2023", "2024"]]);
        // Empty selection means every column
        assert_eq!(table.cols(&[]).len(), 2);
    }

    #[test]
    fn cols_links_selects_by_header_name() {
        let table = sample();
        let cols = table.cols_links(&["Report"]);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].len(), 2);
    }

    #[test]
    fn links_walks_rows_then_cells() {
        let table = sample();
        let all: Vec<&str> = table.links().iter().map(|l| l.href()).collect();
        assert_eq!(all, vec!["a/2023.pdf", "a/2024.pdf"]);
    }
}
