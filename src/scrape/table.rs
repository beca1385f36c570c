//! Extracts an HTML table into headers and rectangular rows of text.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, Default, PartialEq)]
/// A scraped table. Every row has exactly `headers.len()` cells.
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a rectangular table from ragged rows.
    ///
    /// The width is that of the widest row. Short rows are padded with empty
    /// strings. When `headers` is empty or its length differs from the width,
    /// headers are synthesised as `col_1..col_n`.
    pub fn from_cells(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let headers = if headers.is_empty() || headers.len() != width {
            (1..=width).map(|i| format!("col_{}", i)).collect()
        } else {
            headers
        };

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        RawTable { headers, rows }
    }

    /// Parses the first element matching `locator` in `html` as a table.
    pub fn from_html(html: &str, locator: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let table_selector = selector(locator)?;
        let header_selector = selector("thead tr th")?;
        let row_selector = selector("tbody tr")?;
        let cell_selector = selector("td")?;

        let table = document
            .select(&table_selector)
            .next()
            .ok_or_else(|| anyhow!("No table matching `{}` in page", locator))?;

        let headers = table.select(&header_selector).map(cell_text).collect();
        let rows = table
            .select(&row_selector)
            .map(|tr| tr.select(&cell_selector).map(cell_text).collect())
            .collect();

        Ok(RawTable::from_cells(headers, rows))
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector `{}`: {:?}", css, e))
}

/// Visible text of an element, trimmed with inner whitespace collapsed.
pub fn cell_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// -- Tests -------------------------------------------------------------------
