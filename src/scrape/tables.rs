use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());

/// A `<table>` flattened to cell text, row by row. Row 0 is the header when
/// the page has one; nothing here decides that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// First row, lower-cased and trimmed. Empty for a table with no rows.
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.iter().map(String::as_str).map(normalize_header).collect())
            .unwrap_or_default()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Every table in document order.
pub fn extract_tables(doc: &Html) -> Vec<Table> {
    doc.select(&TABLE).map(table_from_element).collect()
}

fn table_from_element(table: ElementRef<'_>) -> Table {
    let rows = table
        .select(&ROW)
        .map(|row| row.select(&CELL).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();
    Table { rows }
}

/// Text nodes of `el`, each trimmed, joined by single spaces.
/// `<td>15/06/2025<br>7:30pm</td>` → `"15/06/2025 7:30pm"`.
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_header(s: &str) -> String {
    s.trim().to_lowercase()
}
