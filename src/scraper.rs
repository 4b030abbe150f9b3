use crate::table::{header_key, RawTable};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::sync::LazyLock;

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").expect("table selector is valid"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));
static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").expect("header selector is valid"));
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("cell selector is valid"));
static ANY_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").expect("cell selector is valid"));

static HTML_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<(!doctype|html|head|body|table)").expect("html pattern is valid"));

/// Reads allotment lists and seat matrices from files or URLs into [`RawTable`]s.
pub struct TableLoader {
    client: reqwest::Client,
}

impl Default for TableLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TableLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Loads `location`: `http(s)://` URLs are fetched, anything else is read
    /// from disk.
    pub async fn load(&self, location: &str) -> Result<RawTable> {
        let content = if is_url(location) {
            self.fetch(location).await?
        } else {
            let bytes = fs::read(location).with_context(|| format!("Failed to read file: {}", location))?;
            String::from_utf8_lossy(&bytes).into_owned()
        };

        Self::parse(&content, location).with_context(|| format!("Failed to parse table from: {}", location))
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        println!("🌐 Fetching data from: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {}", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP request failed with status: {}", response.status()));
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {}", url))
    }

    /// Picks HTML or CSV parsing from the location's extension or the content.
    pub fn parse(content: &str, location: &str) -> Result<RawTable> {
        let lower = location.to_lowercase();
        if lower.ends_with(".html") || lower.ends_with(".htm") || HTML_START.is_match(content) {
            Self::parse_html(content)
        } else {
            Self::parse_csv(content)
        }
    }

    /// Every `<table>` whose header matches the first table's header is
    /// concatenated, so a list published across many pages reads as one.
    pub fn parse_html(content: &str) -> Result<RawTable> {
        let document = Html::parse_document(content);

        let mut result: Option<RawTable> = None;
        let mut skipped = 0usize;
        for table in document.select(&TABLE) {
            let (headers, rows) = extract_table(table);
            if headers.is_empty() {
                continue;
            }
            match result.as_mut() {
                None => result = Some(RawTable::new(headers, rows)),
                Some(first) if same_header(&first.headers, &headers) => first.rows.extend(rows),
                Some(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            println!("   ⚠️  Skipped {} tables with a different header", skipped);
        }

        let mut table = result.ok_or_else(|| anyhow!("No table found in HTML content"))?;
        let width = table.headers.len();
        for row in &mut table.rows {
            row.resize(width, String::new());
        }
        Ok(table)
    }

    /// Flexible CSV: short rows are padded and long rows truncated to the
    /// header width.
    pub fn parse_csv(content: &str) -> Result<RawTable> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV row {}", index + 1))?;
            let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(RawTable::new(headers, rows))
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn same_header(left: &[String], right: &[String]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| header_key(l) == header_key(r))
}

fn cell_text(cell: ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Header row (the first row with `th` cells, else the first row) and the
/// data rows after it.
fn extract_table(table: ElementRef) -> (Vec<String>, Vec<Vec<String>>) {
    let rows: Vec<ElementRef> = table.select(&ROW).collect();
    let header_index = rows
        .iter()
        .position(|row| row.select(&HEADER_CELL).next().is_some())
        .unwrap_or(0);

    let Some(header_row) = rows.get(header_index) else {
        return (Vec::new(), Vec::new());
    };
    let headers: Vec<String> = header_row.select(&ANY_CELL).map(cell_text).collect();

    let data = rows[header_index + 1..]
        .iter()
        .map(|row| row.select(&DATA_CELL).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    (headers, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGED_HTML: &str = r#"<html><body>
        <table>
            <tr><th>RANK</th><th>COLLEGE CODE</th></tr>
            <tr><td>1</td><td>101</td></tr>
            <tr><td>2</td><td>102</td></tr>
        </table>
        <table>
            <tr><th>Rank</th><th>College  Code</th></tr>
            <tr><td>3</td></tr>
        </table>
        <table>
            <tr><th>Notes</th></tr>
            <tr><td>ignored</td></tr>
        </table>
    </body></html>"#;

    #[test]
    fn html_tables_with_matching_header_are_concatenated() {
        let table = TableLoader::parse_html(PAGED_HTML).unwrap();
        assert_eq!(table.headers, vec!["RANK", "COLLEGE CODE"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2], vec!["3".to_string(), String::new()]);
    }

    #[test]
    fn html_without_th_uses_first_row() {
        let html = "<table><tr><td>A</td><td>B</td></tr><tr><td>1</td><td>2</td></tr></table>";
        let table = TableLoader::parse(html, "list.html").unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn html_without_tables_is_an_error() {
        assert!(TableLoader::parse_html("<html><p>nothing</p></html>").is_err());
    }

    #[test]
    fn csv_rows_are_padded_and_truncated() {
        let table = TableLoader::parse_csv("a,b,c\n1,2\n1,2,3,4\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn parse_detects_html_content() {
        let table = TableLoader::parse("<!DOCTYPE html><table><tr><th>X</th></tr><tr><td>9</td></tr></table>", "data").unwrap();
        assert_eq!(table.headers, vec!["X"]);
        let csv = TableLoader::parse("X\n9\n", "data").unwrap();
        assert_eq!(csv.rows, vec![vec!["9".to_string()]]);
    }

    #[tokio::test]
    async fn load_reads_files_and_reports_missing_ones() {
        let path = std::env::temp_dir().join(format!("allotment-loader-{}.csv", std::process::id()));
        fs::write(&path, "Rank,College Code\n1,5\n").unwrap();
        let loader = TableLoader::new();
        let table = loader.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(table.len(), 1);
        fs::remove_file(&path).unwrap();

        let err = loader.load("/nonexistent/allotment.csv").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
