//! Plain tabular input and output.
//!
//! [`RawTable`] is what the loaders hand to the core: a header row and text
//! cells. [`Table`] is what the core hands back: named columns and typed
//! cells, ready to be written anywhere.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::SchemaError;
use crate::rank::RankKey;

/// Raw header -> canonical header.
pub type RenameMap = BTreeMap<String, String>;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("line break pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Removes line breaks that PDF extraction leaves inside text cells.
pub fn strip_line_breaks(text: &str) -> String {
    LINE_BREAKS.replace_all(text, "").into_owned()
}

/// Header comparison key: case-insensitive, whitespace and line breaks ignored.
///
/// `"COLLEGE\rCODE"`, `"College Code"` and `"college  code"` all match.
pub fn header_key(header: &str) -> String {
    WHITESPACE.replace_all(header, "").to_uppercase()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Convenience constructor used by loaders and tests.
    pub fn from_rows<H, R>(headers: &[H], rows: &[R]) -> Self
    where
        H: AsRef<str>,
        R: AsRef<[&'static str]>,
    {
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.as_ref().iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Applies a rename mapping; unmapped headers keep their name.
    pub fn renamed(mut self, rename: &RenameMap) -> Self {
        if rename.is_empty() {
            return self;
        }
        let keyed: BTreeMap<String, &String> =
            rename.iter().map(|(from, to)| (header_key(from), to)).collect();
        for header in &mut self.headers {
            if let Some(to) = keyed.get(&header_key(header)) {
                *header = (*to).clone();
            }
        }
        self
    }

    /// Index of the first column matching `name` by [`header_key`].
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = header_key(name);
        self.headers.iter().position(|h| header_key(h) == key)
    }

    /// Resolves every required column or reports all the missing ones.
    pub fn require_columns(
        &self,
        table: &'static str,
        names: &[&str],
    ) -> Result<Vec<usize>, SchemaError> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(index) => found.push(index),
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(SchemaError::MissingColumns {
                table,
                columns: missing,
            })
        }
    }

    /// Cell text, empty when the row is shorter than the header.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One typed output cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Rank(RankKey),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Rank(r) => Some(r.value()),
            Cell::Text(_) | Cell::Empty => None,
        }
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(i64::from(value))
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(value as i64)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Float)
    }
}

impl From<Option<RankKey>> for Cell {
    fn from(value: Option<RankKey>) -> Self {
        value.map_or(Cell::Empty, Cell::Rank)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => f.write_str(v),
            Cell::Rank(r) => write!(f, "{}", r),
            Cell::Empty => Ok(()),
        }
    }
}

/// A named report table with a fixed column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Every cell of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[index]).collect())
    }

    /// Writes the header and every row as CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_string))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_key_ignores_case_and_breaks() {
        assert_eq!(header_key("COLLEGE\rCODE"), header_key("College Code"));
        assert_eq!(header_key("ALLOTTED\r\nCATEGORY"), "ALLOTTEDCATEGORY");
    }

    #[test]
    fn rename_matches_normalized_headers() {
        let table = RawTable::from_rows(&["COLLEGE\rCODE", "RANK", "Other"], &[["1", "2", "3"]]);
        let rename: RenameMap = [
            ("COLLEGE CODE".to_string(), "College Code".to_string()),
            ("RANK".to_string(), "Rank".to_string()),
        ]
        .into_iter()
        .collect();
        let renamed = table.renamed(&rename);
        assert_eq!(renamed.headers, vec!["College Code", "Rank", "Other"]);
    }

    #[test]
    fn require_columns_lists_every_missing_column() {
        let table = RawTable::from_rows(&["Rank"], &[] as &[[&str; 1]]);
        let err = table
            .require_columns("round", &["Rank", "College Code", "Cutoff Mark"])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns {
                table: "round",
                columns: vec!["College Code".to_string(), "Cutoff Mark".to_string()],
            }
        );
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let table = RawTable::from_rows(&["A", "B"], &[["x"].as_slice()]);
        assert_eq!(table.cell(0, 1), "");
        assert_eq!(table.cell(5, 0), "");
    }

    #[test]
    fn strip_line_breaks_joins_wrapped_names() {
        assert_eq!(strip_line_breaks("GOVT COLLEGE OF\r\nENGG"), "GOVT COLLEGE OFENGG");
    }

    #[test]
    fn write_csv_renders_cells() {
        let mut table = Table::new(vec!["College Code".to_string(), "Opening Rank".to_string(), "Lowest Cutoff".to_string()]);
        table.push_row(vec![Cell::from(7u32), Cell::from(Some(RankKey::new(4.1))), Cell::Empty]);
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "College Code,Opening Rank,Lowest Cutoff\n7,4.1,\n");
    }

    #[test]
    fn cell_display() {
        assert_eq!(Cell::from(12u32).to_string(), "12");
        assert_eq!(Cell::from(Some(RankKey::from(7))).to_string(), "7");
        assert_eq!(Cell::from(None::<f64>).to_string(), "");
    }
}
