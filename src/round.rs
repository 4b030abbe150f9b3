//! One allotment round's cleaned records.

use tracing::debug;

use crate::error::SchemaError;
use crate::models::{AllotmentRecord, Community};
use crate::rank::RankNormalizer;
use crate::table::{RawTable, RenameMap};

pub const RANK: &str = "Rank";
pub const COLLEGE_CODE: &str = "College Code";
pub const BRANCH_CODE: &str = "Branch Code";
pub const ALLOTTED_COMMUNITY: &str = "Allotted Community";
pub const CUTOFF_MARK: &str = "Cutoff Mark";

/// Candidate identity columns that never reach the analysis.
pub const IDENTITY_COLUMNS: [&str; 5] = [
    "Community",
    "Name",
    "Serial Number",
    "Application Number",
    "DOB",
];

/// Optional predicates over college, branch and community.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub college_code: Option<u32>,
    pub branch_code: Option<String>,
    pub community: Option<Community>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn college(mut self, college_code: u32) -> Self {
        self.college_code = Some(college_code);
        self
    }

    pub fn branch(mut self, branch_code: impl Into<String>) -> Self {
        self.branch_code = Some(branch_code.into());
        self
    }

    pub fn community(mut self, community: Community) -> Self {
        self.community = Some(community);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.college_code.is_none() && self.branch_code.is_none() && self.community.is_none()
    }

    pub fn matches(&self, record: &AllotmentRecord) -> bool {
        self.college_code.map_or(true, |c| record.college_code == c)
            && self
                .branch_code
                .as_deref()
                .map_or(true, |b| record.branch_code == b)
            && self.community.map_or(true, |c| record.community() == Some(c))
    }
}

/// A read-only, rank-sorted set of allotment records.
pub trait RecordSet {
    fn records(&self) -> &[AllotmentRecord];

    /// Records satisfying every given predicate; all of them when none is set.
    fn filter(&self, filter: &RecordFilter) -> Vec<&AllotmentRecord> {
        if filter.is_empty() {
            return self.records().iter().collect();
        }
        self.records().iter().filter(|r| filter.matches(r)).collect()
    }

    fn count(&self, filter: &RecordFilter) -> usize {
        self.records().iter().filter(|r| filter.matches(r)).count()
    }

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    name: String,
    sequence: usize,
    records: Vec<AllotmentRecord>,
}

impl Round {
    /// Builds a round from a raw allotment list.
    ///
    /// Only the five analysis columns are read, so identity columns such as
    /// names or application numbers are dropped here. Rows whose analysis
    /// columns are all blank are skipped and take no part in rank
    /// normalization; error rows keep their index in `table`.
    pub fn from_table(
        name: impl Into<String>,
        sequence: usize,
        table: RawTable,
        rename: &RenameMap,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let table = table.renamed(rename);
        let columns = table.require_columns(
            "round",
            &[RANK, COLLEGE_CODE, BRANCH_CODE, ALLOTTED_COMMUNITY, CUTOFF_MARK],
        )?;
        let (rank_col, college_col, branch_col, community_col, cutoff_col) =
            (columns[0], columns[1], columns[2], columns[3], columns[4]);

        let ignored = IDENTITY_COLUMNS
            .iter()
            .filter(|c| table.column_index(c).is_some())
            .count();
        debug!(round = %name, ignored, "dropping identity columns");

        let rows: Vec<usize> = (0..table.len())
            .filter(|&row| !columns.iter().all(|&c| table.cell(row, c).trim().is_empty()))
            .collect();
        let blank = table.len() - rows.len();
        if blank > 0 {
            debug!(round = %name, blank, "skipped blank round rows");
        }

        let ranks = RankNormalizer::normalize_batch(rows.iter().map(|&row| table.cell(row, rank_col)));

        let mut records = Vec::with_capacity(rows.len());
        for (row, rank) in rows.into_iter().zip(ranks) {
            let college_code = parse_cell::<u32>(&table, row, college_col, COLLEGE_CODE)?;
            let cutoff_mark = parse_cell::<f64>(&table, row, cutoff_col, CUTOFF_MARK)?;
            records.push(AllotmentRecord {
                rank,
                college_code,
                branch_code: table.cell(row, branch_col).trim().to_string(),
                allotted_community: table.cell(row, community_col).trim().to_uppercase(),
                cutoff_mark,
            });
        }

        Ok(Self::from_records(name, sequence, records))
    }

    /// Builds a round from typed records, sorting them by rank.
    pub fn from_records(
        name: impl Into<String>,
        sequence: usize,
        mut records: Vec<AllotmentRecord>,
    ) -> Self {
        records.sort_by_key(|r| r.rank);
        Self {
            name: name.into(),
            sequence,
            records,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }
}

impl RecordSet for Round {
    fn records(&self) -> &[AllotmentRecord] {
        &self.records
    }
}

/// Parses a numeric cell, tolerating spreadsheet floats for integer columns.
pub(crate) fn parse_cell<T: std::str::FromStr>(
    table: &RawTable,
    row: usize,
    column: usize,
    name: &str,
) -> Result<T, SchemaError> {
    let raw = table.cell(row, column).trim();
    raw.parse::<T>()
        .ok()
        .or_else(|| {
            raw.strip_suffix(".0")
                .and_then(|whole| whole.parse::<T>().ok())
        })
        .ok_or_else(|| SchemaError::InvalidValue {
            row,
            column: name.to_string(),
            value: raw.to_string(),
        })
}
