//! Year-over-year comparison of seat totals.

use std::collections::BTreeMap;

use tracing::debug;

use crate::round::{BRANCH_CODE, COLLEGE_CODE};
use crate::seat_matrix::{SeatMatrix, BRANCH_NAME, COLLEGE_NAME};
use crate::table::{Cell, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsLevel {
    College,
    CollegeBranch,
}

/// Total seats for one college, or one college and branch.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatTotal {
    pub college_code: u32,
    pub college_name: String,
    /// `(code, name)`, present at [`TotalsLevel::CollegeBranch`].
    pub branch: Option<(String, String)>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Only in the previous snapshot.
    Removed,
    /// Only in the current snapshot.
    New,
    Common,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    pub college_code: u32,
    pub college_name: String,
    pub branch: Option<(String, String)>,
    pub previous: u64,
    pub current: u64,
    pub difference: i64,
    pub change: Change,
}

/// Display names for the two snapshot columns.
#[derive(Debug, Clone, PartialEq)]
pub struct YearLabels {
    pub previous: String,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDiff {
    pub level: TotalsLevel,
    pub rows: Vec<DiffRow>,
}

type DiffKey = (u32, String);

fn key_of(level: TotalsLevel, total: &SeatTotal) -> DiffKey {
    let branch = match level {
        TotalsLevel::College => String::new(),
        TotalsLevel::CollegeBranch => total
            .branch
            .as_ref()
            .map(|(code, _)| code.clone())
            .unwrap_or_default(),
    };
    (total.college_code, branch)
}

/// Full outer join of two snapshots on college code (and branch code).
///
/// Keys repeated within one snapshot keep their first occurrence. Rows come
/// back sorted by key.
pub fn compare(level: TotalsLevel, previous: &[SeatTotal], current: &[SeatTotal]) -> SnapshotDiff {
    let mut joined: BTreeMap<DiffKey, (Option<&SeatTotal>, Option<&SeatTotal>)> = BTreeMap::new();
    for total in previous {
        let slot = joined.entry(key_of(level, total)).or_default();
        slot.0.get_or_insert(total);
    }
    for total in current {
        let slot = joined.entry(key_of(level, total)).or_default();
        slot.1.get_or_insert(total);
    }

    let rows: Vec<DiffRow> = joined
        .into_values()
        .filter_map(|pair| {
            let (named, change) = match pair {
                (Some(_), Some(current)) => (current, Change::Common),
                (Some(previous), None) => (previous, Change::Removed),
                (None, Some(current)) => (current, Change::New),
                (None, None) => return None,
            };
            let previous = pair.0.map_or(0, |t| t.total);
            let current = pair.1.map_or(0, |t| t.total);
            Some(DiffRow {
                college_code: named.college_code,
                college_name: named.college_name.clone(),
                branch: match level {
                    TotalsLevel::College => None,
                    TotalsLevel::CollegeBranch => named.branch.clone(),
                },
                previous,
                current,
                difference: current as i64 - previous as i64,
                change,
            })
        })
        .collect();

    debug!(?level, rows = rows.len(), "compared seat snapshots");
    SnapshotDiff { level, rows }
}

/// [`compare`] over the totals of two seat matrices.
pub fn compare_matrices(level: TotalsLevel, previous: &SeatMatrix, current: &SeatMatrix) -> SnapshotDiff {
    compare(level, &previous.totals(level), &current.totals(level))
}

impl SnapshotDiff {
    pub fn count(&self, change: Change) -> usize {
        self.rows.iter().filter(|r| r.change == change).count()
    }

    pub fn to_table(&self, labels: Option<&YearLabels>) -> Table {
        let (previous, current) = labels.map_or(("N-1", "N"), |l| (l.previous.as_str(), l.current.as_str()));
        let branch_level = self.level == TotalsLevel::CollegeBranch;

        let mut columns = vec![COLLEGE_CODE, COLLEGE_NAME];
        if branch_level {
            columns.extend([BRANCH_CODE, BRANCH_NAME]);
        }
        columns.extend([previous, current, "Difference"]);
        let mut table = Table::new(columns.into_iter().map(String::from).collect());

        for row in &self.rows {
            let mut cells = vec![Cell::from(row.college_code), Cell::text(row.college_name.as_str())];
            if branch_level {
                match &row.branch {
                    Some((code, name)) => cells.extend([Cell::text(code.as_str()), Cell::text(name.as_str())]),
                    None => cells.extend([Cell::Empty, Cell::Empty]),
                }
            }
            cells.extend([Cell::from(row.previous), Cell::from(row.current), Cell::from(row.difference)]);
            table.push_row(cells);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn college(code: u32, name: &str, total: u64) -> SeatTotal {
        SeatTotal {
            college_code: code,
            college_name: name.to_string(),
            branch: None,
            total,
        }
    }

    fn branch(code: u32, branch: &str, total: u64) -> SeatTotal {
        SeatTotal {
            college_code: code,
            college_name: format!("College {}", code),
            branch: Some((branch.to_string(), format!("{} name", branch))),
            total,
        }
    }

    #[test]
    fn classifies_removed_new_and_common() {
        let previous = [college(1, "c1", 10), college(2, "c2", 5)];
        let current = [college(2, "c2 renamed", 8), college(3, "c3", 4)];
        let diff = compare(TotalsLevel::College, &previous, &current);

        assert_eq!(diff.rows.len(), 3);
        let rows: Vec<(u32, u64, u64, i64, Change)> = diff
            .rows
            .iter()
            .map(|r| (r.college_code, r.previous, r.current, r.difference, r.change))
            .collect();
        assert_eq!(
            rows,
            vec![
                (1, 10, 0, -10, Change::Removed),
                (2, 5, 8, 3, Change::Common),
                (3, 0, 4, 4, Change::New),
            ]
        );
        assert_eq!(diff.rows[1].college_name, "c2 renamed");
    }

    #[test]
    fn first_duplicate_wins() {
        let previous = [college(1, "first", 3), college(1, "second", 99)];
        let diff = compare(TotalsLevel::College, &previous, &[]);
        assert_eq!(diff.rows.len(), 1);
        assert_eq!(diff.rows[0].previous, 3);
        assert_eq!(diff.rows[0].college_name, "first");
    }

    #[test]
    fn zero_in_both_years_is_common() {
        let diff = compare(TotalsLevel::College, &[college(4, "z", 0)], &[college(4, "z", 0)]);
        assert_eq!(diff.rows[0].change, Change::Common);
        assert_eq!(diff.rows[0].difference, 0);
    }

    #[test]
    fn empty_sides() {
        assert!(compare(TotalsLevel::College, &[], &[]).rows.is_empty());
        let diff = compare(TotalsLevel::College, &[], &[college(1, "a", 2)]);
        assert_eq!(diff.count(Change::New), 1);
    }

    #[test]
    fn branch_level_sorts_by_college_then_branch() {
        let previous = [branch(2, "EC", 4), branch(1, "ME", 6)];
        let current = [branch(1, "CS", 5), branch(2, "EC", 4)];
        let diff = compare(TotalsLevel::CollegeBranch, &previous, &current);
        let keys: Vec<(u32, &str)> = diff
            .rows
            .iter()
            .map(|r| (r.college_code, r.branch.as_ref().map(|b| b.0.as_str()).unwrap_or("")))
            .collect();
        assert_eq!(keys, vec![(1, "CS"), (1, "ME"), (2, "EC")]);
        assert_eq!(diff.count(Change::Common), 1);
    }

    #[test]
    fn table_uses_year_labels() {
        let diff = compare(TotalsLevel::College, &[college(1, "a", 1)], &[college(1, "a", 2)]);
        assert_eq!(
            diff.to_table(None).columns,
            vec!["College Code", "College Name", "N-1", "N", "Difference"]
        );
        let labels = YearLabels {
            previous: "2023".to_string(),
            current: "2024".to_string(),
        };
        let table = diff.to_table(Some(&labels));
        assert_eq!(table.columns[2..4], ["2023".to_string(), "2024".to_string()]);
        assert_eq!(table.rows[0][4], Cell::Int(1));
    }
}
