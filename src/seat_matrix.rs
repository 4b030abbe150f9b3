//! Seat capacity per college and branch, split by community.
//!
//! A [`SeatMatrix`] is only ever created through [`SeatMatrix::cast`] (from a
//! raw table) or through checked arithmetic on two matrices with the same
//! key set, so every instance carries the canonical columns with
//! non-negative counts. Round-by-round progression keeps its remaining
//! seats in a signed [`SeatBalance`] instead.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use tracing::{debug, warn};

use crate::diff::{SeatTotal, TotalsLevel};
use crate::error::{MatrixError, SchemaError};
use crate::models::Community;
use crate::round::{parse_cell, RecordSet, Round, BRANCH_CODE, COLLEGE_CODE};
use crate::table::{strip_line_breaks, Cell, RawTable, RenameMap, Table};

pub const COLLEGE_NAME: &str = "College Name";
pub const BRANCH_NAME: &str = "Branch Name";

/// Column set and order every seat matrix is cast to.
pub const CANONICAL_COLUMNS: [&str; 11] = [
    COLLEGE_CODE,
    COLLEGE_NAME,
    BRANCH_CODE,
    BRANCH_NAME,
    "OC",
    "BC",
    "BCM",
    "MBC",
    "SC",
    "SCA",
    "ST",
];

/// Label of the snapshot taken before any round is applied.
pub const BEFORE_ROUNDS: &str = "Before Round(s)";

/// One count per community, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Seats([u32; 7]);

impl Seats {
    pub fn new(counts: [u32; 7]) -> Self {
        Seats(counts)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| u64::from(c)).sum()
    }

    /// Sum over a subset of communities.
    pub fn total_of(&self, communities: &[Community]) -> u64 {
        communities.iter().map(|&c| u64::from(self[c])).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Community, u32)> + '_ {
        Community::ALL.into_iter().map(move |c| (c, self[c]))
    }

    fn combine(
        &self,
        other: &Seats,
        op: impl Fn(u32, u32) -> Option<u32>,
    ) -> Result<Seats, Community> {
        let mut out = Seats::default();
        for c in Community::ALL {
            out[c] = op(self[c], other[c]).ok_or(c)?;
        }
        Ok(out)
    }
}

impl Index<Community> for Seats {
    type Output = u32;

    fn index(&self, community: Community) -> &u32 {
        &self.0[community.index()]
    }
}

impl IndexMut<Community> for Seats {
    fn index_mut(&mut self, community: Community) -> &mut u32 {
        &mut self.0[community.index()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeatRow {
    pub college_code: u32,
    pub college_name: String,
    pub branch_code: String,
    pub branch_name: String,
    pub seats: Seats,
}

impl SeatRow {
    fn key(&self) -> (u32, &str) {
        (self.college_code, self.branch_code.as_str())
    }
}

/// Seats remaining and filled after one step of [`SeatMatrix::evaluate_rounds`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeatProgression {
    pub label: String,
    pub remaining: SeatBalance,
    pub filled: SeatMatrix,
}

/// A seat row whose counts may go below zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub college_code: u32,
    pub college_name: String,
    pub branch_code: String,
    pub branch_name: String,
    pub seats: [i64; 7],
}

impl Index<Community> for BalanceRow {
    type Output = i64;

    fn index(&self, community: Community) -> &i64 {
        &self.seats[community.index()]
    }
}

/// Capacity minus filled seats, laid out like the capacity matrix.
///
/// A negative cell means the rounds allotted more seats than the row holds,
/// which is what happens when a candidate upgrades away from a seat and a
/// later round hands that seat to someone else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatBalance {
    rows: Vec<BalanceRow>,
}

impl SeatBalance {
    pub fn between(capacity: &SeatMatrix, filled: &SeatMatrix) -> Result<Self, MatrixError> {
        let matched = align(&capacity.rows, &filled.rows)?;
        let rows = capacity
            .rows
            .iter()
            .zip(matched)
            .map(|(cap, used)| {
                let mut seats = [0i64; 7];
                for c in Community::ALL {
                    seats[c.index()] = i64::from(cap.seats[c]) - i64::from(used.seats[c]);
                }
                BalanceRow {
                    college_code: cap.college_code,
                    college_name: cap.college_name.clone(),
                    branch_code: cap.branch_code.clone(),
                    branch_name: cap.branch_name.clone(),
                    seats,
                }
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[BalanceRow] {
        &self.rows
    }

    pub fn total(&self) -> i64 {
        self.rows.iter().flat_map(|r| r.seats).sum()
    }

    /// Seats allotted past capacity, summed over every negative cell.
    pub fn overdrawn(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|r| r.seats)
            .filter(|&n| n < 0)
            .map(i64::unsigned_abs)
            .sum()
    }

    /// Adds `filled` back cell by cell, recovering the capacity this
    /// balance was taken from.
    pub fn plus(&self, filled: &SeatMatrix) -> Result<SeatMatrix, MatrixError> {
        let keyed: Vec<SeatRow> = self
            .rows
            .iter()
            .map(|r| SeatRow {
                college_code: r.college_code,
                college_name: r.college_name.clone(),
                branch_code: r.branch_code.clone(),
                branch_name: r.branch_name.clone(),
                seats: Seats::default(),
            })
            .collect();
        let matched = align(&keyed, &filled.rows)?;

        let mut rows = Vec::with_capacity(keyed.len());
        for ((balance, mut row), used) in self.rows.iter().zip(keyed).zip(matched) {
            for c in Community::ALL {
                let sum = balance[c] + i64::from(used.seats[c]);
                let count = u32::try_from(sum).map_err(|_| {
                    let (college_code, branch_code) = (row.college_code, row.branch_code.clone());
                    if sum < 0 {
                        MatrixError::NegativeSeats { college_code, branch_code, community: c }
                    } else {
                        MatrixError::SeatOverflow { college_code, branch_code, community: c }
                    }
                })?;
                row.seats[c] = count;
            }
            rows.push(row);
        }
        Ok(SeatMatrix { rows })
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new(CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect());
        for row in &self.rows {
            let mut cells = vec![
                Cell::from(row.college_code),
                Cell::text(row.college_name.as_str()),
                Cell::text(row.branch_code.as_str()),
                Cell::text(row.branch_name.as_str()),
            ];
            cells.extend(row.seats.iter().map(|&count| Cell::from(count)));
            table.push_row(cells);
        }
        table
    }
}

/// Pairs each row of `left` with the row of `right` holding the same
/// (college, branch) key. Row order may differ between the two; when a key
/// repeats, its first row in `right` is used.
fn align<'a>(left: &[SeatRow], right: &'a [SeatRow]) -> Result<Vec<&'a SeatRow>, MatrixError> {
    if left.len() != right.len() {
        return Err(MatrixError::ShapeMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let mut by_key: HashMap<(u32, &str), &'a SeatRow> = HashMap::with_capacity(right.len());
    for row in right {
        by_key.entry(row.key()).or_insert(row);
    }

    left.iter()
        .enumerate()
        .map(|(index, row)| {
            by_key.get(&row.key()).copied().ok_or_else(|| {
                let other = &right[index];
                MatrixError::IncompatibleKeys {
                    row: index,
                    left_college: row.college_code,
                    left_branch: row.branch_code.clone(),
                    right_college: other.college_code,
                    right_branch: other.branch_code.clone(),
                }
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeatMatrix {
    rows: Vec<SeatRow>,
}

impl SeatMatrix {
    /// Loads a capacity table: renames headers, then casts.
    pub fn from_table(table: RawTable, rename: &RenameMap) -> Result<Self, SchemaError> {
        Self::cast(&table.renamed(rename))
    }

    /// Validates and reorders an arbitrary table against [`CANONICAL_COLUMNS`].
    ///
    /// Extra columns are dropped, blank seat cells read as zero, and rows
    /// that are entirely blank are skipped.
    pub fn cast(table: &RawTable) -> Result<Self, SchemaError> {
        let columns = table.require_columns("seat matrix", &CANONICAL_COLUMNS)?;

        let mut rows = Vec::with_capacity(table.len());
        let mut blank = 0usize;
        for row in 0..table.len() {
            if columns.iter().all(|&c| table.cell(row, c).trim().is_empty()) {
                blank += 1;
                continue;
            }

            let mut seats = Seats::default();
            for (i, community) in Community::ALL.into_iter().enumerate() {
                let column = columns[4 + i];
                seats[community] = if table.cell(row, column).trim().is_empty() {
                    0
                } else {
                    parse_cell::<u32>(table, row, column, community.as_str())?
                };
            }

            rows.push(SeatRow {
                college_code: parse_cell::<u32>(table, row, columns[0], COLLEGE_CODE)?,
                college_name: clean_text(table.cell(row, columns[1])),
                branch_code: table.cell(row, columns[2]).trim().to_string(),
                branch_name: clean_text(table.cell(row, columns[3])),
                seats,
            });
        }

        if blank > 0 {
            debug!(blank, "skipped blank seat matrix rows");
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<SeatRow>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| SeatRow {
                college_name: clean_text(&row.college_name),
                branch_name: clean_text(&row.branch_name),
                ..row
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SeatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows restricted by college and/or branch code.
    pub fn filter_rows(&self, college_code: Option<u32>, branch_code: Option<&str>) -> Vec<&SeatRow> {
        self.rows
            .iter()
            .filter(|r| college_code.map_or(true, |c| r.college_code == c))
            .filter(|r| branch_code.map_or(true, |b| r.branch_code == b))
            .collect()
    }

    /// One community's seat counts for the restricted rows.
    pub fn select_community_column(
        &self,
        college_code: Option<u32>,
        branch_code: Option<&str>,
        community: Community,
    ) -> Vec<u32> {
        self.filter_rows(college_code, branch_code)
            .into_iter()
            .map(|r| r.seats[community])
            .collect()
    }

    pub fn add(&self, other: &SeatMatrix) -> Result<SeatMatrix, MatrixError> {
        self.combine(other, u32::checked_add, |row, community| MatrixError::SeatOverflow {
            college_code: row.college_code,
            branch_code: row.branch_code.clone(),
            community,
        })
    }

    pub fn subtract(&self, other: &SeatMatrix) -> Result<SeatMatrix, MatrixError> {
        self.combine(other, u32::checked_sub, |row, community| MatrixError::NegativeSeats {
            college_code: row.college_code,
            branch_code: row.branch_code.clone(),
            community,
        })
    }

    /// Element-wise arithmetic on every community column. Rows are matched
    /// by (college, branch) key, so both operands need the same key set but
    /// not the same order. Row order and descriptive columns come from `self`.
    fn combine(
        &self,
        other: &SeatMatrix,
        op: impl Fn(u32, u32) -> Option<u32>,
        on_failure: impl Fn(&SeatRow, Community) -> MatrixError,
    ) -> Result<SeatMatrix, MatrixError> {
        let matched = align(&self.rows, &other.rows)?;

        let mut rows = Vec::with_capacity(self.rows.len());
        for (left, right) in self.rows.iter().zip(matched) {
            let seats = left
                .seats
                .combine(&right.seats, &op)
                .map_err(|community| on_failure(left, community))?;
            rows.push(SeatRow {
                seats,
                ..left.clone()
            });
        }
        Ok(SeatMatrix { rows })
    }

    /// Same keys and names, every seat count zero.
    pub fn zeroed(&self) -> SeatMatrix {
        let rows = self
            .rows
            .iter()
            .map(|r| SeatRow {
                seats: Seats::default(),
                ..r.clone()
            })
            .collect();
        SeatMatrix { rows }
    }

    /// Seats allotted by one round, laid out like `self`.
    fn allotted_in(&self, round: &Round) -> SeatMatrix {
        let mut counts: HashMap<(u32, &str, Community), u32> = HashMap::new();
        for record in round.records() {
            if let Some(community) = record.community() {
                *counts
                    .entry((record.college_code, record.branch_code.as_str(), community))
                    .or_insert(0) += 1;
            }
        }

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut seats = Seats::default();
                for c in Community::ALL {
                    seats[c] = counts
                        .get(&(r.college_code, r.branch_code.as_str(), c))
                        .copied()
                        .unwrap_or(0);
                }
                SeatRow { seats, ..r.clone() }
            })
            .collect();
        SeatMatrix { rows }
    }

    /// Folds the rounds in order, accumulating filled seats (seeded with
    /// zero) and taking remaining seats as capacity minus filled.
    ///
    /// Remaining seats are signed: a round may allot more seats than are
    /// left, and the cell then goes negative. The only failure is a filled
    /// count overflowing `u32`.
    ///
    /// The first snapshot is [`BEFORE_ROUNDS`]; one follows per round.
    pub fn evaluate_rounds(&self, rounds: &[Round]) -> Result<Vec<SeatProgression>, MatrixError> {
        let mut filled = self.zeroed();
        let mut snapshots = Vec::with_capacity(rounds.len() + 1);
        snapshots.push(SeatProgression {
            label: BEFORE_ROUNDS.to_string(),
            remaining: SeatBalance::between(self, &filled)?,
            filled: filled.clone(),
        });

        for round in rounds {
            let allotted = self.allotted_in(round);
            filled = filled.add(&allotted)?;
            let remaining = SeatBalance::between(self, &filled)?;
            debug!(round = round.name(), filled = allotted.total(), "applied round to seat matrix");
            let overdrawn = remaining.overdrawn();
            if overdrawn > 0 {
                warn!(round = round.name(), overdrawn, "seats allotted past capacity");
            }
            snapshots.push(SeatProgression {
                label: format!("After {}", round.name()),
                remaining,
                filled: filled.clone(),
            });
        }
        Ok(snapshots)
    }

    /// Sum of every community column over every row.
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.seats.total()).sum()
    }

    /// One total per distinct college (or college and branch), in first
    /// appearance order. Names come from the first row of each key.
    pub fn totals(&self, level: TotalsLevel) -> Vec<SeatTotal> {
        let mut index: HashMap<(u32, Option<&str>), usize> = HashMap::new();
        let mut totals: Vec<SeatTotal> = Vec::new();

        for row in &self.rows {
            let branch = match level {
                TotalsLevel::College => None,
                TotalsLevel::CollegeBranch => Some(row.branch_code.as_str()),
            };
            let slot = *index.entry((row.college_code, branch)).or_insert_with(|| {
                totals.push(SeatTotal {
                    college_code: row.college_code,
                    college_name: row.college_name.clone(),
                    branch: branch.map(|_| (row.branch_code.clone(), row.branch_name.clone())),
                    total: 0,
                });
                totals.len() - 1
            });
            totals[slot].total += row.seats.total();
        }
        totals
    }

    /// Canonical layout for persistence.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect());
        for row in &self.rows {
            let mut cells = vec![
                Cell::from(row.college_code),
                Cell::text(row.college_name.as_str()),
                Cell::text(row.branch_code.as_str()),
                Cell::text(row.branch_name.as_str()),
            ];
            cells.extend(row.seats.iter().map(|(_, count)| Cell::from(count)));
            table.push_row(cells);
        }
        table
    }
}

fn clean_text(text: &str) -> String {
    strip_line_breaks(text).trim().to_string()
}
