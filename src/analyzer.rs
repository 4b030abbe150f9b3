use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::error::{MatrixError, Result};
use crate::models::{AllotmentRecord, Community};
use crate::rank::RankKey;
use crate::rank_list::MergedRankList;
use crate::round::{RecordSet, Round, BRANCH_CODE, COLLEGE_CODE};
use crate::seat_matrix::{SeatMatrix, SeatProgression, Seats, BRANCH_NAME, COLLEGE_NAME};
use crate::table::{Cell, RawTable, RenameMap, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    College,
    CollegeBranch,
    CollegeBranchCommunity(Community),
}

impl Granularity {
    pub fn has_branch(self) -> bool {
        !matches!(self, Granularity::College)
    }

    pub fn community(self) -> Option<Community> {
        match self {
            Granularity::CollegeBranchCommunity(c) => Some(c),
            _ => None,
        }
    }
}

/// What a round's Filled % is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denominator {
    /// Seats the group holds in the merged rank list.
    Filled,
    /// The group's capacity.
    Total,
}

/// Which community columns make up Total Available.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CapacityBasis {
    #[default]
    AllCommunities,
    Only(Vec<Community>),
}

impl CapacityBasis {
    fn seats(&self, seats: &Seats) -> u64 {
        match self {
            CapacityBasis::AllCommunities => seats.total(),
            CapacityBasis::Only(communities) => seats.total_of(communities),
        }
    }
}

/// Whether a report's percentages are running sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cumulation {
    Applied,
    NotRequested,
    /// Requested, but there are fewer than two rounds to accumulate over.
    SkippedSingleRound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillOptions {
    pub granularity: Granularity,
    pub denominator: Denominator,
    pub cutoffs: bool,
    pub cumulative: bool,
    pub capacity: CapacityBasis,
}

impl FillOptions {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            denominator: Denominator::Filled,
            cutoffs: false,
            cumulative: false,
            capacity: CapacityBasis::AllCommunities,
        }
    }

    pub fn denominator(mut self, denominator: Denominator) -> Self {
        self.denominator = denominator;
        self
    }

    pub fn with_cutoffs(mut self) -> Self {
        self.cutoffs = true;
        self
    }

    pub fn cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    pub fn capacity(mut self, capacity: CapacityBasis) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Aggregates of the records falling into one group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupStats {
    pub count: usize,
    pub lowest_mark: Option<f64>,
    pub highest_mark: Option<f64>,
    pub total_mark: f64,
    /// Best (numerically smallest) rank.
    pub opening_rank: Option<RankKey>,
    /// Worst (numerically largest) rank.
    pub closing_rank: Option<RankKey>,
}

impl GroupStats {
    fn push(&mut self, record: &AllotmentRecord) {
        let mark = record.cutoff_mark;
        self.count += 1;
        self.total_mark += mark;
        self.lowest_mark = Some(self.lowest_mark.map_or(mark, |m| m.min(mark)));
        self.highest_mark = Some(self.highest_mark.map_or(mark, |m| m.max(mark)));
        self.opening_rank = Some(self.opening_rank.map_or(record.rank, |r| r.min(record.rank)));
        self.closing_rank = Some(self.closing_rank.map_or(record.rank, |r| r.max(record.rank)));
    }

    pub fn average_mark(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_mark / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CellKey {
    college_code: u32,
    branch_code: Option<String>,
    community: Option<Community>,
}

/// Records of one set bucketed by every (college, branch?, community?) cell.
#[derive(Debug, Clone, Default)]
struct GroupIndex {
    cells: HashMap<CellKey, GroupStats>,
}

impl GroupIndex {
    fn build<'a>(records: impl IntoIterator<Item = &'a AllotmentRecord>) -> Self {
        let mut cells: HashMap<CellKey, GroupStats> = HashMap::new();
        for record in records {
            let community = record.community();
            let branches = [None, Some(record.branch_code.clone())];
            for branch_code in branches {
                let mut communities = vec![None];
                if community.is_some() {
                    communities.push(community);
                }
                for community in communities {
                    let key = CellKey {
                        college_code: record.college_code,
                        branch_code: branch_code.clone(),
                        community,
                    };
                    cells.entry(key).or_default().push(record);
                }
            }
        }
        Self { cells }
    }

    fn get(&self, college_code: u32, branch_code: Option<&str>, community: Option<Community>) -> GroupStats {
        let key = CellKey {
            college_code,
            branch_code: branch_code.map(str::to_string),
            community,
        };
        self.cells.get(&key).copied().unwrap_or_default()
    }
}

/// One output row's identity, taken from the seat matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupId {
    pub college_code: u32,
    pub college_name: String,
    /// `(code, name)` for branch-level groups.
    pub branch: Option<(String, String)>,
}

impl GroupId {
    pub fn branch_code(&self) -> Option<&str> {
        self.branch.as_ref().map(|(code, _)| code.as_str())
    }

    pub(crate) fn identity_cells(&self) -> Vec<Cell> {
        let mut cells = vec![Cell::from(self.college_code), Cell::text(self.college_name.as_str())];
        if let Some((code, name)) = &self.branch {
            cells.push(Cell::text(code.as_str()));
            cells.push(Cell::text(name.as_str()));
        }
        cells
    }
}

pub(crate) fn identity_columns(branch: bool) -> Vec<String> {
    let mut columns = vec![COLLEGE_CODE.to_string(), COLLEGE_NAME.to_string()];
    if branch {
        columns.push(BRANCH_CODE.to_string());
        columns.push(BRANCH_NAME.to_string());
    }
    columns
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffSummary {
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
}

impl CutoffSummary {
    /// All zero when the group had no records.
    fn from_stats(stats: &GroupStats) -> Self {
        Self {
            lowest: stats.lowest_mark.unwrap_or(0.0),
            highest: stats.highest_mark.unwrap_or(0.0),
            average: stats.average_mark().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundFill {
    pub filled: usize,
    pub percent: f64,
    pub cutoffs: Option<CutoffSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillRow {
    pub group: GroupId,
    pub rounds: Vec<RoundFill>,
    pub total_available: u64,
    pub total_filled: u64,
    pub total_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillReport {
    pub options: FillOptions,
    pub round_names: Vec<String>,
    pub cumulation: Cumulation,
    pub rows: Vec<FillRow>,
}

impl FillReport {
    pub fn to_table(&self) -> Table {
        let mut columns = identity_columns(self.options.granularity.has_branch());
        for name in &self.round_names {
            columns.push(name.clone());
            columns.push(format!("{} Filled %", name));
            if self.options.cutoffs {
                columns.push(format!("{} Lowest Cutoff", name));
                columns.push(format!("{} Highest Cutoff", name));
                columns.push(format!("{} Average Cutoff", name));
            }
        }
        columns.extend(["Total Available", "Total Filled", "Total % Filled"].map(String::from));

        let mut table = Table::new(columns);
        for row in &self.rows {
            let mut cells = row.group.identity_cells();
            for fill in &row.rounds {
                cells.push(Cell::from(fill.filled as u64));
                cells.push(Cell::from(fill.percent));
                if let Some(cutoffs) = fill.cutoffs {
                    cells.push(Cell::from(cutoffs.lowest));
                    cells.push(Cell::from(cutoffs.highest));
                    cells.push(Cell::from(cutoffs.average));
                }
            }
            cells.push(Cell::from(row.total_available));
            cells.push(Cell::from(row.total_filled));
            cells.push(Cell::from(row.total_percent));
            table.push_row(cells);
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommunityShare {
    pub community: Community,
    pub filled: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRow {
    pub group: GroupId,
    pub shares: Vec<CommunityShare>,
    pub total_filled: u64,
    pub total_available: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommunityDistribution {
    pub rows: Vec<DistributionRow>,
}

impl CommunityDistribution {
    pub fn to_table(&self) -> Table {
        let mut columns = identity_columns(false);
        for community in Community::ALL {
            columns.push(community.to_string());
            columns.push(format!("{} Filled %", community));
        }
        columns.extend(["Total Filled", "Total Available"].map(String::from));

        let mut table = Table::new(columns);
        for row in &self.rows {
            let mut cells = row.group.identity_cells();
            for share in &row.shares {
                cells.push(Cell::from(share.filled as u64));
                cells.push(Cell::from(share.percent));
            }
            cells.push(Cell::from(row.total_filled));
            cells.push(Cell::from(row.total_available));
            table.push_row(cells);
        }
        table
    }
}

/// Everything the reports are computed from, built once per analysis.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    rounds: Vec<Round>,
    rank_list: MergedRankList,
    seat_matrix: SeatMatrix,
    round_index: Vec<GroupIndex>,
    merged_index: GroupIndex,
}

impl AnalysisContext {
    /// Orders the rounds by sequence and builds the merged rank list.
    pub fn new(mut rounds: Vec<Round>, seat_matrix: SeatMatrix) -> Self {
        rounds.sort_by_key(Round::sequence);
        let rank_list = MergedRankList::from_rounds(&rounds);
        let round_index = rounds.iter().map(|r| GroupIndex::build(r.records())).collect();
        let merged_index = GroupIndex::build(rank_list.records());

        info!(
            rounds = rounds.len(),
            candidates = rank_list.len(),
            seat_rows = seat_matrix.len(),
            "built analysis context"
        );

        Self {
            rounds,
            rank_list,
            seat_matrix,
            round_index,
            merged_index,
        }
    }

    /// Builds rounds and the seat matrix from raw tables, in the given order.
    pub fn from_tables(
        rounds: Vec<(String, RawTable)>,
        seat_matrix: RawTable,
        round_columns: &RenameMap,
        seat_matrix_columns: &RenameMap,
    ) -> Result<Self> {
        let seat_matrix = SeatMatrix::from_table(seat_matrix, seat_matrix_columns)?;
        let rounds = rounds
            .into_iter()
            .enumerate()
            .map(|(index, (name, table))| Round::from_table(name, index + 1, table, round_columns))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(rounds, seat_matrix))
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn rank_list(&self) -> &MergedRankList {
        &self.rank_list
    }

    pub fn seat_matrix(&self) -> &SeatMatrix {
        &self.seat_matrix
    }

    pub fn round_names(&self) -> Vec<String> {
        self.rounds.iter().map(|r| r.name().to_string()).collect()
    }

    /// Distinct groups of the seat matrix in first appearance order.
    pub fn groups(&self, branch: bool) -> Vec<GroupId> {
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for row in self.seat_matrix.rows() {
            let group = GroupId {
                college_code: row.college_code,
                college_name: row.college_name.clone(),
                branch: branch.then(|| (row.branch_code.clone(), row.branch_name.clone())),
            };
            let key = (group.college_code, group.college_name.clone(), group.branch.clone());
            if seen.insert(key) {
                groups.push(group);
            }
        }
        groups
    }

    /// Capacity summed over every seat row sharing the group's codes.
    pub fn capacity(&self, group: &GroupId, measure: impl Fn(&Seats) -> u64) -> u64 {
        self.seat_matrix
            .filter_rows(Some(group.college_code), group.branch_code())
            .into_iter()
            .map(|row| measure(&row.seats))
            .sum()
    }

    pub fn round_stats(&self, round: usize, group: &GroupId, community: Option<Community>) -> GroupStats {
        self.round_index
            .get(round)
            .map(|index| index.get(group.college_code, group.branch_code(), community))
            .unwrap_or_default()
    }

    pub fn merged_stats(&self, group: &GroupId, community: Option<Community>) -> GroupStats {
        self.merged_index
            .get(group.college_code, group.branch_code(), community)
    }

    fn cumulation(&self, requested: bool) -> Cumulation {
        if !requested {
            Cumulation::NotRequested
        } else if self.rounds.len() < 2 {
            warn!(rounds = self.rounds.len(), "cumulative filling needs at least two rounds, reporting per round");
            Cumulation::SkippedSingleRound
        } else {
            Cumulation::Applied
        }
    }

    /// Round-wise filling at the requested granularity.
    pub fn fill_report(&self, options: &FillOptions) -> FillReport {
        let community = options.granularity.community();
        let cumulation = self.cumulation(options.cumulative);

        let rows: Vec<FillRow> = self
            .groups(options.granularity.has_branch())
            .into_iter()
            .map(|group| {
                // Step 1: capacity and the Filled % denominator
                let total_available = match community {
                    Some(c) => self.capacity(&group, |seats| u64::from(seats[c])),
                    None => self.capacity(&group, |seats| options.capacity.seats(seats)),
                };
                let denominator = match options.denominator {
                    Denominator::Filled => self.merged_stats(&group, community).count as f64,
                    Denominator::Total => total_available as f64,
                };

                // Step 2: per-round counts, running sum when cumulative
                let mut running = 0.0;
                let rounds: Vec<RoundFill> = (0..self.rounds.len())
                    .map(|round| {
                        let stats = self.round_stats(round, &group, community);
                        let mut value = percent(stats.count as f64, denominator);
                        if cumulation == Cumulation::Applied {
                            running += value;
                            value = running;
                        }
                        RoundFill {
                            filled: stats.count,
                            percent: value,
                            cutoffs: options.cutoffs.then(|| CutoffSummary::from_stats(&stats)),
                        }
                    })
                    .collect();

                // Step 3: totals
                let total_filled: u64 = rounds.iter().map(|r| r.filled as u64).sum();
                FillRow {
                    group,
                    rounds,
                    total_available,
                    total_filled,
                    total_percent: percent(total_filled as f64, total_available as f64),
                }
            })
            .collect();

        debug!(granularity = ?options.granularity, rows = rows.len(), "computed fill report");
        FillReport {
            options: options.clone(),
            round_names: self.round_names(),
            cumulation,
            rows,
        }
    }

    /// Per college, how the merged rank list's seats split across communities.
    pub fn community_distribution(&self) -> CommunityDistribution {
        let rows: Vec<DistributionRow> = self
            .groups(false)
            .into_iter()
            .map(|group| {
                let counts: Vec<(Community, usize)> = Community::ALL
                    .into_iter()
                    .map(|c| (c, self.merged_stats(&group, Some(c)).count))
                    .collect();
                let total_filled: u64 = counts.iter().map(|(_, n)| *n as u64).sum();
                let shares = counts
                    .into_iter()
                    .map(|(community, filled)| CommunityShare {
                        community,
                        filled,
                        percent: percent(filled as f64, total_filled as f64),
                    })
                    .collect();
                let total_available = self.capacity(&group, Seats::total);
                DistributionRow {
                    group,
                    shares,
                    total_filled,
                    total_available,
                }
            })
            .collect();

        debug!(rows = rows.len(), "computed community distribution");
        CommunityDistribution { rows }
    }

    pub fn seat_progression(&self) -> std::result::Result<Vec<SeatProgression>, MatrixError> {
        self.seat_matrix.evaluate_rounds(&self.rounds)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::round::tests::record;
    use crate::seat_matrix::tests::seat_row;

    /// Two colleges, three seat rows, two rounds with one upgraded candidate.
    pub(crate) fn context() -> AnalysisContext {
        let matrix = SeatMatrix::from_rows(vec![
            seat_row(1, "Alpha", "CS", [2, 2, 0, 0, 0, 0, 0]),
            seat_row(1, "Alpha", "EC", [1, 1, 0, 0, 0, 0, 0]),
            seat_row(2, "Beta", "CS", [2, 0, 0, 0, 0, 0, 0]),
        ]);
        let rounds = vec![
            Round::from_records(
                "Round 2",
                2,
                vec![record(3, 1, "CS", "OC", 180.0), record(4, 1, "EC", "BC", 170.0)],
            ),
            Round::from_records(
                "Round 1",
                1,
                vec![
                    record(1, 1, "CS", "OC", 200.0),
                    record(2, 2, "CS", "OC", 190.0),
                    record(3, 2, "CS", "OC", 180.0),
                ],
            ),
        ];
        AnalysisContext::new(rounds, matrix)
    }

    #[test]
    fn rounds_are_ordered_by_sequence() {
        let ctx = context();
        assert_eq!(ctx.round_names(), vec!["Round 1", "Round 2"]);
        assert_eq!(ctx.rank_list().len(), 4);
    }

    #[test]
    fn college_fill_by_filled_non_cumulative() {
        let ctx = context();
        let report = ctx.fill_report(&FillOptions::new(Granularity::College));
        assert_eq!(report.cumulation, Cumulation::NotRequested);
        assert_eq!(report.rows.len(), 2);

        let alpha = &report.rows[0];
        assert_eq!(alpha.group.college_code, 1);
        // merged: ranks 1, 3 (upgraded into college 1), 4 -> 3 filled
        assert_eq!(alpha.rounds[0].filled, 1);
        assert!((alpha.rounds[0].percent - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(alpha.rounds[1].filled, 2);
        assert_eq!(alpha.total_available, 6);
        assert_eq!(alpha.total_filled, 3);
        assert!((alpha.total_percent - 50.0).abs() < 1e-9);

        let beta = &report.rows[1];
        // rank 3 moved away, one merged record left
        assert!((beta.rounds[0].percent - 200.0).abs() < 1e-9);
    }

    #[test]
    fn cumulative_by_total_with_cutoffs() {
        let ctx = context();
        let options = FillOptions::new(Granularity::CollegeBranch)
            .denominator(Denominator::Total)
            .cumulative(true)
            .with_cutoffs();
        let report = ctx.fill_report(&options);
        assert_eq!(report.cumulation, Cumulation::Applied);

        let alpha_cs = &report.rows[0];
        assert_eq!(alpha_cs.group.branch_code(), Some("CS"));
        assert!((alpha_cs.rounds[0].percent - 25.0).abs() < 1e-9);
        assert!((alpha_cs.rounds[1].percent - 50.0).abs() < 1e-9);
        let cutoffs = alpha_cs.rounds[0].cutoffs.unwrap();
        assert_eq!((cutoffs.lowest, cutoffs.highest), (200.0, 200.0));

        let alpha_ec = &report.rows[1];
        assert_eq!(alpha_ec.rounds[0].cutoffs, Some(CutoffSummary { lowest: 0.0, highest: 0.0, average: 0.0 }));

        let table = report.to_table();
        assert_eq!(table.columns.len(), 4 + 2 * 5 + 3);
        assert_eq!(table.columns[6], "Round 1 Lowest Cutoff");
    }

    #[test]
    fn community_granularity_uses_one_column() {
        let ctx = context();
        let report = ctx.fill_report(&FillOptions::new(Granularity::CollegeBranchCommunity(Community::Bc)));
        let alpha_cs = &report.rows[0];
        assert_eq!(alpha_cs.total_available, 2);
        assert_eq!(alpha_cs.total_filled, 0);
        let alpha_ec = &report.rows[1];
        assert_eq!(alpha_ec.rounds[1].filled, 1);
        assert!((alpha_ec.rounds[1].percent - 100.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_basis_restricts_total_available() {
        let ctx = context();
        let options = FillOptions::new(Granularity::College).capacity(CapacityBasis::Only(vec![Community::Oc]));
        let report = ctx.fill_report(&options);
        assert_eq!(report.rows[0].total_available, 3);
    }

    #[test]
    fn single_round_cumulative_is_skipped() {
        let matrix = SeatMatrix::from_rows(vec![seat_row(1, "Alpha", "CS", [4, 0, 0, 0, 0, 0, 0])]);
        let round = Round::from_records(
            "Round 1",
            1,
            vec![record(1, 1, "CS", "OC", 200.0), record(2, 1, "CS", "OC", 190.0)],
        );
        let ctx = AnalysisContext::new(vec![round], matrix);
        let options = FillOptions::new(Granularity::College).denominator(Denominator::Total).cumulative(true);
        let report = ctx.fill_report(&options);
        assert_eq!(report.cumulation, Cumulation::SkippedSingleRound);
        assert!((report.rows[0].rounds[0].percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_gives_zero_percent() {
        let matrix = SeatMatrix::from_rows(vec![seat_row(1, "Alpha", "CS", [0; 7])]);
        let round = Round::from_records("Round 1", 1, vec![record(1, 1, "CS", "OC", 200.0)]);
        let ctx = AnalysisContext::new(vec![round], matrix);
        let report = ctx.fill_report(&FillOptions::new(Granularity::College).denominator(Denominator::Total));
        assert_eq!(report.rows[0].total_available, 0);
        assert_eq!(report.rows[0].total_percent, 0.0);
        assert_eq!(report.rows[0].rounds[0].percent, 0.0);
    }

    #[test]
    fn empty_rounds_give_zero_rows() {
        let ctx = AnalysisContext::new(Vec::new(), SeatMatrix::from_rows(vec![seat_row(1, "Alpha", "CS", [1; 7])]));
        let report = ctx.fill_report(&FillOptions::new(Granularity::College));
        assert_eq!(report.rows.len(), 1);
        assert!(report.rows[0].rounds.is_empty());
        assert_eq!(report.rows[0].total_filled, 0);
    }

    #[test]
    fn community_distribution_shares() {
        let ctx = context();
        let dist = ctx.community_distribution();
        let alpha = &dist.rows[0];
        assert_eq!(alpha.total_filled, 3);
        assert_eq!(alpha.total_available, 6);
        assert_eq!(alpha.shares[0].filled, 2);
        assert!((alpha.shares[1].percent - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(alpha.shares[2].percent, 0.0);

        let table = dist.to_table();
        assert_eq!(table.columns[2], "OC");
        assert_eq!(table.columns[3], "OC Filled %");
        assert_eq!(table.columns.last().map(String::as_str), Some("Total Available"));
    }

    #[test]
    fn from_tables_reports_schema_errors() {
        let seats = RawTable::from_rows(
            &crate::seat_matrix::CANONICAL_COLUMNS,
            &[["1", "Alpha", "CS", "Comp", "1", "0", "0", "0", "0", "0", "0"]],
        );
        let good = RawTable::from_rows(
            &["Rank", "College Code", "Branch Code", "Allotted Community", "Cutoff Mark"],
            &[["1", "1", "CS", "OC", "199"]],
        );
        let ctx = AnalysisContext::from_tables(
            vec![("Round 1".to_string(), good.clone())],
            seats.clone(),
            &RenameMap::new(),
            &RenameMap::new(),
        )
        .unwrap();
        assert_eq!(ctx.rounds()[0].sequence(), 1);
        assert_eq!(ctx.rank_list().len(), 1);

        let bad = RawTable::from_rows(&["Rank"], &[["1"]]);
        let err = AnalysisContext::from_tables(
            vec![("Round 1".to_string(), good), ("Round 2".to_string(), bad)],
            seats,
            &RenameMap::new(),
            &RenameMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::error::AnalyzerError::Schema(SchemaError::MissingColumns { .. })));
    }

    #[test]
    fn groups_deduplicate_by_code_and_name() {
        let ctx = context();
        assert_eq!(ctx.groups(false).len(), 2);
        assert_eq!(ctx.groups(true).len(), 3);
    }

    #[test]
    fn seat_progression_follows_rounds() {
        let ctx = context();
        let steps = ctx.seat_progression().unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].label, "After Round 1");
        assert_eq!(steps[2].filled.total(), 5);
    }
}
