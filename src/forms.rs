//! Fixed-layout summary forms built on top of the fill reports.

use tracing::debug;

use crate::analyzer::{identity_columns, percent, AnalysisContext, Denominator, FillOptions, Granularity};
use crate::models::Community;
use crate::rank::RankKey;
use crate::table::{Cell, Table};

/// Rank cell that reads 0 when the round had nobody in the group.
fn rank_or_zero(rank: Option<RankKey>) -> Cell {
    rank.map_or(Cell::Int(0), Cell::Rank)
}

impl AnalysisContext {
    /// College-wise filling with opening and closing ranks per round.
    pub fn form1(&self) -> Table {
        let report = self.fill_report(&FillOptions::new(Granularity::College).cumulative(true));

        let mut columns = identity_columns(false);
        for name in &report.round_names {
            columns.push(name.clone());
            columns.push(format!("{} Filled %", name));
            columns.push(format!("Opening Rank for {}", name));
            columns.push(format!("Closing Rank for {}", name));
        }
        columns.extend(
            ["Total Filled", "Remaining Seats", "Remaining %", "Total Available", "Average Cutoff"].map(String::from),
        );

        let mut table = Table::new(columns);
        for row in &report.rows {
            let mut cells = row.group.identity_cells();
            for (round, fill) in row.rounds.iter().enumerate() {
                let stats = self.round_stats(round, &row.group, None);
                cells.push(Cell::from(fill.filled as u64));
                cells.push(Cell::from(fill.percent));
                cells.push(rank_or_zero(stats.opening_rank));
                cells.push(rank_or_zero(stats.closing_rank));
            }

            let remaining = row.total_available as i64 - row.total_filled as i64;
            let average = self.merged_stats(&row.group, None).average_mark().unwrap_or(0.0);
            cells.push(Cell::from(row.total_filled));
            cells.push(Cell::from(remaining));
            cells.push(Cell::from(percent(remaining as f64, row.total_available as f64)));
            cells.push(Cell::from(row.total_available));
            cells.push(Cell::from(average));
            table.push_row(cells);
        }

        debug!(rows = table.rows.len(), "built form 1");
        table
    }

    /// Branch-wise capacity, cumulative fill against capacity, and cutoff range.
    pub fn form2(&self) -> Table {
        let options = FillOptions::new(Granularity::CollegeBranch)
            .denominator(Denominator::Total)
            .cumulative(true);
        let report = self.fill_report(&options);

        let mut columns = identity_columns(true);
        columns.extend(Community::ALL.iter().map(Community::to_string));
        columns.push("Total Available".to_string());
        columns.extend(report.round_names.iter().map(|name| format!("{} Filled %", name)));
        columns.extend(["Highest Cutoff", "Lowest Cutoff", "Average Cutoff"].map(String::from));

        let mut table = Table::new(columns);
        for row in &report.rows {
            let mut cells = row.group.identity_cells();
            for community in Community::ALL {
                cells.push(Cell::from(self.capacity(&row.group, |seats| u64::from(seats[community]))));
            }
            cells.push(Cell::from(row.total_available));
            cells.extend(row.rounds.iter().map(|fill| Cell::from(fill.percent)));

            let merged = self.merged_stats(&row.group, None);
            cells.push(Cell::from(merged.highest_mark));
            cells.push(Cell::from(merged.lowest_mark));
            cells.push(Cell::from(merged.average_mark()));
            table.push_row(cells);
        }

        debug!(rows = table.rows.len(), "built form 2");
        table
    }

    /// Opening and closing rank and mark per branch and community.
    pub fn form3(&self) -> Table {
        let columns = [
            "College Code",
            "College Name",
            "Branch Code",
            "Branch Name",
            "Community",
            "Opening Rank",
            "Opening Cutoff",
            "Closing Rank",
            "Closing Cutoff",
        ];
        let mut table = Table::new(columns.map(String::from).to_vec());

        for group in self.groups(true) {
            for community in Community::ALL {
                let stats = self.merged_stats(&group, Some(community));
                let mut cells = group.identity_cells();
                cells.push(Cell::text(community.as_str()));
                cells.push(Cell::from(stats.opening_rank));
                cells.push(Cell::from(stats.highest_mark));
                cells.push(Cell::from(stats.closing_rank));
                cells.push(Cell::from(stats.lowest_mark));
                table.push_row(cells);
            }
        }

        debug!(rows = table.rows.len(), "built form 3");
        table
    }
}
