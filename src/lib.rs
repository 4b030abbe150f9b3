//! Counselling allotment analysis.
//!
//! Per-round allotment lists and a seat matrix go in; round-wise filling
//! reports, seat progression snapshots, summary forms and year-over-year
//! seat comparisons come out as [`table::Table`]s.

pub mod analyzer;
pub mod diff;
pub mod error;
pub mod forms;
pub mod models;
pub mod rank;
pub mod rank_list;
pub mod round;
pub mod scraper;
pub mod seat_matrix;
pub mod table;

pub use analyzer::{
    AnalysisContext, CapacityBasis, CommunityDistribution, Cumulation, Denominator, FillOptions, FillReport,
    Granularity,
};
pub use diff::{compare, compare_matrices, Change, SeatTotal, SnapshotDiff, TotalsLevel, YearLabels};
pub use error::{AnalyzerError, MatrixError, SchemaError};
pub use models::{AllotmentRecord, Community, Config};
pub use rank::{RankKey, RankNormalizer};
pub use rank_list::MergedRankList;
pub use round::{RecordFilter, RecordSet, Round};
pub use seat_matrix::{SeatBalance, SeatMatrix, SeatProgression};
pub use table::{Cell, RawTable, Table};
