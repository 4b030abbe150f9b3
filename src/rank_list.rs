//! The candidate pool across every round.

use std::collections::HashMap;

use tracing::warn;

use crate::models::AllotmentRecord;
use crate::rank::RankKey;
use crate::round::{RecordSet, Round};

/// Who ultimately holds which seat: one record per rank, later rounds win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRankList {
    records: Vec<AllotmentRecord>,
}

impl MergedRankList {
    /// Merges rounds in iteration order; a rank seen again replaces the
    /// earlier record.
    pub fn from_rounds(rounds: &[Round]) -> Self {
        let mut latest: HashMap<RankKey, &AllotmentRecord> = HashMap::new();
        let mut unranked = 0usize;

        for record in rounds.iter().flat_map(|r| r.records()) {
            if record.rank.is_unranked() {
                unranked += 1;
            }
            latest.insert(record.rank, record);
        }

        if unranked > 1 {
            warn!(unranked, "records without a usable rank collapse into one entry");
        }

        let mut records: Vec<AllotmentRecord> = latest.into_values().cloned().collect();
        records.sort_by_key(|r| r.rank);
        Self { records }
    }
}

impl RecordSet for MergedRankList {
    fn records(&self) -> &[AllotmentRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Community;
    use crate::round::tests::record;
    use crate::round::RecordFilter;

    fn rounds() -> Vec<Round> {
        vec![
            Round::from_records(
                "Round 1",
                1,
                vec![record(1, 1, "CS", "OC", 200.0), record(2, 1, "EC", "BC", 199.0)],
            ),
            Round::from_records(
                "Round 2",
                2,
                vec![record(2, 2, "CS", "BC", 199.0), record(5, 2, "ME", "SC", 180.0)],
            ),
            Round::from_records("Round 3", 3, vec![record(2, 3, "CS", "MBC", 199.0)]),
        ]
    }

    #[test]
    fn last_round_wins() {
        let merged = MergedRankList::from_rounds(&rounds());
        assert_eq!(merged.len(), 3);
        let two = merged.records().iter().find(|r| r.rank == RankKey::from(2)).unwrap();
        assert_eq!(two.college_code, 3);
        assert_eq!(two.allotted_community, "MBC");
    }

    #[test]
    fn merged_list_is_sorted_by_rank() {
        let merged = MergedRankList::from_rounds(&rounds());
        let ranks: Vec<RankKey> = merged.records().iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![RankKey::from(1), RankKey::from(2), RankKey::from(5)]);
    }

    #[test]
    fn filter_contract_matches_round() {
        let merged = MergedRankList::from_rounds(&rounds());
        assert_eq!(merged.count(&RecordFilter::new().college(1)), 1);
        assert_eq!(merged.count(&RecordFilter::new().community(Community::Mbc)), 1);
        assert_eq!(merged.filter(&RecordFilter::new()).len(), 3);
    }

    #[test]
    fn no_rounds_gives_empty_list() {
        let merged = MergedRankList::from_rounds(&[]);
        assert!(merged.is_empty());
    }
}
