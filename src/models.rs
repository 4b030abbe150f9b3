use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rank::RankKey;

/// Reservation category with its own seat quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Community {
    Oc,
    Bc,
    Bcm,
    Mbc,
    Sc,
    Sca,
    St,
}

impl Community {
    /// Canonical column order of every seat matrix.
    pub const ALL: [Community; 7] = [
        Community::Oc,
        Community::Bc,
        Community::Bcm,
        Community::Mbc,
        Community::Sc,
        Community::Sca,
        Community::St,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Community::Oc => "OC",
            Community::Bc => "BC",
            Community::Bcm => "BCM",
            Community::Mbc => "MBC",
            Community::Sc => "SC",
            Community::Sca => "SCA",
            Community::St => "ST",
        }
    }

    /// Position of this community's column inside a seat row.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category code outside the seven reservation communities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown community '{0}'")]
pub struct UnknownCommunity(pub String);

impl FromStr for Community {
    type Err = UnknownCommunity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        Community::ALL
            .into_iter()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| UnknownCommunity(s.to_string()))
    }
}

/// One candidate-to-seat assignment within a round.
#[derive(Debug, Clone, PartialEq)]
pub struct AllotmentRecord {
    pub rank: RankKey,
    pub college_code: u32,
    pub branch_code: String,
    pub allotted_community: String,
    pub cutoff_mark: f64,
}

impl AllotmentRecord {
    /// The allotted category, if it names one of the seven quotas.
    pub fn community(&self) -> Option<Community> {
        self.allotted_community.parse().ok()
    }
}

/// Where one round's allotment list is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSource {
    pub name: String,
    /// File path (`.csv`, `.html`) or `http(s)://` URL.
    pub source: String,
}

/// Year-over-year seat matrix comparison inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    pub previous: String,
    pub current: String,
    pub previous_label: Option<String>,
    pub current_label: Option<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub year: String,
    pub output_directory: Option<String>,
    pub seat_matrix: String,
    /// Communities that get their own college/branch/community report.
    pub communities: Option<Vec<Community>>,
    pub rounds: Vec<RoundSource>,
    #[serde(default)]
    pub round_columns: BTreeMap<String, String>,
    #[serde(default)]
    pub seat_matrix_columns: BTreeMap<String, String>,
    pub compare: Option<CompareConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let round_columns = [
            ("COMMUNITY", "Community"),
            ("AGGR MARK", "Cutoff Mark"),
            ("COLLEGE CODE", "College Code"),
            ("BRANCH CODE", "Branch Code"),
            ("ALLOTTED CATEGORY", "Allotted Community"),
            ("RANK", "Rank"),
            ("NAME OF THE CANDIDATE", "Name"),
            ("S NO", "Serial Number"),
            ("APPLN NO", "Application Number"),
        ];
        let seat_matrix_columns = [
            ("COLLEGE CODE", "College Code"),
            ("COLLEGE NAME", "College Name"),
            ("BRANCH", "Branch Code"),
            ("BRANCH NAME", "Branch Name"),
        ];

        Self {
            year: "2024".to_string(),
            output_directory: Some("output".to_string()),
            seat_matrix: "inputs/SeatMatrix.csv".to_string(),
            communities: Some(Community::ALL.to_vec()),
            rounds: (1..=3)
                .map(|i| RoundSource {
                    name: format!("Round {}", i),
                    source: format!("inputs/RankList {}.csv", i),
                })
                .collect(),
            round_columns: round_columns
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            seat_matrix_columns: seat_matrix_columns
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            compare: None,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    pub fn communities(&self) -> Vec<Community> {
        self.communities
            .clone()
            .unwrap_or_else(|| Community::ALL.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn community_parses_case_insensitively() {
        assert_eq!(" bcm ".parse::<Community>(), Ok(Community::Bcm));
        assert_eq!("SCA".parse::<Community>(), Ok(Community::Sca));
        assert!("GT".parse::<Community>().is_err());
    }

    #[test]
    fn unknown_community_names_the_raw_code() {
        let err = " gt".parse::<Community>().unwrap_err();
        assert_eq!(err, UnknownCommunity(" gt".to_string()));
        assert_eq!(err.to_string(), "unknown community ' gt'");
        fn is_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        is_error(&err);
    }

    #[test]
    fn community_index_follows_canonical_order() {
        for (i, c) in Community::ALL.into_iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.rounds.len(), 3);
        assert_eq!(back.communities(), Community::ALL.to_vec());
        assert_eq!(back.seat_matrix_columns.get("BRANCH").map(String::as_str), Some("Branch Code"));
    }

    #[test]
    fn record_community_is_optional() {
        let mut record = AllotmentRecord {
            rank: RankKey::from(4),
            college_code: 1,
            branch_code: "CS".to_string(),
            allotted_community: "MBC".to_string(),
            cutoff_mark: 190.5,
        };
        assert_eq!(record.community(), Some(Community::Mbc));
        record.allotted_community = "MBCV".to_string();
        assert_eq!(record.community(), None);
    }
}
