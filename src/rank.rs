//! Rank normalization.
//!
//! Published allotment lists occasionally carry contaminated rank cells
//! (`"R123"`, `"12*"`, `"WITHHELD"`). Every token is turned into a
//! [`RankKey`] that is totally ordered, so records can be sorted and matched
//! across rounds without ever failing on bad input.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, warn};

/// Totally ordered numeric rank used for sorting and candidate identity.
#[derive(Debug, Clone, Copy)]
pub struct RankKey(f64);

impl RankKey {
    /// Key for tokens without any digits; sorts after every real rank.
    pub const UNRANKED: RankKey = RankKey(f64::INFINITY);

    pub const fn new(value: f64) -> Self {
        RankKey(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_unranked(self) -> bool {
        self.0.is_infinite()
    }
}

impl From<u64> for RankKey {
    fn from(value: u64) -> Self {
        RankKey(value as f64)
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for RankKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unranked() {
            f.write_str("unranked")
        } else if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as u64)
        } else {
            let precision = (1..=12)
                .find(|&p| {
                    let scale = 10f64.powi(p);
                    ((self.0 * scale).round() / scale - self.0).abs() < 1e-9
                })
                .unwrap_or(12);
            write!(f, "{:.*}", precision as usize, self.0)
        }
    }
}

/// Converts raw rank tokens of one batch into distinct [`RankKey`]s.
///
/// The collision map records how many times each numeric value has been
/// handed out so far. A contaminated token whose digits repeat an earlier
/// value gets an offset strictly between 0 and 1 (`.1` to `.9`, then `.91`
/// to `.99`, then `.991` and so on), keeping colliding tokens in input order
/// and clear of the next integer. Offset keys are also checked against every
/// key already issued in the batch.
#[derive(Debug, Default)]
pub struct RankNormalizer {
    collisions: HashMap<u64, u32>,
    issued: HashSet<RankKey>,
}

impl RankNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, token: &str) -> RankKey {
        if let Some(value) = parse_plain(token) {
            *self.collisions.entry(value).or_insert(0) += 1;
            let key = RankKey::from(value);
            self.issued.insert(key);
            return key;
        }

        let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.parse::<u64>() {
            Ok(value) => {
                let base = value as f64;
                let count = self.collisions.entry(value).or_insert(0);
                while let Some(offset) = collision_offset(*count) {
                    *count += 1;
                    let key = RankKey(base + offset);
                    if key.0 < base + 1.0 && self.issued.insert(key) {
                        return key;
                    }
                }
                warn!(token, value, "too many rank collisions on one value, sorting it last");
                RankKey::UNRANKED
            }
            Err(_) => {
                debug!(token, "rank token has no usable digits, sorting it last");
                RankKey::UNRANKED
            }
        }
    }

    /// Normalizes a whole batch with a fresh collision map.
    pub fn normalize_batch<'a, I>(tokens: I) -> Vec<RankKey>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut normalizer = RankNormalizer::new();
        tokens.into_iter().map(|t| normalizer.normalize(t)).collect()
    }
}

/// Offset for the `count`-th occurrence of a value, or `None` once `f64`
/// can no longer keep offsets apart.
fn collision_offset(count: u32) -> Option<f64> {
    const MAX_TIERS: u32 = 12;
    if count == 0 {
        return Some(0.0);
    }
    let tier = (count - 1) / 9;
    if tier >= MAX_TIERS {
        return None;
    }
    let digit = f64::from((count - 1) % 9 + 1);
    let tier = tier as i32;
    Some(1.0 - 10f64.powi(-tier) + digit * 10f64.powi(-tier - 1))
}

/// Integer parse, also accepting spreadsheet floats such as `"12.0"`.
fn parse_plain(token: &str) -> Option<u64> {
    let token = token.trim();
    if let Ok(value) = token.parse::<u64>() {
        return Some(value);
    }
    let value = token.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= 9_007_199_254_740_992.0 {
        Some(value as u64)
    } else {
        None
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Plain integer tokens normalize to exactly that integer.
        #[test]
        fn integers_normalize_exactly(values in prop::collection::vec(0u64..10_000_000, 0..50)) {
            let tokens: Vec<String> = values.iter().map(u64::to_string).collect();
            let keys = RankNormalizer::normalize_batch(tokens.iter().map(String::as_str));
            for (value, key) in values.iter().zip(keys) {
                prop_assert_eq!(key.value(), *value as f64);
            }
        }

        /// Colliding contaminated tokens stay distinct, keep input order and
        /// never reach the next integer.
        #[test]
        fn collisions_are_distinct_and_ordered(value in 1u64..100_000, prefixes in prop::collection::vec("[A-Z]{1,3}", 1..40)) {
            let mut tokens = vec![value.to_string()];
            tokens.extend(prefixes.iter().map(|p| format!("{}{}", p, value)));
            tokens.push((value + 1).to_string());
            let keys = RankNormalizer::normalize_batch(tokens.iter().map(String::as_str));
            for pair in keys.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            prop_assert_eq!(keys.iter().collect::<HashSet<_>>().len(), keys.len());
        }

        /// Tokens without digits sort after every parsed key of the batch.
        #[test]
        fn unparseable_sorts_after_parsed(values in prop::collection::vec(0u64..1_000_000, 1..30), junk in "[A-Za-z ]{0,8}") {
            let mut tokens: Vec<String> = values.iter().map(u64::to_string).collect();
            tokens.push(junk);
            let keys = RankNormalizer::normalize_batch(tokens.iter().map(String::as_str));
            let last = *keys.last().unwrap();
            for key in &keys[..keys.len() - 1] {
                prop_assert!(*key < last);
            }
        }
    }
}
