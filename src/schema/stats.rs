//! Stat vector and the mood derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::scene::Impact;

/// Lowest value any stat can hold.
pub const STAT_MIN: u8 = 0;
/// Highest value any stat can hold.
pub const STAT_MAX: u8 = 100;

/// Average above which the reader is happy.
const HAPPY_ABOVE: f64 = 75.0;
/// Average below which the reader is sad.
const SAD_BELOW: f64 = 25.0;

/// The stats every story starts with unless configured otherwise.
pub const DEFAULT_STATS: [(&str, u8); 5] = [
    ("happiness", 50),
    ("relationship", 50),
    ("knowledge", 50),
    ("romance", 50),
    ("trust", 50),
];

/// Aggregate mood of the reader, derived from the stat average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Neutral,
}

impl Mood {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named stats, each held in `[STAT_MIN, STAT_MAX]`.
///
/// The key set is fixed at construction: impacts only ever move existing
/// stats and never introduce new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u8>", into = "BTreeMap<String, u8>")]
pub struct StatVector {
    values: BTreeMap<String, u8>,
}

impl Default for StatVector {
    fn default() -> Self {
        DEFAULT_STATS
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }
}

impl FromIterator<(String, u8)> for StatVector {
    fn from_iter<I: IntoIterator<Item = (String, u8)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name, value.clamp(STAT_MIN, STAT_MAX)))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, u8>> for StatVector {
    fn from(values: BTreeMap<String, u8>) -> Self {
        values.into_iter().collect()
    }
}

impl From<StatVector> for BTreeMap<String, u8> {
    fn from(stats: StatVector) -> Self {
        stats.values
    }
}

impl StatVector {
    /// An empty vector. Its mood is always neutral.
    pub fn empty() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<u8> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stats in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Mean of all stat values, `None` when there are no stats.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let total: u32 = self.values.values().map(|v| u32::from(*v)).sum();
        Some(f64::from(total) / self.values.len() as f64)
    }

    /// Apply a choice's impact, returning the new vector.
    ///
    /// Each delta is added to the matching stat and the result clamped to
    /// `[STAT_MIN, STAT_MAX]`. Impact keys with no matching stat are dropped.
    pub fn apply_impact(&self, impact: &Impact) -> StatVector {
        let mut values = self.values.clone();
        for (name, delta) in impact {
            match values.get_mut(name) {
                Some(value) => {
                    let moved = (i64::from(*value) + i64::from(*delta))
                        .clamp(i64::from(STAT_MIN), i64::from(STAT_MAX));
                    *value = moved as u8;
                }
                None => tracing::trace!(stat = %name, "ignoring impact on unknown stat"),
            }
        }
        StatVector { values }
    }

    /// Derive the aggregate mood: happy above 75, sad below 25, neutral
    /// otherwise or when there are no stats.
    pub fn derive_mood(&self) -> Mood {
        match self.average() {
            Some(avg) if avg > HAPPY_ABOVE => Mood::Happy,
            Some(avg) if avg < SAD_BELOW => Mood::Sad,
            _ => Mood::Neutral,
        }
    }
}
