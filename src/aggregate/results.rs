//! Extraction results and their running totals.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One annotation found next to a profile designation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Number(f64),
    Text(String),
}

impl ProfileValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ProfileValue::Number(n) => Some(*n),
            ProfileValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileValue::Number(n) => write!(f, "{}", n),
            ProfileValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ProfileValue {
    fn from(value: f64) -> Self {
        ProfileValue::Number(value)
    }
}

impl From<&str> for ProfileValue {
    fn from(value: &str) -> Self {
        ProfileValue::Text(value.to_string())
    }
}

/// Values extracted from a single region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionResult {
    pub elevations: Vec<String>,
    pub studs_label_count: u64,
    pub studs_total: u64,
    pub profiles: BTreeMap<String, Vec<ProfileValue>>,
}

/// Running totals over every recorded region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateResults {
    /// Distinct elevation labels in the order they were first found.
    pub elevations: Vec<String>,
    pub profiles: BTreeMap<String, Vec<ProfileValue>>,
    pub studs_label_count: u64,
    pub studs_total: u64,
}

impl AggregateResults {
    /// Fold a sequence of results, in order, starting from zero.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ExtractionResult>,
    {
        results.into_iter().fold(Self::default(), |mut acc, result| {
            acc.absorb(result);
            acc
        })
    }

    /// Merge `incoming` into these totals in place.
    pub fn absorb(&mut self, incoming: &ExtractionResult) {
        for elevation in &incoming.elevations {
            if !self.has_elevation(elevation) {
                self.elevations.push(elevation.clone());
            }
        }
        for (designation, values) in &incoming.profiles {
            self.profiles
                .entry(designation.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        self.studs_label_count = self
            .studs_label_count
            .saturating_add(incoming.studs_label_count);
        self.studs_total = self.studs_total.saturating_add(incoming.studs_total);
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Case-sensitive membership test.
    pub fn has_elevation(&self, elevation: &str) -> bool {
        self.elevations.iter().any(|e| e == elevation)
    }

    /// Sum of the numeric annotations recorded for a designation.
    pub fn profile_sum(&self, designation: &str) -> f64 {
        self.profiles
            .get(designation)
            .map(|values| values.iter().filter_map(ProfileValue::as_number).sum::<f64>())
            .unwrap_or(0.0)
    }
}

/// Pure merge: `existing` combined with `incoming`.
///
/// Elevations are a case-sensitive set union, profile lists are concatenated
/// in arrival order without deduplication, and counts are added.
pub fn merge(existing: &AggregateResults, incoming: &ExtractionResult) -> AggregateResults {
    let mut merged = existing.clone();
    merged.absorb(incoming);
    merged
}

/// Owner of the single [`AggregateResults`] instance.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: AggregateResults,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &AggregateResults {
        &self.results
    }

    pub fn record(&mut self, incoming: &ExtractionResult) {
        self.results = merge(&self.results, incoming);
        tracing::debug!(
            "Aggregate now {} studs over {} labels, {} elevations, {} profiles",
            self.results.studs_total,
            self.results.studs_label_count,
            self.results.elevations.len(),
            self.results.profiles.len()
        );
    }

    /// Recompute the totals from scratch.
    pub fn rebuild<'a, I>(&mut self, results: I)
    where
        I: IntoIterator<Item = &'a ExtractionResult>,
    {
        self.results = AggregateResults::from_results(results);
    }

    pub fn reset(&mut self) {
        self.results = AggregateResults::default();
    }
}
