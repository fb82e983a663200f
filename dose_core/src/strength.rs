//! Strength canonicalization.
//!
//! Free-form strength lists become a [`StrengthSet`]: positive values rounded
//! to four decimal places, deduplicated and sorted ascending.

use crate::numeric::{approx_eq, parse_number, round_to, COMBO_EPSILON};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Decimal places used to merge near-duplicate strengths
pub const STRENGTH_DECIMALS: u32 = 4;

/// Canonical, non-empty, ascending set of distinct positive strengths
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct StrengthSet(Vec<f64>);

impl StrengthSet {
    /// Build a set from raw values; fails if nothing positive remains.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Result<Self> {
        let canonical = canonicalize(values);
        if canonical.is_empty() {
            return Err(Error::EmptyStrengthSet);
        }
        Ok(Self(canonical))
    }

    /// Parse a list such as `"5, 10;20 2.5"`.
    ///
    /// Tokens are separated by commas, semicolons or whitespace, so a comma
    /// here is always a separator. Unparseable or non-positive tokens are
    /// dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut values = Vec::new();
        for token in text
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            match parse_number(token) {
                Some(v) => values.push(v),
                None => tracing::warn!("Ignoring unparseable strength token '{}'", token),
            }
        }
        Self::new(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Position of `strength` in the set, compared within the search epsilon
    pub fn index_of(&self, strength: f64) -> Option<usize> {
        self.0
            .iter()
            .position(|&s| approx_eq(s, strength, COMBO_EPSILON))
    }
}

impl TryFrom<Vec<f64>> for StrengthSet {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<StrengthSet> for Vec<f64> {
    fn from(set: StrengthSet) -> Self {
        set.0
    }
}

/// Round, drop non-positive values, sort ascending and deduplicate.
pub fn canonicalize(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values
        .into_iter()
        .filter(|v| v.is_finite())
        .map(|v| round_to(v, STRENGTH_DECIMALS))
        .filter(|v| *v > 0.0)
        .collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}
