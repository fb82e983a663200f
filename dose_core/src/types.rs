//! Core domain types for the dose decomposition engine.
//!
//! This module defines the plain values passed between the search, the
//! schedule generators and whatever renders or stores their output:
//! - Tie-break preferences and search pieces
//! - Combinations and their per-strength items
//! - Schedule entries and dispensing lines

use crate::numeric::format_dose;
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Preferences and Pieces
// ============================================================================

/// Tie-break policy used to pick among equally exact combinations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preference {
    /// Fewest distinct strengths and halves (simplest instructions)
    #[default]
    #[serde(rename = "simple")]
    Simple,
    /// Fewest physical tablets
    #[serde(rename = "fewTabs", alias = "fewtabs", alias = "few_tabs", alias = "optimize")]
    FewTabs,
}

impl FromStr for Preference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(Preference::Simple),
            "fewtabs" | "few_tabs" | "few-tabs" | "optimize" => Ok(Preference::FewTabs),
            other => Err(Error::invalid(
                "preference",
                format!("unknown preference '{}' (expected simple or fewTabs)", other),
            )),
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preference::Simple => write!(f, "simple"),
            Preference::FewTabs => write!(f, "fewTabs"),
        }
    }
}

/// A candidate unit considered by the search: a whole tablet or a half
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Piece {
    pub strength: f64,
    pub value: f64,
    pub half: bool,
}

// ============================================================================
// Combinations
// ============================================================================

/// Pieces of one strength within a combination
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComboItem {
    pub strength: f64,
    pub whole: u32,
    /// Number of half pieces chosen, before reduction to tablets
    pub halves: u32,
}

impl ComboItem {
    pub fn whole(strength: f64, count: u32) -> Self {
        Self {
            strength,
            whole: count,
            halves: 0,
        }
    }

    /// Tablets needed: two halves share one tablet, an odd half rounds up
    pub fn physical_tablets(&self) -> u32 {
        self.whole + self.halves.div_ceil(2)
    }

    pub fn pieces(&self) -> u32 {
        self.whole + self.halves
    }

    pub fn dose(&self) -> f64 {
        self.strength * self.whole as f64 + self.strength / 2.0 * self.halves as f64
    }
}

/// An exact decomposition of a target dose into pieces
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// One item per strength used, largest strength first
    pub items: Vec<ComboItem>,
    pub score: u64,
}

impl Combination {
    /// The "no units" combination used for a zero dose
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.items.iter().map(ComboItem::dose).sum()
    }

    pub fn pieces(&self) -> u32 {
        self.items.iter().map(ComboItem::pieces).sum()
    }

    pub fn physical_tablets(&self) -> u32 {
        self.items.iter().map(ComboItem::physical_tablets).sum()
    }

    /// Item for `strength`, if the combination uses it
    pub fn item(&self, strength: f64) -> Option<&ComboItem> {
        self.items
            .iter()
            .find(|i| crate::numeric::approx_eq(i.strength, strength, crate::COMBO_EPSILON))
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.items.is_empty() {
            return write!(f, "none");
        }
        let mut parts = Vec::new();
        for item in &self.items {
            if item.whole > 0 {
                parts.push(format!("{} x {}", item.whole, format_dose(item.strength)));
            }
            if item.halves > 0 {
                parts.push(format!("{} x 1/2 of {}", item.halves, format_dose(item.strength)));
            }
        }
        write!(f, "{}", parts.join(", "))
    }
}

// ============================================================================
// Schedule and Dispensing
// ============================================================================

/// One calendar day (or week, for once-weekly plans) of a schedule
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    #[serde(with = "weekday_name")]
    pub weekday: Weekday,
    pub dose: f64,
    pub combination: Combination,
}

impl ScheduleEntry {
    pub fn new(date: NaiveDate, dose: f64, combination: Combination) -> Self {
        Self {
            date,
            weekday: date.weekday(),
            dose,
            combination,
        }
    }
}

/// Pack rounding applied to a dispensing line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackCount {
    /// Tablets rounded up to whole boxes
    Boxes {
        box_size: u32,
        boxes: u32,
        dispensed: u32,
        remainder: u32,
    },
    /// Tablets rounded up to sheets, sheets rounded up to boxes
    Sheets {
        tablets_per_sheet: u32,
        sheets_per_box: u32,
        sheets: u32,
        boxes: u32,
    },
}

/// Dispensing total for one strength
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispenseLine {
    pub strength: f64,
    /// Whole pieces summed over all scheduled days
    pub whole_pieces: u32,
    /// Half pieces summed over all scheduled days
    pub half_pieces: u32,
    /// Physical tablets: whole + ceil(half / 2)
    pub tablets: u32,
    pub packs: Option<PackCount>,
}

/// Weekdays serialize by English name
pub(crate) mod weekday_name {
    use chrono::Weekday;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&day.to_string())
    }
}

/// Parse `mon`, `Monday`, `tue`... into a weekday
pub fn parse_weekday(text: &str) -> Result<Weekday> {
    text.trim()
        .parse::<Weekday>()
        .map_err(|_| Error::invalid("weekday", format!("unknown weekday '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_tablets_rounds_halves_up() {
        let item = ComboItem {
            strength: 5.0,
            whole: 2,
            halves: 3,
        };
        assert_eq!(item.physical_tablets(), 4);
        assert_eq!(item.pieces(), 5);
        assert!((item.dose() - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_preference_parsing() {
        assert_eq!("simple".parse::<Preference>().unwrap(), Preference::Simple);
        assert_eq!("fewTabs".parse::<Preference>().unwrap(), Preference::FewTabs);
        assert_eq!("optimize".parse::<Preference>().unwrap(), Preference::FewTabs);
        assert!("cheapest".parse::<Preference>().is_err());
        assert_eq!(Preference::FewTabs.to_string(), "fewTabs");
    }

    #[test]
    fn test_combination_display() {
        let combo = Combination {
            items: vec![
                ComboItem::whole(20.0, 1),
                ComboItem {
                    strength: 5.0,
                    whole: 0,
                    halves: 1,
                },
            ],
            score: 0,
        };
        assert_eq!(combo.to_string(), "1 x 20, 1 x 1/2 of 5");
        assert_eq!(Combination::empty().to_string(), "none");
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Thursday").unwrap(), Weekday::Thu);
        assert!(parse_weekday("someday").is_err());
    }
}
