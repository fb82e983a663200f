//! Dispensing totals and pack rounding.
//!
//! Generators feed per-day (or per-step) combinations into a
//! [`DispenseTally`]; the tally reduces piece counts to physical tablets and
//! applies one of the pack rounding rules.

use crate::numeric::{approx_eq, ceil_div, count_add, count_mul, COMBO_EPSILON};
use crate::{Combination, DispenseLine, Error, PackCount, Result, StrengthSet};
use serde::{Deserialize, Serialize};

/// How tablets are grouped when dispensed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packaging {
    /// Tablets go straight into boxes
    Box { box_size: u32 },
    /// Tablets go into sheets, sheets into boxes
    Sheets {
        tablets_per_sheet: u32,
        sheets_per_box: u32,
    },
}

impl Packaging {
    /// Reject zero-sized packs
    pub fn validate(&self) -> Result<()> {
        match *self {
            Packaging::Box { box_size } if box_size == 0 => {
                Err(Error::invalid("box_size", "must be at least 1"))
            }
            Packaging::Sheets {
                tablets_per_sheet, ..
            } if tablets_per_sheet == 0 => {
                Err(Error::invalid("tablets_per_sheet", "must be at least 1"))
            }
            Packaging::Sheets { sheets_per_box, .. } if sheets_per_box == 0 => {
                Err(Error::invalid("sheets_per_box", "must be at least 1"))
            }
            _ => Ok(()),
        }
    }

    /// Pack count for `tablets`; call [`Packaging::validate`] first.
    pub fn apply(&self, tablets: u32) -> PackCount {
        match *self {
            Packaging::Box { box_size } => round_to_boxes(tablets, box_size),
            Packaging::Sheets {
                tablets_per_sheet,
                sheets_per_box,
            } => pack_sheets(tablets, tablets_per_sheet, sheets_per_box),
        }
    }
}

/// `ceil(tablets / box_size)` boxes, with the surplus reported as remainder
pub fn round_to_boxes(tablets: u32, box_size: u32) -> PackCount {
    let boxes = ceil_div(tablets, box_size);
    let dispensed = boxes * box_size;
    PackCount::Boxes {
        box_size,
        boxes,
        dispensed,
        remainder: dispensed - tablets,
    }
}

/// Two-level rounding; sheets are never split across boxes
pub fn pack_sheets(tablets: u32, tablets_per_sheet: u32, sheets_per_box: u32) -> PackCount {
    let sheets = ceil_div(tablets, tablets_per_sheet);
    PackCount::Sheets {
        tablets_per_sheet,
        sheets_per_box,
        sheets,
        boxes: ceil_div(sheets, sheets_per_box),
    }
}

#[derive(Clone, Debug, Default)]
struct PieceCount {
    whole: u32,
    halves: u32,
}

/// Running per-strength piece totals across a schedule
#[derive(Clone, Debug)]
pub struct DispenseTally {
    strengths: Vec<f64>,
    counts: Vec<PieceCount>,
}

impl DispenseTally {
    pub fn new(strengths: &StrengthSet) -> Self {
        Self {
            strengths: strengths.as_slice().to_vec(),
            counts: vec![PieceCount::default(); strengths.len()],
        }
    }

    /// Count `combination` as taken on `days` days.
    pub fn add(&mut self, combination: &Combination, days: u32) -> Result<()> {
        for item in &combination.items {
            match self
                .strengths
                .iter()
                .position(|&s| approx_eq(s, item.strength, COMBO_EPSILON))
            {
                Some(idx) => {
                    let whole = count_mul(item.whole, days, "days")?;
                    let halves = count_mul(item.halves, days, "days")?;
                    self.bump(idx, whole, halves)?;
                }
                None => tracing::warn!(
                    "Ignoring item with strength {} outside the tally",
                    item.strength
                ),
            }
        }
        Ok(())
    }

    /// Count whole tablets of the strength at `index` directly.
    pub fn add_whole(&mut self, index: usize, count: u32) -> Result<()> {
        self.bump(index, count, 0)
    }

    fn bump(&mut self, index: usize, whole: u32, halves: u32) -> Result<()> {
        let Some(c) = self.counts.get_mut(index) else {
            return Ok(());
        };
        let next_whole = count_add(c.whole, whole, "days")?;
        let next_halves = count_add(c.halves, halves, "days")?;
        // tablets must stay countable too
        count_add(next_whole, next_halves.div_ceil(2), "days")?;
        c.whole = next_whole;
        c.halves = next_halves;
        Ok(())
    }

    /// One line per strength, ascending; halves reduced to tablets only here.
    pub fn into_lines(self, packaging: Option<Packaging>) -> Vec<DispenseLine> {
        self.strengths
            .into_iter()
            .zip(self.counts)
            .map(|(strength, count)| {
                let tablets = count.whole + count.halves.div_ceil(2);
                DispenseLine {
                    strength,
                    whole_pieces: count.whole,
                    half_pieces: count.halves,
                    tablets,
                    packs: packaging.map(|p| p.apply(tablets)),
                }
            })
            .collect()
    }
}
