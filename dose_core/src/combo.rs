//! Exact combination search.
//!
//! A target dose is expressed as a multiset of pieces (whole tablets and,
//! optionally, halves) drawn from a [`StrengthSet`]. The search is exhaustive
//! over non-decreasing piece indices, bounded by `max_pieces`, and keeps the
//! lowest-scoring exact match.
//!
//! ## Scoring
//!
//! - `simple`: `1000*strengths + 200*halves + 40*tablets + 10*pieces`
//! - `fewTabs`: `200*tablets + 60*pieces + 40*strengths + 30*halves`
//!
//! Lower wins; among equal scores the first match found is kept.

use crate::numeric::{approx_eq, is_zero, COMBO_EPSILON};
use crate::{Combination, ComboItem, Error, Piece, Preference, Result, StrengthSet};

/// Upper bound accepted for `max_pieces`
pub const MAX_PIECES_LIMIT: usize = 30;

/// Candidate pieces for `strengths`, sorted by value descending.
///
/// Each strength contributes a whole piece and, with `allow_halves`, a half
/// piece. The sort is stable, so equal values keep generation order (whole
/// before half, smaller strength before larger).
pub fn generate_pieces(strengths: &StrengthSet, allow_halves: bool) -> Vec<Piece> {
    let mut pieces = Vec::with_capacity(strengths.len() * 2);
    for strength in strengths.iter() {
        pieces.push(Piece {
            strength,
            value: strength,
            half: false,
        });
        if allow_halves {
            pieces.push(Piece {
                strength,
                value: strength / 2.0,
                half: true,
            });
        }
    }
    pieces.sort_by(|a, b| b.value.total_cmp(&a.value));
    pieces
}

/// Counts a combination is scored on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComboStats {
    pub distinct_strengths: u32,
    pub half_pieces: u32,
    pub whole_pieces: u32,
    pub physical_tablets: u32,
    pub total_pieces: u32,
}

impl ComboStats {
    pub fn from_items(items: &[ComboItem]) -> Self {
        let mut stats = ComboStats::default();
        for item in items.iter().filter(|i| i.pieces() > 0) {
            stats.distinct_strengths += 1;
            stats.half_pieces += item.halves;
            stats.whole_pieces += item.whole;
            stats.physical_tablets += item.physical_tablets();
        }
        stats.total_pieces = stats.whole_pieces + stats.half_pieces;
        stats
    }
}

/// Tie-break score for `items` under `preference`; lower is better.
pub fn score_combo(items: &[ComboItem], preference: Preference) -> u64 {
    let s = ComboStats::from_items(items);
    let (strengths, halves, tablets, pieces) = (
        s.distinct_strengths as u64,
        s.half_pieces as u64,
        s.physical_tablets as u64,
        s.total_pieces as u64,
    );
    match preference {
        Preference::Simple => 1000 * strengths + 200 * halves + 40 * tablets + 10 * pieces,
        Preference::FewTabs => 200 * tablets + 60 * pieces + 40 * strengths + 30 * halves,
    }
}

/// Group chosen pieces into per-strength items, largest strength first.
fn to_items(chosen: &[Piece]) -> Vec<ComboItem> {
    let mut items: Vec<ComboItem> = Vec::new();
    for piece in chosen {
        let idx = match items
            .iter()
            .position(|i| approx_eq(i.strength, piece.strength, COMBO_EPSILON))
        {
            Some(idx) => idx,
            None => {
                items.push(ComboItem::whole(piece.strength, 0));
                items.len() - 1
            }
        };
        if piece.half {
            items[idx].halves += 1;
        } else {
            items[idx].whole += 1;
        }
    }
    items.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    items
}

/// Reusable search over one strength set and policy
#[derive(Clone, Debug)]
pub struct ComboSolver {
    pieces: Vec<Piece>,
    max_pieces: usize,
    preference: Preference,
}

struct SearchState<'a> {
    pieces: &'a [Piece],
    target: f64,
    max_pieces: usize,
    preference: Preference,
    chosen: Vec<Piece>,
    best: Option<Combination>,
    visited: u64,
    matches: u64,
}

impl SearchState<'_> {
    fn descend(&mut self, start: usize, sum: f64) {
        let slots_left = self.max_pieces - self.chosen.len();
        for i in start..self.pieces.len() {
            let piece = self.pieces[i];
            // Pieces only get smaller from here
            if sum + piece.value * (slots_left as f64) < self.target - COMBO_EPSILON {
                break;
            }
            let next = sum + piece.value;
            if next > self.target + COMBO_EPSILON {
                continue;
            }
            self.visited += 1;
            self.chosen.push(piece);
            if approx_eq(next, self.target, COMBO_EPSILON) {
                self.record();
            } else if slots_left > 1 {
                self.descend(i, next);
            }
            self.chosen.pop();
        }
    }

    fn record(&mut self) {
        self.matches += 1;
        let items = to_items(&self.chosen);
        let score = score_combo(&items, self.preference);
        if self.best.as_ref().map_or(true, |b| score < b.score) {
            self.best = Some(Combination { items, score });
        }
    }
}

impl ComboSolver {
    /// Validates `max_pieces` (1..=30) and precomputes the sorted pieces.
    pub fn new(
        strengths: &StrengthSet,
        allow_halves: bool,
        max_pieces: usize,
        preference: Preference,
    ) -> Result<Self> {
        if max_pieces == 0 || max_pieces > MAX_PIECES_LIMIT {
            return Err(Error::invalid(
                "max_pieces",
                format!("must be between 1 and {}, got {}", MAX_PIECES_LIMIT, max_pieces),
            ));
        }
        Ok(Self {
            pieces: generate_pieces(strengths, allow_halves),
            max_pieces,
            preference,
        })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn preference(&self) -> Preference {
        self.preference
    }

    /// Best exact combination for `target`, or `None` if none exists.
    ///
    /// A zero target yields the empty combination. Negative or non-finite
    /// targets are input errors.
    pub fn solve(&self, target: f64) -> Result<Option<Combination>> {
        if !target.is_finite() || target < 0.0 {
            return Err(Error::invalid(
                "dose",
                format!("must be a finite, non-negative number, got {}", target),
            ));
        }
        if is_zero(target, COMBO_EPSILON) {
            return Ok(Some(Combination::empty()));
        }

        let mut state = SearchState {
            pieces: &self.pieces,
            target,
            max_pieces: self.max_pieces,
            preference: self.preference,
            chosen: Vec::with_capacity(self.max_pieces),
            best: None,
            visited: 0,
            matches: 0,
        };
        state.descend(0, 0.0);

        tracing::debug!(
            "Search for {}: visited {} nodes, {} exact matches, best score {:?}",
            target,
            state.visited,
            state.matches,
            state.best.as_ref().map(|b| b.score)
        );
        Ok(state.best)
    }
}

/// One-shot search: lowest-scoring exact combination of at most `max_pieces`.
pub fn find_best_combo_exact(
    target: f64,
    strengths: &StrengthSet,
    allow_halves: bool,
    max_pieces: usize,
    preference: Preference,
) -> Result<Option<Combination>> {
    ComboSolver::new(strengths, allow_halves, max_pieces, preference)?.solve(target)
}
