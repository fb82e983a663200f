//! Once-weekly dosing with a single strength.
//!
//! The weekly dose must be an exact whole (or, with halves, half) multiple of
//! the one available strength; it never falls back to the multi-strength
//! search.

use crate::numeric::{
    approx_eq, check_schedule_days, count_add, count_mul, date_after, EXACT_EPSILON,
};
use crate::packaging::Packaging;
use crate::{
    score_combo, ComboItem, Combination, DispenseLine, Error, Preference, Result, ScheduleEntry,
};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Input for [`generate_once_weekly`]
#[derive(Clone, Debug)]
pub struct OnceWeeklyRequest {
    pub weekly_dose: f64,
    pub strength: f64,
    pub allow_halves: bool,
    pub anchor: Weekday,
    pub start: NaiveDate,
    pub weeks: u32,
    pub box_size: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OnceWeeklySchedule {
    /// First dosing date: the anchor weekday on or after the start
    pub anchor_date: NaiveDate,
    /// The same pieces every week
    pub per_week: Combination,
    pub entries: Vec<ScheduleEntry>,
    pub line: DispenseLine,
}

/// First date on or after `start` that falls on `weekday`.
pub fn anchor_date(start: NaiveDate, weekday: Weekday) -> Result<NaiveDate> {
    let wanted = weekday.num_days_from_monday() as i64;
    let have = start.weekday().num_days_from_monday() as i64;
    date_after(start, (wanted - have).rem_euclid(7) as u32, "start")
}

/// `value` as a piece count if it fits in a `u32`
fn to_count(value: f64) -> Option<u32> {
    (0.0..=u32::MAX as f64).contains(&value).then_some(value as u32)
}

/// Whole and half pieces per week for `dose` of `strength`, if exact.
pub fn exact_pieces(dose: f64, strength: f64, allow_halves: bool) -> Option<(u32, u32)> {
    let exact = dose / strength;
    let whole = exact.round();
    if approx_eq(exact, whole, EXACT_EPSILON) {
        return to_count(whole).map(|w| (w, 0));
    }
    if allow_halves {
        let doubled = (exact * 2.0).round();
        if approx_eq(exact, doubled / 2.0, EXACT_EPSILON) {
            return to_count(doubled).map(|d| (d / 2, 1));
        }
    }
    None
}

impl OnceWeeklyRequest {
    fn validate(&self) -> Result<()> {
        if !self.weekly_dose.is_finite() || self.weekly_dose <= 0.0 {
            return Err(Error::invalid("weekly_dose", "must be a positive number"));
        }
        if !self.strength.is_finite() || self.strength <= 0.0 {
            return Err(Error::invalid("strength", "must be a positive number"));
        }
        if self.weeks == 0 {
            return Err(Error::invalid("weeks", "must be at least 1"));
        }
        check_schedule_days(self.weeks as u64 * 7, "weeks")?;
        if to_count(self.weekly_dose / self.strength * 2.0).is_none() {
            return Err(Error::invalid(
                "weekly_dose",
                "needs more tablets per week than can be counted",
            ));
        }
        if let Some(box_size) = self.box_size {
            Packaging::Box { box_size }.validate()?;
        }
        Ok(())
    }
}

/// Schedule one identical dose every seven days from the anchor date.
pub fn generate_once_weekly(request: &OnceWeeklyRequest) -> Result<OnceWeeklySchedule> {
    request.validate()?;

    let (whole, halves) = exact_pieces(request.weekly_dose, request.strength, request.allow_halves)
        .ok_or(Error::NotExactMultiple {
            dose: request.weekly_dose,
            strength: request.strength,
        })?;

    let items = vec![ComboItem {
        strength: request.strength,
        whole,
        halves,
    }];
    let score = score_combo(&items, Preference::Simple);
    let per_week = Combination { items, score };

    let anchor_date = anchor_date(request.start, request.anchor)?;
    let entries = (0..request.weeks)
        .map(|w| {
            Ok(ScheduleEntry::new(
                date_after(anchor_date, w * 7, "weeks")?,
                request.weekly_dose,
                per_week.clone(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let whole_pieces = count_mul(whole, request.weeks, "weeks")?;
    let half_pieces = count_mul(halves, request.weeks, "weeks")?;
    let tablets = count_add(whole_pieces, half_pieces.div_ceil(2), "weeks")?;
    let line = DispenseLine {
        strength: request.strength,
        whole_pieces,
        half_pieces,
        tablets,
        packs: request
            .box_size
            .map(|box_size| Packaging::Box { box_size }.apply(tablets)),
    };

    tracing::info!(
        "Once weekly {} on {} from {} for {} weeks: {} tablets",
        request.weekly_dose,
        request.anchor,
        anchor_date,
        request.weeks,
        line.tablets
    );

    Ok(OnceWeeklySchedule {
        anchor_date,
        per_week,
        entries,
        line,
    })
}
