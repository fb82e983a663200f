//! Weekly day-pattern schedules.
//!
//! Each weekday is assigned one strength (or nothing) and the patient takes a
//! single whole tablet of it. No combination search is involved.

use crate::numeric::{ceil_div, check_schedule_days, date_after};
use crate::packaging::DispenseTally;
use crate::{
    score_combo, ComboItem, Combination, Error, Preference, Result, ScheduleEntry, StrengthSet,
};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Input for [`generate_day_pattern`]
#[derive(Clone, Debug)]
pub struct DayPatternRequest {
    pub start: NaiveDate,
    pub weeks: u32,
    pub strengths: StrengthSet,
    /// Strength index per weekday, Monday first; `None` means no tablet
    pub choices: [Option<usize>; 7],
    /// Box size per strength, same order as `strengths`
    pub box_sizes: Vec<u32>,
}

/// Boxed supply of one strength
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatternLine {
    pub strength: f64,
    pub days: u32,
    pub boxes: u32,
    pub dispensed: u32,
    pub remainder: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct DayPatternSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
    pub lines: Vec<PatternLine>,
}

impl DayPatternRequest {
    fn validate(&self) -> Result<()> {
        if self.weeks == 0 {
            return Err(Error::invalid("weeks", "must be at least 1"));
        }
        check_schedule_days(self.weeks as u64 * 7, "weeks")?;
        if self.box_sizes.len() != self.strengths.len() {
            return Err(Error::invalid(
                "box_sizes",
                format!(
                    "expected {} box sizes (one per strength), got {}",
                    self.strengths.len(),
                    self.box_sizes.len()
                ),
            ));
        }
        if self.box_sizes.contains(&0) {
            return Err(Error::invalid("box_sizes", "every box size must be at least 1"));
        }
        for (day, choice) in self.choices.iter().enumerate() {
            if let Some(idx) = choice {
                if *idx >= self.strengths.len() {
                    let weekday = Weekday::try_from(day as u8)
                        .map_or_else(|_| format!("day {}", day), |w| w.to_string());
                    return Err(Error::invalid(
                        "choices",
                        format!(
                            "{} refers to strength #{} but only {} are available",
                            weekday,
                            idx,
                            self.strengths.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Strength index chosen for `weekday`
    pub fn choice_for(&self, weekday: Weekday) -> Option<usize> {
        self.choices[weekday.num_days_from_monday() as usize]
    }
}

/// Lay out `weeks * 7` days from `start` and box up each strength.
pub fn generate_day_pattern(request: &DayPatternRequest) -> Result<DayPatternSchedule> {
    request.validate()?;

    let total_days = check_schedule_days(request.weeks as u64 * 7, "weeks")?;
    let mut entries = Vec::with_capacity(total_days as usize);
    let mut tally = DispenseTally::new(&request.strengths);

    for offset in 0..total_days {
        let date = date_after(request.start, offset, "weeks")?;
        let combination = match request.choice_for(date.weekday()) {
            Some(idx) => {
                let strength = request.strengths.as_slice()[idx];
                tally.add_whole(idx, 1)?;
                let items = vec![ComboItem::whole(strength, 1)];
                let score = score_combo(&items, Preference::Simple);
                Combination { items, score }
            }
            None => Combination::empty(),
        };
        let dose = combination.total();
        entries.push(ScheduleEntry::new(date, dose, combination));
    }

    let lines = tally
        .into_lines(None)
        .into_iter()
        .zip(&request.box_sizes)
        .map(|(line, &box_size)| {
            let boxes = ceil_div(line.tablets, box_size);
            let dispensed = boxes * box_size;
            PatternLine {
                strength: line.strength,
                days: line.tablets,
                boxes,
                dispensed,
                remainder: dispensed - line.tablets,
            }
        })
        .collect();

    let end = date_after(request.start, total_days - 1, "weeks")?;
    tracing::info!(
        "Day pattern {} to {}: {} days scheduled",
        request.start,
        end,
        total_days
    );

    Ok(DayPatternSchedule {
        start: request.start,
        end,
        entries,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn request() -> DayPatternRequest {
        // 3 mg Mon/Wed/Fri, 1 mg the rest, nothing on Sunday
        DayPatternRequest {
            start: monday(),
            weeks: 4,
            strengths: StrengthSet::new(vec![1.0, 3.0]).unwrap(),
            choices: [Some(1), Some(0), Some(1), Some(0), Some(1), Some(0), None],
            box_sizes: vec![28, 28],
        }
    }

    #[test]
    fn test_counts_and_boxes() {
        let schedule = generate_day_pattern(&request()).unwrap();
        assert_eq!(schedule.entries.len(), 28);
        assert_eq!(schedule.end, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

        let one = &schedule.lines[0];
        assert_eq!(one.strength, 1.0);
        assert_eq!(one.days, 12);
        assert_eq!(one.boxes, 1);
        assert_eq!(one.dispensed, 28);
        assert_eq!(one.remainder, 16);

        let three = &schedule.lines[1];
        assert_eq!(three.days, 12);
        assert_eq!(three.remainder, 16);
    }

    #[test]
    fn test_entries_follow_weekdays() {
        let schedule = generate_day_pattern(&request()).unwrap();
        assert_eq!(schedule.entries[0].weekday, Weekday::Mon);
        assert_eq!(schedule.entries[0].dose, 3.0);
        assert_eq!(schedule.entries[1].dose, 1.0);
        assert!(schedule.entries[6].combination.is_empty());
        assert_eq!(schedule.entries[6].dose, 0.0);
    }

    #[test]
    fn test_start_mid_week() {
        let mut req = request();
        req.start = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(); // Thursday
        req.weeks = 1;
        let schedule = generate_day_pattern(&req).unwrap();
        assert_eq!(schedule.entries[0].weekday, Weekday::Thu);
        assert_eq!(schedule.entries[0].dose, 1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut req = request();
        req.weeks = 0;
        assert!(generate_day_pattern(&req).is_err());

        let mut req = request();
        req.box_sizes = vec![28];
        assert!(generate_day_pattern(&req).is_err());

        let mut req = request();
        req.choices[2] = Some(5);
        let err = generate_day_pattern(&req).unwrap_err();
        assert!(err.to_string().contains("Wed"));
    }

    #[test]
    fn test_overlong_pattern_is_an_input_error() {
        let mut req = request();
        req.weeks = u32::MAX;
        match generate_day_pattern(&req) {
            Err(Error::InvalidInput { field, .. }) => assert_eq!(field, "weeks"),
            other => panic!("expected input error, got {:?}", other),
        }

        let mut req = request();
        req.start = NaiveDate::MAX;
        let err = generate_day_pattern(&req).unwrap_err();
        assert!(err.to_string().contains("supported date range"));
    }
}
