//! Weekly or cyclic variable dosing.
//!
//! The dose for each day comes either from a fixed weekday table or from a
//! repeating cycle anchored at the start date. Every day is solved with the
//! caller's preference and the totals are packed into sheets and boxes.

use crate::numeric::{check_schedule_days, date_after};
use crate::packaging::{DispenseTally, Packaging};
use crate::{
    ComboSolver, Combination, DispenseLine, Error, Preference, Result, ScheduleEntry, StrengthSet,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where each day's dose comes from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DoseSource {
    /// Dose per weekday, Monday first
    Weekly { doses: [f64; 7] },
    /// Day `i` takes `cycle[i % cycle.len()]`
    Cyclic { cycle: Vec<f64> },
}

impl DoseSource {
    /// Dose for `date`, which is `offset` days after the start
    pub fn dose_for(&self, date: NaiveDate, offset: usize) -> f64 {
        match self {
            DoseSource::Weekly { doses } => doses[date.weekday().num_days_from_monday() as usize],
            DoseSource::Cyclic { cycle } => cycle[offset % cycle.len()],
        }
    }

    fn doses(&self) -> &[f64] {
        match self {
            DoseSource::Weekly { doses } => doses,
            DoseSource::Cyclic { cycle } => cycle,
        }
    }
}

/// Input for [`generate_variable`]
#[derive(Clone, Debug)]
pub struct VariableRequest {
    pub start: NaiveDate,
    pub days: u32,
    pub source: DoseSource,
    pub strengths: StrengthSet,
    pub allow_halves: bool,
    pub max_pieces: usize,
    pub preference: Preference,
    pub tablets_per_sheet: u32,
    pub sheets_per_box: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct VariableSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub preference: Preference,
    pub entries: Vec<ScheduleEntry>,
    pub lines: Vec<DispenseLine>,
}

impl VariableRequest {
    fn packaging(&self) -> Packaging {
        Packaging::Sheets {
            tablets_per_sheet: self.tablets_per_sheet,
            sheets_per_box: self.sheets_per_box,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(Error::invalid("days", "must be at least 1"));
        }
        check_schedule_days(self.days as u64, "days")?;
        if let DoseSource::Cyclic { cycle } = &self.source {
            if cycle.is_empty() {
                return Err(Error::invalid("cycle", "at least one dose is required"));
            }
        }
        if let Some(bad) = self
            .source
            .doses()
            .iter()
            .find(|d| !d.is_finite() || **d < 0.0)
        {
            return Err(Error::invalid(
                "doses",
                format!("every dose must be a finite, non-negative number, got {}", bad),
            ));
        }
        self.packaging().validate()
    }
}

/// Solve each day in turn; the first unrepresentable day aborts the plan.
pub fn generate_variable(request: &VariableRequest) -> Result<VariableSchedule> {
    request.validate()?;

    let solver = ComboSolver::new(
        &request.strengths,
        request.allow_halves,
        request.max_pieces,
        request.preference,
    )?;
    // Same dose, same answer
    let mut solved: HashMap<u64, Combination> = HashMap::new();
    let mut tally = DispenseTally::new(&request.strengths);
    let mut entries = Vec::with_capacity(request.days as usize);

    for offset in 0..request.days {
        let date = date_after(request.start, offset, "days")?;
        let dose = request.source.dose_for(date, offset as usize);
        let combination = match solved.get(&dose.to_bits()) {
            Some(c) => c.clone(),
            None => {
                let c = solver
                    .solve(dose)?
                    .ok_or(Error::UnrepresentableOnDate { date, dose })?;
                solved.insert(dose.to_bits(), c.clone());
                c
            }
        };
        tally.add(&combination, 1)?;
        entries.push(ScheduleEntry::new(date, dose, combination));
    }

    let end = date_after(request.start, request.days - 1, "days")?;
    tracing::info!(
        "Variable schedule {} to {}: {} distinct doses solved ({})",
        request.start,
        end,
        solved.len(),
        request.preference
    );

    Ok(VariableSchedule {
        start: request.start,
        end,
        preference: request.preference,
        entries,
        lines: tally.into_lines(Some(request.packaging())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::PackCount;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn request(source: DoseSource, days: u32) -> VariableRequest {
        VariableRequest {
            start: monday(),
            days,
            source,
            strengths: StrengthSet::new(vec![1.0, 3.0, 5.0]).unwrap(),
            allow_halves: true,
            max_pieces: 6,
            preference: Preference::Simple,
            tablets_per_sheet: 14,
            sheets_per_box: 2,
        }
    }

    #[test]
    fn test_weekly_source_repeats_by_weekday() {
        let source = DoseSource::Weekly {
            doses: [5.0, 3.0, 5.0, 3.0, 5.0, 3.0, 0.0],
        };
        let schedule = generate_variable(&request(source, 14)).unwrap();
        assert_eq!(schedule.entries.len(), 14);
        assert_eq!(schedule.entries[7].dose, 5.0);
        assert!(schedule.entries[6].combination.is_empty());
        assert!(schedule.entries[13].combination.is_empty());

        let five = schedule.lines.iter().find(|l| l.strength == 5.0).unwrap();
        let three = schedule.lines.iter().find(|l| l.strength == 3.0).unwrap();
        assert_eq!(five.tablets, 6);
        assert_eq!(three.tablets, 6);
    }

    #[test]
    fn test_cyclic_source_anchored_at_start() {
        let source = DoseSource::Cyclic {
            cycle: vec![5.0, 2.5, 0.0],
        };
        let schedule = generate_variable(&request(source, 7)).unwrap();
        let doses: Vec<f64> = schedule.entries.iter().map(|e| e.dose).collect();
        assert_eq!(doses, vec![5.0, 2.5, 0.0, 5.0, 2.5, 0.0, 5.0]);
        // 2.5 is half a 5 under the simple preference
        let five = schedule.lines.iter().find(|l| l.strength == 5.0).unwrap();
        assert_eq!(five.whole_pieces, 3);
        assert_eq!(five.half_pieces, 2);
        assert_eq!(five.tablets, 4);
    }

    #[test]
    fn test_sheet_and_box_packing() {
        let source = DoseSource::Cyclic { cycle: vec![1.0] };
        let schedule = generate_variable(&request(source, 29)).unwrap();
        let one = schedule.lines.iter().find(|l| l.strength == 1.0).unwrap();
        assert_eq!(one.tablets, 29);
        assert_eq!(
            one.packs,
            Some(PackCount::Sheets {
                tablets_per_sheet: 14,
                sheets_per_box: 2,
                sheets: 3,
                boxes: 2
            })
        );
        let unused = schedule.lines.iter().find(|l| l.strength == 5.0).unwrap();
        assert_eq!(unused.tablets, 0);
    }

    #[test]
    fn test_preference_changes_selection() {
        let source = DoseSource::Cyclic { cycle: vec![8.0] };
        let simple = generate_variable(&request(source.clone(), 1)).unwrap();
        let mut req = request(source, 1);
        req.preference = Preference::FewTabs;
        let few = generate_variable(&req).unwrap();
        assert!(
            few.entries[0].combination.physical_tablets()
                <= simple.entries[0].combination.physical_tablets()
        );
        assert_eq!(few.entries[0].combination.physical_tablets(), 2);
    }

    #[test]
    fn test_unrepresentable_day_reports_date() {
        let source = DoseSource::Cyclic {
            cycle: vec![5.0, 0.3],
        };
        match generate_variable(&request(source, 5)) {
            Err(Error::UnrepresentableOnDate { date, dose }) => {
                assert_eq!(date, monday() + Duration::days(1));
                assert_eq!(dose, 0.3);
            }
            other => panic!("expected date error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(generate_variable(&request(DoseSource::Cyclic { cycle: vec![] }, 7)).is_err());
        assert!(generate_variable(&request(DoseSource::Cyclic { cycle: vec![1.0] }, 0)).is_err());
        let mut req = request(DoseSource::Cyclic { cycle: vec![1.0] }, 7);
        req.tablets_per_sheet = 0;
        assert!(generate_variable(&req).is_err());
    }

    #[test]
    fn test_overlong_schedule_is_an_input_error() {
        let source = DoseSource::Cyclic { cycle: vec![5.0] };
        match generate_variable(&request(source.clone(), u32::MAX)) {
            Err(Error::InvalidInput { field, .. }) => assert_eq!(field, "days"),
            other => panic!("expected input error, got {:?}", other),
        }

        let mut req = request(source, 10);
        req.start = NaiveDate::MAX - Duration::days(3);
        let err = generate_variable(&req).unwrap_err();
        assert!(err.to_string().contains("supported date range"));
    }
}
