//! Stepped taper schedules.
//!
//! Steps run back to back from the start date. Each step's dose is solved
//! once with the `simple` preference and held for the step's days. A zero
//! dose is a "stop" step with no tablets.

use crate::numeric::{check_schedule_days, date_after};
use crate::packaging::{DispenseTally, Packaging};
use crate::{
    ComboSolver, Combination, DispenseLine, Error, Preference, Result, ScheduleEntry, StrengthSet,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// One dose held for a number of days
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaperStep {
    pub dose: f64,
    pub days: u32,
}

/// Input for [`generate_taper`]
#[derive(Clone, Debug)]
pub struct TaperRequest {
    pub start: NaiveDate,
    pub steps: Vec<TaperStep>,
    pub strengths: StrengthSet,
    pub allow_halves: bool,
    pub max_pieces: usize,
    pub box_size: Option<u32>,
}

/// A solved step with its date range (inclusive)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaperStepPlan {
    /// 1-based position in the taper
    pub step: usize,
    pub dose: f64,
    pub days: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub combination: Combination,
}

#[derive(Clone, Debug, Serialize)]
pub struct TaperSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub steps: Vec<TaperStepPlan>,
    pub lines: Vec<DispenseLine>,
}

impl TaperSchedule {
    /// Expand steps into one entry per day
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.steps
            .iter()
            .flat_map(|step| {
                (0..step.days).map(move |d| {
                    ScheduleEntry::new(
                        step.start + Duration::days(d as i64),
                        step.dose,
                        step.combination.clone(),
                    )
                })
            })
            .collect()
    }

    pub fn total_days(&self) -> u32 {
        self.steps.iter().map(|s| s.days).sum()
    }
}

impl TaperRequest {
    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::invalid("steps", "at least one step is required"));
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.days == 0 {
                return Err(Error::invalid(
                    "steps",
                    format!("step {} must last at least one day", i + 1),
                ));
            }
            if !step.dose.is_finite() || step.dose < 0.0 {
                return Err(Error::invalid(
                    "steps",
                    format!("step {} has invalid dose {}", i + 1, step.dose),
                ));
            }
        }
        let total: u64 = self.steps.iter().map(|s| s.days as u64).sum();
        check_schedule_days(total, "steps")?;
        if let Some(box_size) = self.box_size {
            Packaging::Box { box_size }.validate()?;
        }
        Ok(())
    }
}

/// Solve every step, assign contiguous date ranges and total the supply.
///
/// The first step that cannot be represented fails the whole taper.
pub fn generate_taper(request: &TaperRequest) -> Result<TaperSchedule> {
    request.validate()?;

    let solver = ComboSolver::new(
        &request.strengths,
        request.allow_halves,
        request.max_pieces,
        Preference::Simple,
    )?;
    let mut tally = DispenseTally::new(&request.strengths);
    let mut steps = Vec::with_capacity(request.steps.len());
    // days elapsed before the current step
    let mut offset = 0u32;

    for (i, step) in request.steps.iter().enumerate() {
        let combination = solver
            .solve(step.dose)?
            .ok_or(Error::UnrepresentableStep {
                step: i + 1,
                dose: step.dose,
            })?;

        let start = date_after(request.start, offset, "steps")?;
        let end = date_after(request.start, offset + step.days - 1, "steps")?;
        tally.add(&combination, step.days)?;
        tracing::debug!(
            "Step {}: {} for {} days ({} to {}): {}",
            i + 1,
            step.dose,
            step.days,
            start,
            end,
            combination
        );

        steps.push(TaperStepPlan {
            step: i + 1,
            dose: step.dose,
            days: step.days,
            start,
            end,
            combination,
        });
        offset += step.days;
    }

    let end = date_after(request.start, offset - 1, "steps")?;
    tracing::info!(
        "Taper of {} steps from {} to {}",
        steps.len(),
        request.start,
        end
    );

    Ok(TaperSchedule {
        start: request.start,
        end,
        steps,
        lines: tally.into_lines(request.box_size.map(|box_size| Packaging::Box { box_size })),
    })
}
