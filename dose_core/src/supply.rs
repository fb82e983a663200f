//! Injectable supply estimation with wastage.
//!
//! Simulates day by day how containers (pens, cartridges or vials) are opened,
//! drained by each injection plus priming, and thrown away once they have been
//! open for too long. Container boundaries depend on everything drawn before,
//! so the days have to be walked in order.

use crate::numeric::{ceil_div, check_schedule_days, COMBO_EPSILON};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Most injections (named sub-doses) allowed per day
pub const MAX_INJECTIONS: usize = 4;

/// Kind of device the units are drawn from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Pen,
    Cartridge,
    Vial,
}

impl ContainerKind {
    /// Pens and cartridges lose priming units on every injection
    pub fn uses_priming(&self) -> bool {
        matches!(self, ContainerKind::Pen | ContainerKind::Cartridge)
    }
}

impl FromStr for ContainerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pen" => Ok(ContainerKind::Pen),
            "cartridge" => Ok(ContainerKind::Cartridge),
            "vial" => Ok(ContainerKind::Vial),
            other => Err(Error::invalid(
                "container",
                format!("unknown container '{}' (expected pen, cartridge or vial)", other),
            )),
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Pen => write!(f, "pen"),
            ContainerKind::Cartridge => write!(f, "cartridge"),
            ContainerKind::Vial => write!(f, "vial"),
        }
    }
}

/// A named daily sub-dose, e.g. `breakfast = 10`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub label: String,
    pub units: f64,
}

/// Input for [`estimate_supply`]
#[derive(Clone, Debug)]
pub struct SupplyRequest {
    pub injections: Vec<Injection>,
    pub container: ContainerKind,
    /// Units per container
    pub capacity: f64,
    pub containers_per_box: Option<u32>,
    /// Units lost per nonzero injection (pens and cartridges only)
    pub priming_units: f64,
    /// Discard a container once it has been open this many days
    pub discard_after_days: Option<u32>,
    pub days: u32,
    /// Allow one injection to be drawn from two containers
    pub split_injections: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupplyEstimate {
    pub days: u32,
    pub daily_dose: f64,
    pub daily_priming: f64,
    pub containers: u32,
    pub boxes: Option<u32>,
    pub units_dosed: f64,
    pub units_primed: f64,
    /// Units discarded because a container expired
    pub units_discarded: f64,
    /// Units left behind because an injection did not fit (no-split mode)
    pub units_stranded: f64,
    /// Units still in the last open container
    pub leftover: f64,
    pub discard_events: u32,
}

impl SupplyEstimate {
    pub fn units_consumed(&self) -> f64 {
        self.units_dosed + self.units_primed
    }

    pub fn units_wasted(&self) -> f64 {
        self.units_discarded + self.units_stranded
    }

    /// `containers * capacity - (consumed + wasted + leftover)`; zero when the
    /// books balance
    pub fn imbalance(&self, capacity: f64) -> f64 {
        self.containers as f64 * capacity
            - (self.units_consumed() + self.units_wasted() + self.leftover)
    }
}

impl SupplyRequest {
    fn validate(&self) -> Result<()> {
        if self.injections.is_empty() || self.injections.len() > MAX_INJECTIONS {
            return Err(Error::invalid(
                "injections",
                format!("between 1 and {} injections are required", MAX_INJECTIONS),
            ));
        }
        for inj in &self.injections {
            if !inj.units.is_finite() || inj.units < 0.0 {
                return Err(Error::invalid(
                    "injections",
                    format!("'{}' has invalid units {}", inj.label, inj.units),
                ));
            }
        }
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(Error::invalid("capacity", "must be a positive number"));
        }
        if !self.priming_units.is_finite() || self.priming_units < 0.0 {
            return Err(Error::invalid("priming_units", "must be zero or more"));
        }
        if self.days == 0 {
            return Err(Error::invalid("days", "must be at least 1"));
        }
        check_schedule_days(self.days as u64, "days")?;
        if self.discard_after_days == Some(0) {
            return Err(Error::invalid("discard_after_days", "must be at least 1"));
        }
        if self.containers_per_box == Some(0) {
            return Err(Error::invalid("containers_per_box", "must be at least 1"));
        }
        if !self.split_injections {
            if let Some(inj) = self
                .injection_needs()
                .into_iter()
                .find(|need| *need > self.capacity + COMBO_EPSILON)
            {
                return Err(Error::invalid(
                    "injections",
                    format!(
                        "an injection of {} units does not fit a {} unit container",
                        inj, self.capacity
                    ),
                ));
            }
        }
        Ok(())
    }

    fn priming_per_injection(&self) -> f64 {
        if self.container.uses_priming() {
            self.priming_units
        } else {
            0.0
        }
    }

    /// Units drawn per nonzero injection, including priming
    fn injection_needs(&self) -> Vec<f64> {
        let priming = self.priming_per_injection();
        self.injections
            .iter()
            .filter(|i| i.units > COMBO_EPSILON)
            .map(|i| i.units + priming)
            .collect()
    }
}

#[derive(Debug)]
struct OpenContainer {
    opened_day: u32,
    remaining: f64,
}

#[derive(Debug)]
struct SupplySim {
    capacity: f64,
    containers: u32,
    current: Option<OpenContainer>,
    discarded: f64,
    stranded: f64,
    discard_events: u32,
}

impl SupplySim {
    fn new(capacity: f64) -> Self {
        Self {
            capacity,
            containers: 0,
            current: None,
            discarded: 0.0,
            stranded: 0.0,
            discard_events: 0,
        }
    }

    fn open(&mut self, day: u32) -> &mut OpenContainer {
        self.containers += 1;
        self.current.insert(OpenContainer {
            opened_day: day,
            remaining: self.capacity,
        })
    }

    /// Retire the open container if it has reached its age limit.
    fn expire(&mut self, day: u32, limit: u32) {
        let Some(open) = &self.current else {
            return;
        };
        if day - open.opened_day < limit {
            return;
        }
        if open.remaining > COMBO_EPSILON {
            self.discarded += open.remaining;
            self.discard_events += 1;
            tracing::debug!(
                "Day {}: discarding container opened day {} with {} units left",
                day,
                open.opened_day,
                open.remaining
            );
        }
        self.current = None;
    }

    /// Draw `need` units, spreading across containers as they run dry.
    fn draw_split(&mut self, day: u32, mut need: f64) {
        while need > COMBO_EPSILON {
            let open = match self.current.take() {
                Some(open) if open.remaining > COMBO_EPSILON => self.current.insert(open),
                _ => self.open(day),
            };
            let take = need.min(open.remaining);
            open.remaining -= take;
            need -= take;
        }
    }

    /// Draw `need` units from a single container, abandoning what is left
    /// in the current one if it cannot cover the whole injection.
    fn draw_whole(&mut self, day: u32, need: f64) {
        let fits = self
            .current
            .as_ref()
            .is_some_and(|open| open.remaining + COMBO_EPSILON >= need);
        if !fits {
            if let Some(open) = self.current.take() {
                self.stranded += open.remaining;
            }
            self.open(day);
        }
        if let Some(open) = self.current.as_mut() {
            open.remaining = (open.remaining - need).max(0.0);
        }
    }

    fn leftover(&self) -> f64 {
        self.current.as_ref().map_or(0.0, |open| open.remaining)
    }
}

/// Walk the days, opening and discarding containers, and total the supply.
///
/// A container is opened on the first day units are actually drawn, so the
/// discard clock only starts once it is in use.
pub fn estimate_supply(request: &SupplyRequest) -> Result<SupplyEstimate> {
    request.validate()?;

    let daily_dose: f64 = request.injections.iter().map(|i| i.units).sum();
    let needs = request.injection_needs();
    let daily_priming = request.priming_per_injection() * needs.len() as f64;

    let mut sim = SupplySim::new(request.capacity);
    if daily_dose > COMBO_EPSILON {
        for day in 0..request.days {
            if let Some(limit) = request.discard_after_days {
                sim.expire(day, limit);
            }
            for &need in &needs {
                if request.split_injections {
                    sim.draw_split(day, need);
                } else {
                    sim.draw_whole(day, need);
                }
            }
        }
    }

    let days = request.days as f64;
    let estimate = SupplyEstimate {
        days: request.days,
        daily_dose,
        daily_priming,
        containers: sim.containers,
        boxes: request
            .containers_per_box
            .map(|per_box| ceil_div(sim.containers, per_box)),
        units_dosed: if daily_dose > COMBO_EPSILON {
            daily_dose * days
        } else {
            0.0
        },
        units_primed: daily_priming * days,
        units_discarded: sim.discarded,
        units_stranded: sim.stranded,
        leftover: sim.leftover(),
        discard_events: sim.discard_events,
    };

    tracing::info!(
        "Supply for {} days of {} units/day ({} priming) in {} {}s: {} containers, {} wasted, {} left",
        request.days,
        daily_dose,
        daily_priming,
        request.capacity,
        request.container,
        estimate.containers,
        estimate.units_wasted(),
        estimate.leftover
    );

    Ok(estimate)
}
