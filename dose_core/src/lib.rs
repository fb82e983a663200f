#![forbid(unsafe_code)]

//! Dose decomposition and scheduling engine.
//!
//! This crate provides:
//! - Exact combination search over tablet strengths (with optional halves)
//! - Schedule generators: weekday pattern, stepped taper, weekly/cyclic
//!   variable dosing, once-weekly single strength
//! - Injectable supply estimation with priming and discard wastage
//! - Dispensing totals with box and sheet rounding
//! - Product presets, configuration and CSV export

pub mod types;
pub mod error;
pub mod numeric;
pub mod strength;
pub mod combo;
pub mod packaging;
pub mod pattern;
pub mod taper;
pub mod variable;
pub mod weekly;
pub mod supply;
pub mod catalog;
pub mod config;
pub mod export;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use numeric::{COMBO_EPSILON, EXACT_EPSILON};
pub use strength::StrengthSet;
pub use combo::{find_best_combo_exact, generate_pieces, score_combo, ComboSolver};
pub use packaging::Packaging;
pub use pattern::{generate_day_pattern, DayPatternRequest, DayPatternSchedule};
pub use taper::{generate_taper, TaperRequest, TaperSchedule, TaperStep};
pub use variable::{generate_variable, DoseSource, VariableRequest, VariableSchedule};
pub use weekly::{generate_once_weekly, OnceWeeklyRequest, OnceWeeklySchedule};
pub use supply::{estimate_supply, ContainerKind, Injection, SupplyEstimate, SupplyRequest};
pub use catalog::{get_default_catalog, Catalog, Product, ProductForm};
pub use config::Config;
pub use export::write_schedule_csv;
