//! Error types for the dose_core library.

use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied parameter failed validation
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// No usable strength survived canonicalization
    #[error("Strength set is empty: at least one positive strength is required")]
    EmptyStrengthSet,

    /// A single dose has no exact decomposition
    #[error("Dose {dose} cannot be made from the available strengths")]
    UnrepresentableDose { dose: f64 },

    /// A taper step (1-based) has no exact decomposition
    #[error("Step {step}: dose {dose} cannot be made from the available strengths")]
    UnrepresentableStep { step: usize, dose: f64 },

    /// A scheduled day has no exact decomposition
    #[error("{date}: dose {dose} cannot be made from the available strengths")]
    UnrepresentableOnDate { date: NaiveDate, dose: f64 },

    /// Once-weekly dose is not a whole (or half) multiple of the strength
    #[error("Weekly dose {dose} is not representable by strength {strength}")]
    NotExactMultiple { dose: f64, strength: f64 },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the "no decomposition exists" family of errors
    pub fn is_unrepresentable(&self) -> bool {
        matches!(
            self,
            Error::UnrepresentableDose { .. }
                | Error::UnrepresentableStep { .. }
                | Error::UnrepresentableOnDate { .. }
                | Error::NotExactMultiple { .. }
        )
    }
}
