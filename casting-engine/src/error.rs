use thiserror::Error;

/// Raised before a solve starts when the weighting or preference limits are unusable.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("max_preferences must be between 1 and {max} (got {value})")]
    PreferenceLimit { value: usize, max: usize },
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidWeight { field: &'static str, value: f64 },
    #[error("normalization must be a finite number greater than zero (got {value})")]
    InvalidNormalization { value: f64 },
    #[error("solver_budget must be greater than zero")]
    EmptySolverBudget,
    #[error("could not parse {field} from environment value {value:?}")]
    Environment { field: &'static str, value: String },
}

/// Errors that abort a run or an I/O operation around it.
#[derive(Debug, Error)]
pub enum CastingError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("disappointment costs overflow the solver's integer range")]
    CostOverflow,
    #[error("refusing to commit an infeasible assignment ({0})")]
    InfeasibleCommit(String),
    #[error("override store lock poisoned")]
    LockPoisoned,
}
