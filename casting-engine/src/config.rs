use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::casting::MAX_PREFERENCES;
use crate::error::{CastingError, ConfigurationError};

/// Weighting and limits for one casting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastingConfig {
    /// Maximum preferences per player (K)
    pub max_preferences: usize,
    /// Multiplier applied to a player's registration age
    pub registration_weight: f64,
    /// Multiplier applied to a player's payment age
    pub payment_weight: f64,
    /// Divisor shared by both age factors
    pub normalization: f64,
    /// Largest cost matrix (players x characters) the solver will attempt
    pub solver_budget: Option<usize>,
}

impl Default for CastingConfig {
    fn default() -> Self {
        Self {
            max_preferences: 5,
            registration_weight: 1.0,
            payment_weight: 1.0,
            normalization: 1.0,
            solver_budget: None,
        }
    }
}

impl CastingConfig {
    /// Loads the config from a JSON file (or defaults), applies environment overrides and validates it.
    pub fn load(path: Option<&Path>) -> Result<Self, CastingError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from `CASTING_*` variables; `lookup` is injected so tests avoid the process env.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CASTING_MAX_PREFERENCES") {
            self.max_preferences = parse_env("max_preferences", &raw)?;
        }
        if let Some(raw) = lookup("CASTING_REGISTRATION_WEIGHT") {
            self.registration_weight = parse_env("registration_weight", &raw)?;
        }
        if let Some(raw) = lookup("CASTING_PAYMENT_WEIGHT") {
            self.payment_weight = parse_env("payment_weight", &raw)?;
        }
        if let Some(raw) = lookup("CASTING_NORMALIZATION") {
            self.normalization = parse_env("normalization", &raw)?;
        }
        if let Some(raw) = lookup("CASTING_SOLVER_BUDGET") {
            self.solver_budget = Some(parse_env("solver_budget", &raw)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_preferences == 0 || self.max_preferences > MAX_PREFERENCES {
            return Err(ConfigurationError::PreferenceLimit {
                value: self.max_preferences,
                max: MAX_PREFERENCES,
            });
        }
        check_weight("registration_weight", self.registration_weight)?;
        check_weight("payment_weight", self.payment_weight)?;
        if !self.normalization.is_finite() || self.normalization <= 0.0 {
            return Err(ConfigurationError::InvalidNormalization {
                value: self.normalization,
            });
        }
        if self.solver_budget == Some(0) {
            return Err(ConfigurationError::EmptySolverBudget);
        }
        Ok(())
    }
}

fn check_weight(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidWeight { field, value })
    }
}

fn parse_env<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigurationError> {
    raw.trim().parse().map_err(|_| ConfigurationError::Environment {
        field,
        value: raw.to_string(),
    })
}
