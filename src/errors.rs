//! Error kinds for the configuration and step boundaries.
//!
//! Internal invariant violations are not modeled as `Result`s: they are bugs,
//! checked with `assert!`/`debug_assert!` at the point of violation.

use std::fmt;

/// A scenario failed validation. Reported at construction; the simulation
/// does not start.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioError {
    MissingField(&'static str),
    InvalidField {
        field: &'static str,
        reason: String,
    },
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    InvalidRewardObjective(u8),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::MissingField(field) => {
                write!(f, "scenario is missing required field `{field}`")
            }
            ScenarioError::InvalidField { field, reason } => {
                write!(f, "scenario field `{field}` is invalid: {reason}")
            }
            ScenarioError::InvalidRange { field, min, max } => write!(
                f,
                "scenario field `{field}` has an invalid range [{min}, {max}]"
            ),
            ScenarioError::InvalidRewardObjective(objective) => write!(
                f,
                "invalid reward objective {objective}; must be in 1..=10"
            ),
        }
    }
}

impl std::error::Error for ScenarioError {}

/// A `step()` call received an invalid action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    ActionOutOfRange { action: usize, num_drivers: usize },
    NotReset,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::ActionOutOfRange {
                action,
                num_drivers,
            } => write!(
                f,
                "action {action} is invalid; must be in 0..{num_drivers}"
            ),
            StepError::NotReset => {
                write!(f, "step() called before reset(); call reset() first")
            }
        }
    }
}

impl std::error::Error for StepError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let err = ScenarioError::MissingField("grid_map.size");
        assert!(err.to_string().contains("grid_map.size"));
    }

    #[test]
    fn action_error_names_bounds() {
        let err = StepError::ActionOutOfRange {
            action: 5,
            num_drivers: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }
}
