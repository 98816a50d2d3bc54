//! Scenario construction and validation: the boundary between untrusted
//! JSON configuration and a type-checked `ScenarioParams`.

mod params;

pub use params::{DriverConfig, EstablishmentConfig, MatchingConfig, RewardObjective, ScenarioParams};

use serde::Deserialize;

use crate::distributions::RateFunction;
use crate::errors::ScenarioError;
use crate::matching::MatchingKind;

/// JSON rate-function shape, deserialized from scenario files and converted
/// into a `RateFunction` during validation. A named registry, not an
/// expression evaluator — untrusted scenario input must not run code.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateFunctionFile {
    Constant { rate: f64 },
    Linear { start: f64, end: f64 },
    Parabolic { a: f64, b: f64, c: f64 },
    Piecewise { breakpoints: Vec<(f64, f64)> },
}

impl From<RateFunctionFile> for RateFunction {
    fn from(value: RateFunctionFile) -> Self {
        match value {
            RateFunctionFile::Constant { rate } => RateFunction::Constant(rate),
            RateFunctionFile::Linear { start, end } => RateFunction::Linear { start, end },
            RateFunctionFile::Parabolic { a, b, c } => RateFunction::Parabolic { a, b, c },
            RateFunctionFile::Piecewise { breakpoints } => RateFunction::Piecewise(breakpoints),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingKindFile {
    Random,
    Nearest,
    CostBased,
}

impl From<MatchingKindFile> for MatchingKind {
    fn from(value: MatchingKindFile) -> Self {
        match value {
            MatchingKindFile::Random => MatchingKind::Random,
            MatchingKindFile::Nearest => MatchingKind::Nearest,
            MatchingKindFile::CostBased => MatchingKind::CostBased,
        }
    }
}

/// Raw, untrusted scenario JSON. Every field is optional so partial
/// scenario files fall back to `ScenarioParams::default()` field by field;
/// `validate()` is the only way to obtain a usable `ScenarioParams`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioFile {
    pub seed: Option<u64>,
    pub grid_size: Option<i32>,
    pub num_establishments: Option<usize>,
    pub num_drivers: Option<usize>,
    pub time_window: Option<f64>,
    pub max_time_step: Option<u64>,
    pub order_rate: Option<RateFunctionFile>,
    pub operating_radius: Option<f64>,
    pub min_prep_time: Option<f64>,
    pub max_prep_time: Option<f64>,
    pub target_prep_rate: Option<f64>,
    pub catalog_size: Option<u32>,
    pub production_capacity: Option<u32>,
    pub percentage_allocation_driver: Option<f64>,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub max_capacity: Option<u32>,
    pub max_delay_percentage: Option<f64>,
    pub matching_algorithm: Option<MatchingKindFile>,
    pub reward_objective: Option<u8>,
}

impl ScenarioFile {
    /// Parse from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        serde_json::from_str(text).map_err(|e| ScenarioError::InvalidField {
            field: "<root>",
            reason: e.to_string(),
        })
    }

    /// Validate and merge onto defaults, failing fast on out-of-range or
    /// structurally invalid fields: errors are raised at construction, not
    /// discovered mid-run.
    pub fn validate(self) -> Result<ScenarioParams, ScenarioError> {
        let defaults = ScenarioParams::default();
        let mut params = defaults.clone();

        if let Some(grid_size) = self.grid_size {
            if grid_size <= 0 {
                return Err(ScenarioError::InvalidField {
                    field: "grid_size",
                    reason: "must be positive".to_string(),
                });
            }
            params.grid_size = grid_size;
        }
        if let Some(n) = self.num_establishments {
            if n == 0 {
                return Err(ScenarioError::InvalidField {
                    field: "num_establishments",
                    reason: "must be at least 1".to_string(),
                });
            }
            params.num_establishments = n;
        }
        if let Some(n) = self.num_drivers {
            params.num_drivers = n;
        }
        if let Some(window) = self.time_window {
            if window <= 0.0 {
                return Err(ScenarioError::InvalidField {
                    field: "time_window",
                    reason: "must be positive".to_string(),
                });
            }
            params.time_window = window;
        }
        if let Some(max_time_step) = self.max_time_step {
            params.max_time_step = max_time_step;
        }
        if let Some(rate) = self.order_rate {
            params.order_rate = rate.into();
        }

        let est = &mut params.establishment;
        if let Some(radius) = self.operating_radius {
            est.operating_radius = radius;
        }
        if let Some(min_prep) = self.min_prep_time {
            est.min_prep_time = min_prep;
        }
        if let Some(max_prep) = self.max_prep_time {
            est.max_prep_time = max_prep;
        }
        if est.max_prep_time < est.min_prep_time {
            return Err(ScenarioError::InvalidRange {
                field: "prep_time",
                min: est.min_prep_time,
                max: est.max_prep_time,
            });
        }
        if let Some(target) = self.target_prep_rate {
            est.target_prep_rate = target;
        }
        if let Some(catalog) = self.catalog_size {
            est.catalog_size = catalog;
        }
        if let Some(capacity) = self.production_capacity {
            est.production_capacity = capacity;
        }
        if let Some(p) = self.percentage_allocation_driver {
            if !(0.0..=1.0).contains(&p) {
                return Err(ScenarioError::InvalidRange {
                    field: "percentage_allocation_driver",
                    min: 0.0,
                    max: 1.0,
                });
            }
            est.percentage_allocation_driver = p;
        }

        let driver = &mut params.driver;
        if let Some(min_speed) = self.min_speed {
            driver.min_speed = min_speed;
        }
        if let Some(max_speed) = self.max_speed {
            driver.max_speed = max_speed;
        }
        if driver.max_speed < driver.min_speed || driver.min_speed <= 0.0 {
            return Err(ScenarioError::InvalidRange {
                field: "driver_speed",
                min: driver.min_speed,
                max: driver.max_speed,
            });
        }
        if let Some(capacity) = self.max_capacity {
            if capacity == 0 {
                return Err(ScenarioError::InvalidField {
                    field: "max_capacity",
                    reason: "must be at least 1".to_string(),
                });
            }
            driver.max_capacity = capacity;
        }
        if let Some(tolerance) = self.max_delay_percentage {
            driver.max_delay_percentage = tolerance;
        }

        if let Some(kind) = self.matching_algorithm {
            params.matching.kind = kind.into();
        }

        if let Some(objective) = self.reward_objective {
            if !(1..=10).contains(&objective) {
                return Err(ScenarioError::InvalidRewardObjective(objective));
            }
            params.reward_objective = objective;
        }

        if params.num_drivers == 0 {
            return Err(ScenarioError::InvalidField {
                field: "num_drivers",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_validates_to_defaults() {
        let params = ScenarioFile::default().validate().expect("valid");
        assert_eq!(params.num_drivers, ScenarioParams::default().num_drivers);
    }

    #[test]
    fn zero_grid_size_is_rejected() {
        let mut file = ScenarioFile::default();
        file.grid_size = Some(0);
        assert!(file.validate().is_err());
    }

    #[test]
    fn invalid_reward_objective_is_rejected() {
        let mut file = ScenarioFile::default();
        file.reward_objective = Some(11);
        assert_eq!(
            file.validate().unwrap_err(),
            ScenarioError::InvalidRewardObjective(11)
        );
    }

    #[test]
    fn inverted_prep_time_range_is_rejected() {
        let mut file = ScenarioFile::default();
        file.min_prep_time = Some(30.0);
        file.max_prep_time = Some(10.0);
        assert!(file.validate().is_err());
    }

    #[test]
    fn json_round_trips_through_validate() {
        let json = r#"{"num_drivers": 7, "grid_size": 40}"#;
        let params = ScenarioFile::from_json(json).unwrap().validate().unwrap();
        assert_eq!(params.num_drivers, 7);
        assert_eq!(params.grid_size, 40);
    }
}
