//! Scenario configuration resources and the `ScenarioParams` builder.
//!
//! Each `*Config` is a small `Resource` inserted into the `World` at
//! `initialize_simulation` time, mirroring how the source keeps tunables as
//! first-class resources rather than threading extra function arguments
//! through every system.

use bevy_ecs::prelude::Resource;

use crate::distributions::RateFunction;
use crate::matching::MatchingKind;

/// Which of the ten reward objectives the agent adapter computes.
pub type RewardObjective = u8;

#[derive(Debug, Clone, Copy, Resource)]
pub struct EstablishmentConfig {
    pub operating_radius: f64,
    pub min_prep_time: f64,
    pub max_prep_time: f64,
    pub target_prep_rate: f64,
    pub catalog_size: u32,
    pub production_capacity: u32,
    pub percentage_allocation_driver: f64,
}

impl Default for EstablishmentConfig {
    fn default() -> Self {
        Self {
            operating_radius: 5.0,
            min_prep_time: 5.0,
            max_prep_time: 20.0,
            target_prep_rate: 10.0,
            catalog_size: 10,
            production_capacity: 3,
            percentage_allocation_driver: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Resource)]
pub struct DriverConfig {
    pub min_speed: f64,
    pub max_speed: f64,
    pub max_capacity: u32,
    pub max_delay_percentage: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            min_speed: 1.0,
            max_speed: 1.0,
            max_capacity: 2,
            max_delay_percentage: 80.0,
        }
    }
}

#[derive(Debug, Clone, Resource)]
pub struct MatchingConfig {
    pub kind: MatchingKind,
    pub eta_weight: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            kind: MatchingKind::CostBased,
            eta_weight: 1.0,
        }
    }
}

/// Fully-resolved, validated scenario parameters. Construct directly for
/// tests (`ScenarioParams::default()` or the `with_*` builders), or obtain
/// one from `ScenarioFile::validate()` for untrusted JSON input.
#[derive(Debug, Clone, Resource)]
pub struct ScenarioParams {
    pub seed: Option<u64>,
    pub grid_size: i32,
    pub num_establishments: usize,
    pub num_drivers: usize,
    pub time_window: f64,
    pub max_time_step: u64,
    pub order_rate: RateFunction,
    pub establishment: EstablishmentConfig,
    pub driver: DriverConfig,
    pub matching: MatchingConfig,
    pub reward_objective: RewardObjective,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            seed: Some(0),
            grid_size: 20,
            num_establishments: 3,
            num_drivers: 4,
            time_window: 200.0,
            max_time_step: 500,
            order_rate: RateFunction::homogeneous(50, 200.0),
            establishment: EstablishmentConfig::default(),
            driver: DriverConfig::default(),
            matching: MatchingConfig::default(),
            reward_objective: 1,
        }
    }
}

impl ScenarioParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_grid_size(mut self, size: i32) -> Self {
        self.grid_size = size;
        self
    }

    pub fn with_num_establishments(mut self, n: usize) -> Self {
        self.num_establishments = n;
        self
    }

    pub fn with_num_drivers(mut self, n: usize) -> Self {
        self.num_drivers = n;
        self
    }

    pub fn with_time_window(mut self, window: f64) -> Self {
        self.time_window = window;
        self
    }

    pub fn with_max_time_step(mut self, max_time_step: u64) -> Self {
        self.max_time_step = max_time_step;
        self
    }

    pub fn with_order_rate(mut self, rate: RateFunction) -> Self {
        self.order_rate = rate;
        self
    }

    pub fn with_reward_objective(mut self, objective: RewardObjective) -> Self {
        self.reward_objective = objective;
        self
    }

    pub fn with_matching(mut self, kind: MatchingKind) -> Self {
        self.matching.kind = kind;
        self
    }
}
