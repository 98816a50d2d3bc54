//! # Food-Delivery Dispatch Simulation Core
//!
//! A discrete-event simulation engine for modeling last-mile food-delivery
//! dispatch, built as a training/evaluation environment for reinforcement
//! learning agents and heuristic dispatchers.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Event Scheduling**: a virtual-time discrete event system
//! - **ECS Framework**: Entity Component System for order/driver/establishment state
//! - **Order Lifecycle**: a strictly-ordered status state machine
//! - **Dynamic Reordering**: opportunistic pickup insertion under time-window tolerance
//! - **Agent Step Protocol**: `reset`/`step` adapter with a multi-objective reward family
//!
//! ## Key Concepts
//!
//! - **Discrete Events**: all simulation progress happens through scheduled events
//! - **Core Events**: events surfaced to the outside policy (an order needs a driver)
//! - **Deterministic**: a single seeded RNG ensures reproducible results
//!
//! ## Example
//!
//! ```rust,no_run
//! use dispatch_sim::agent::AgentEnv;
//! use dispatch_sim::scenario::ScenarioParams;
//!
//! let mut env = AgentEnv::new(ScenarioParams::default());
//! let (_observation, _info) = env.reset(Some(42));
//! ```

pub mod agent;
pub mod clock;
pub mod cost;
pub mod distributions;
pub mod ecs;
pub mod errors;
pub mod establishment;
pub mod map;
pub mod matching;
pub mod profiling;
pub mod reorder;
pub mod rng;
pub mod runner;
pub mod scenario;
pub mod systems;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
