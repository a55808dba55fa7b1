//! Pure lander logic for Robolander.
//!
//! This crate contains the descent simulation rules that are independent of
//! any renderer, timer, or UI. Functions take plain data and return results,
//! so every piece can be unit-tested on its own and driven by the engine in
//! `robolander-sim` or by the headless harness.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`burn`] | Burn stack accumulator that ramps thrust over several ticks |
//! | [`compiler`] | Compiles editor rules into an executable decision program |
//! | [`config`] | Session configuration and validation |
//! | [`constants`] | Default physics and geometry constants |
//! | [`flight`] | Flying / Landed / Crashed outcome and strut deployment |
//! | [`physics`] | Semi-implicit vertical integrator and `LanderState` |
//! | [`rules`] | Rule records, closed vocabulary, and rule set editing |
//!
//! # Per-tick pipeline
//!
//! ```
//! use robolander_logic::burn::BurnSmoother;
//! use robolander_logic::compiler::{compile, Sensors};
//! use robolander_logic::config::SimConfig;
//! use robolander_logic::flight::evaluate_flight;
//! use robolander_logic::physics::{step, LanderState};
//! use robolander_logic::rules::RuleSet;
//!
//! let config = SimConfig::default();
//! let program = compile(RuleSet::starter().rules()).unwrap();
//! let mut burn = BurnSmoother::new(config.burn_base_unit, config.burn_stack_cap);
//! let mut state = LanderState::initial(&config);
//!
//! let sensors = Sensors::from_state(&state, &config);
//! let output = program.evaluate(&sensors).unwrap();
//! if output.thrust_level() > 0.0 {
//!     burn.request_burn();
//! }
//! let force = burn.tick();
//! step(&mut state, force, &config);
//! evaluate_flight(&mut state, &config);
//! ```

pub mod burn;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod flight;
pub mod physics;
pub mod rules;
