//! Robolander Sim - fixed-period lander simulation engine
//!
//! Wraps the pure logic in `robolander-logic` into a single-threaded loop
//! that owns all session state:
//! - **Rules**: the editable rule set and its last good compiled program
//! - **Lander**: position, velocity, burn stack and flight outcome
//! - **Snapshots**: immutable per-tick copies for renderers to poll or subscribe to
//!
//! # Example
//!
//! ```rust,no_run
//! use robolander_sim::prelude::*;
//!
//! let mut sim = SimulationLoop::with_defaults().unwrap();
//! let snapshots = sim.subscribe();
//!
//! let driver = RealtimeDriver::new(sim.config());
//! let reason = driver.run(&mut sim);
//! println!("stopped: {:?}, last y = {}", reason, sim.latest_snapshot().y);
//! # drop(snapshots);
//! ```

pub mod driver;
pub mod engine;
pub mod error;
pub mod snapshot;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::driver::{RealtimeDriver, StopReason};
    pub use crate::engine::{SimulationLoop, TickStatus};
    pub use crate::error::SimError;
    pub use crate::snapshot::{ReferenceMarker, Snapshot};
    pub use robolander_logic::config::SimConfig;
    pub use robolander_logic::flight::Outcome;
    pub use robolander_logic::rules::{Literal, NewRule, Rule, RulePatch, RuleSet};
}
