//! Vertical descent integrator.
//!
//! Order inside one step: gravity raises the downward velocity, the burn
//! force lowers it, then the position moves by the updated velocity. The
//! force therefore acts in the same tick it is produced. This is a
//! semi-implicit Euler step and the ordering is part of the game feel.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::flight::Outcome;

/// Everything that changes about the lander from tick to tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanderState {
    /// Y of the lander's top edge; grows downward.
    pub vertical_position: f64,
    /// Cumulative downward speed in pixels per tick; negative means ascending.
    pub vertical_velocity: f64,
    pub burn_stack_depth: u32,
    pub current_burn_force: f64,
    pub outcome: Outcome,
    /// Latched once the strut condition is met; cleared only by reset.
    pub struts_deployed: bool,
    /// Velocity at touch-down, set on the terminal transition.
    pub landing_speed: Option<f64>,
}

impl LanderState {
    pub fn initial(config: &SimConfig) -> Self {
        Self {
            vertical_position: config.start_y,
            vertical_velocity: 0.0,
            burn_stack_depth: 0,
            current_burn_force: 0.0,
            outcome: Outcome::Flying,
            struts_deployed: false,
            landing_speed: None,
        }
    }

    /// Y of the lander's bottom edge.
    pub fn bottom_y(&self, config: &SimConfig) -> f64 {
        self.vertical_position + config.lander_height
    }

    pub fn distance_to_ground(&self, config: &SimConfig) -> f64 {
        config.ground_y - self.bottom_y(config)
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }
}

/// Advance position and velocity by one tick under `applied_force`.
///
/// Velocity is not clamped; a strong enough burn makes it negative.
pub fn step(state: &mut LanderState, applied_force: f64, config: &SimConfig) {
    state.vertical_velocity += config.gravity_per_tick();
    state.vertical_velocity -= applied_force;
    state.vertical_position += state.vertical_velocity;
    state.current_burn_force = applied_force;
}
