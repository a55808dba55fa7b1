//! Flight outcome state machine.
//!
//! `Flying` moves to `Landed` or `Crashed` once the lander bottom reaches
//! the ground; both are terminal until an explicit reset. Strut deployment
//! is a separate latched signal, checked first so it can fire on the same
//! tick as the touch-down.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SimConfig;
use crate::physics::LanderState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Flying,
    Landed,
    Crashed,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Outcome::Landed | Outcome::Crashed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Flying => "flying",
            Outcome::Landed => "landed",
            Outcome::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// What one evaluation observed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlightEvaluation {
    /// Strut condition held this tick.
    pub strut_signal: bool,
    /// Struts went from retracted to deployed this tick.
    pub struts_just_deployed: bool,
    /// Set when this tick moved the lander out of `Flying`.
    pub transition: Option<Outcome>,
}

/// Lander is low enough and slow enough to extend its struts.
pub fn strut_condition(state: &LanderState, config: &SimConfig) -> bool {
    state.bottom_y(config) >= config.ground_y - config.strut_pre_deploy_margin
        && state.vertical_velocity
            <= config.safe_landing_velocity + config.strut_velocity_allowance
}

/// Classify the state after a physics step and apply any transition.
///
/// Terminal states are left untouched.
pub fn evaluate_flight(state: &mut LanderState, config: &SimConfig) -> FlightEvaluation {
    let mut eval = FlightEvaluation::default();
    if state.is_terminal() {
        return eval;
    }

    if strut_condition(state, config) {
        eval.strut_signal = true;
        eval.struts_just_deployed = !state.struts_deployed;
        state.struts_deployed = true;
    }

    let touching = state.bottom_y(config) >= config.ground_y;
    if touching && state.vertical_velocity <= config.safe_landing_velocity {
        state.outcome = Outcome::Landed;
        state.landing_speed = Some(state.vertical_velocity);
        state.vertical_position = config.resting_y();
        eval.transition = Some(Outcome::Landed);
    } else if touching {
        state.outcome = Outcome::Crashed;
        state.landing_speed = Some(state.vertical_velocity);
        eval.transition = Some(Outcome::Crashed);
    }

    eval
}
