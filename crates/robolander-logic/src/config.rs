//! Session configuration, fixed when a simulation starts.
//!
//! ```
//! use robolander_logic::config::{validate_config, SimConfig};
//!
//! let config = SimConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert!((config.ground_y - 950.0).abs() < f64::EPSILON);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{self, burn, lander, landing, world};

/// Physics, geometry and pacing parameters for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick period in milliseconds.
    pub tick_period_ms: u64,
    /// Gravitational acceleration in m/s².
    pub gravity: f64,
    pub px_per_metre: f64,
    pub world_width: f64,
    pub world_height: f64,
    pub ground_y: f64,
    pub lander_width: f64,
    pub lander_height: f64,
    pub start_x: f64,
    pub start_y: f64,
    /// Touch-down at or below this velocity is a landing, above it a crash.
    pub safe_landing_velocity: f64,
    /// Velocity allowance added to `safe_landing_velocity` for strut deployment.
    pub strut_velocity_allowance: f64,
    /// Altitude above ground at which struts may extend.
    pub strut_pre_deploy_margin: f64,
    pub burn_base_unit: f64,
    pub burn_stack_cap: u32,
    /// Refresh the display velocity every N ticks.
    pub display_every_ticks: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: constants::TICK_PERIOD_MS,
            gravity: constants::GRAVITY,
            px_per_metre: constants::PX_PER_METRE,
            world_width: world::WIDTH,
            world_height: world::HEIGHT,
            ground_y: world::GROUND_Y,
            lander_width: lander::WIDTH,
            lander_height: lander::HEIGHT,
            start_x: lander::START_X,
            start_y: lander::START_Y,
            safe_landing_velocity: landing::SAFE_VELOCITY,
            strut_velocity_allowance: landing::STRUT_VELOCITY_ALLOWANCE,
            strut_pre_deploy_margin: landing::STRUT_PRE_DEPLOY_MARGIN,
            burn_base_unit: burn::BASE_UNIT,
            burn_stack_cap: burn::STACK_CAP,
            display_every_ticks: constants::DISPLAY_EVERY_TICKS,
        }
    }
}

impl SimConfig {
    /// Tick period in seconds.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_period_ms as f64 / 1000.0
    }

    /// Velocity gained from gravity in a single tick.
    pub fn gravity_per_tick(&self) -> f64 {
        self.gravity * self.px_per_metre * self.tick_seconds()
    }

    /// Lander top-edge Y at which its bottom rests on the ground.
    pub fn resting_y(&self) -> f64 {
        self.ground_y - self.lander_height
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroTickPeriod,
    /// Gravity must be finite and not negative.
    InvalidGravity(f64),
    InvalidScale(f64),
    InvalidLanderSize { width: f64, height: f64 },
    /// Ground must sit inside the world, below the start position.
    GroundOutOfWorld(f64),
    NegativeSafeVelocity(f64),
    NegativeStrutSetting,
    InvalidBurnUnit(f64),
    ZeroBurnCap,
    ZeroDisplayDecimation,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickPeriod => write!(f, "tick period must be at least 1 ms"),
            ConfigError::InvalidGravity(g) => write!(f, "invalid gravity: {}", g),
            ConfigError::InvalidScale(s) => write!(f, "invalid pixel-per-metre scale: {}", s),
            ConfigError::InvalidLanderSize { width, height } => {
                write!(f, "invalid lander size: {}x{}", width, height)
            }
            ConfigError::GroundOutOfWorld(y) => {
                write!(f, "ground y {} is outside the world or above the start", y)
            }
            ConfigError::NegativeSafeVelocity(v) => {
                write!(f, "safe landing velocity must not be negative: {}", v)
            }
            ConfigError::NegativeStrutSetting => {
                write!(f, "strut margin and velocity allowance must not be negative")
            }
            ConfigError::InvalidBurnUnit(u) => write!(f, "invalid burn base unit: {}", u),
            ConfigError::ZeroBurnCap => write!(f, "burn stack cap must be at least 1"),
            ConfigError::ZeroDisplayDecimation => {
                write!(f, "display decimation must be at least 1 tick")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Validate a session configuration, returning all errors found.
pub fn validate_config(config: &SimConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.tick_period_ms == 0 {
        errors.push(ConfigError::ZeroTickPeriod);
    }
    if !non_negative(config.gravity) {
        errors.push(ConfigError::InvalidGravity(config.gravity));
    }
    if !positive(config.px_per_metre) {
        errors.push(ConfigError::InvalidScale(config.px_per_metre));
    }
    if !positive(config.lander_width) || !positive(config.lander_height) {
        errors.push(ConfigError::InvalidLanderSize {
            width: config.lander_width,
            height: config.lander_height,
        });
    }
    if !config.ground_y.is_finite()
        || config.ground_y > config.world_height
        || config.ground_y <= config.start_y + config.lander_height
    {
        errors.push(ConfigError::GroundOutOfWorld(config.ground_y));
    }
    if !non_negative(config.safe_landing_velocity) {
        errors.push(ConfigError::NegativeSafeVelocity(
            config.safe_landing_velocity,
        ));
    }
    if !non_negative(config.strut_pre_deploy_margin)
        || !non_negative(config.strut_velocity_allowance)
    {
        errors.push(ConfigError::NegativeStrutSetting);
    }
    if !positive(config.burn_base_unit) {
        errors.push(ConfigError::InvalidBurnUnit(config.burn_base_unit));
    }
    if config.burn_stack_cap == 0 {
        errors.push(ConfigError::ZeroBurnCap);
    }
    if config.display_every_ticks == 0 {
        errors.push(ConfigError::ZeroDisplayDecimation);
    }

    errors
}
