//! Default constants for a lunar descent session.
//!
//! Distances are screen pixels, velocities are pixels per tick. With
//! `PX_PER_METRE = 1.0` a pixel reads as a metre.

/// Fixed tick period in milliseconds.
pub const TICK_PERIOD_MS: u64 = 50;

/// Gravitational acceleration in m/s² (Moon).
pub const GRAVITY: f64 = 1.625;

/// Pixel-per-metre scale applied to gravity.
pub const PX_PER_METRE: f64 = 1.0;

pub mod world {
    pub const WIDTH: f64 = 2000.0;
    pub const HEIGHT: f64 = 1000.0;
    /// Y coordinate of the ground surface (y grows downward).
    pub const GROUND_Y: f64 = 950.0;
}

pub mod lander {
    pub const WIDTH: f64 = 30.0;
    pub const HEIGHT: f64 = 50.0;
    pub const START_X: f64 = 500.0;
    pub const START_Y: f64 = 0.0;
}

pub mod landing {
    /// Highest downward velocity that still counts as a safe touch-down.
    pub const SAFE_VELOCITY: f64 = 2.0;
    /// Extra velocity tolerated when deciding to extend the struts.
    pub const STRUT_VELOCITY_ALLOWANCE: f64 = 1.0;
    /// Struts extend once the lander bottom is within this many pixels of the ground.
    pub const STRUT_PRE_DEPLOY_MARGIN: f64 = 50.0;
}

pub mod burn {
    /// Deceleration contributed by each level of the burn stack.
    pub const BASE_UNIT: f64 = 0.05;
    pub const STACK_CAP: u32 = 10;
}

/// Publish the throttled display velocity every this many ticks.
pub const DISPLAY_EVERY_TICKS: u32 = 10;
