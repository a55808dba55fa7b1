//! Burn stack — ramps discrete thrust requests into a multi-tick force.
//!
//! Every request raises the stack by one level (up to the cap). A tick with
//! a fresh request holds the raised level; a tick without one first drops a
//! level. The force for the tick is `base_unit × depth` after that update,
//! so a stack of depth `d` that stops receiving requests fades to zero in
//! exactly `d` ticks.

/// Stateful burn accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnSmoother {
    base_unit: f64,
    cap: u32,
    depth: u32,
    pending: bool,
    last_force: f64,
}

impl BurnSmoother {
    pub fn new(base_unit: f64, cap: u32) -> Self {
        Self {
            base_unit,
            cap,
            depth: 0,
            pending: false,
            last_force: 0.0,
        }
    }

    /// Queue a burn for the next tick. Repeated calls within a tick count once.
    pub fn request_burn(&mut self) {
        self.pending = true;
    }

    /// Drop one level from the stack immediately.
    pub fn kill_burn(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Advance one tick and return the force it applies.
    pub fn tick(&mut self) -> f64 {
        if self.pending {
            self.depth = (self.depth + 1).min(self.cap);
            self.pending = false;
        } else {
            self.depth = self.depth.saturating_sub(1);
        }
        self.last_force = self.base_unit * self.depth as f64;
        self.last_force
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Force produced by the most recent tick.
    pub fn last_force(&self) -> f64 {
        self.last_force
    }

    pub fn has_pending_request(&self) -> bool {
        self.pending
    }

    pub fn reset(&mut self) {
        self.depth = 0;
        self.pending = false;
        self.last_force = 0.0;
    }
}
