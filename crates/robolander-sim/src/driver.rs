//! Fixed-period realtime driver.
//!
//! Ticks a [`SimulationLoop`] on a fixed schedule (`start + k × period`),
//! sleeping between ticks. A slow tick does not shift later deadlines; the
//! driver simply ticks again without sleeping until it has caught up.

use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use robolander_logic::config::SimConfig;
use robolander_logic::flight::Outcome;

use crate::engine::{SimulationLoop, TickStatus};

/// Why [`RealtimeDriver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Terminal(Outcome),
    /// The shared running flag was cleared.
    Stopped,
    TickLimit,
}

pub struct RealtimeDriver {
    period: Duration,
    running: Arc<AtomicBool>,
    max_ticks: Option<u64>,
}

impl RealtimeDriver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            period: Duration::from_millis(config.tick_period_ms),
            running: Arc::new(AtomicBool::new(true)),
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Flag shared with other threads; store `false` to stop after the current tick.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drive `sim` until it lands, crashes, is stopped, or hits the tick limit.
    ///
    /// While the loop is paused the schedule keeps running but nothing moves.
    pub fn run(&self, sim: &mut SimulationLoop) -> StopReason {
        let start = Instant::now();
        let mut scheduled: u64 = 0;

        let reason = loop {
            if !self.running.load(Ordering::SeqCst) {
                break StopReason::Stopped;
            }
            if self.max_ticks.is_some_and(|max| scheduled >= max) {
                break StopReason::TickLimit;
            }

            if let TickStatus::Terminal(outcome) = sim.tick() {
                break StopReason::Terminal(outcome);
            }
            scheduled += 1;

            if let Some(deadline) = start.checked_add(schedule_offset(self.period, scheduled)) {
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
        };

        info!(
            "Realtime driver stopped after {} ticks: {:?}",
            scheduled, reason
        );
        reason
    }
}

/// Offset of the `tick`-th deadline from the start, saturating instead of wrapping.
fn schedule_offset(period: Duration, tick: u64) -> Duration {
    u32::try_from(tick)
        .map(|k| period.saturating_mul(k))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robolander_logic::rules::RuleSet;

    fn fast_config() -> SimConfig {
        SimConfig {
            tick_period_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_schedule_offset_saturates() {
        let period = Duration::from_millis(50);
        assert_eq!(schedule_offset(period, 3), Duration::from_millis(150));
        let past_u32 = u64::from(u32::MAX) + 1;
        assert_eq!(schedule_offset(period, past_u32), Duration::MAX);
        assert!(schedule_offset(period, u64::from(u32::MAX)) > Duration::from_secs(1 << 27));
    }

    #[test]
    fn test_tick_limit() {
        let config = fast_config();
        let mut sim = SimulationLoop::new(config.clone(), RuleSet::new()).unwrap();
        let driver = RealtimeDriver::new(&config).with_max_ticks(5);
        assert_eq!(driver.run(&mut sim), StopReason::TickLimit);
        assert_eq!(sim.tick_count(), 5);
    }

    #[test]
    fn test_stops_on_terminal() {
        // Heavier gravity so the free fall ends in a few dozen ticks
        let config = SimConfig {
            gravity: 200.0,
            ..fast_config()
        };
        let mut sim = SimulationLoop::new(config.clone(), RuleSet::new()).unwrap();
        let driver = RealtimeDriver::new(&config).with_max_ticks(1_000);
        assert_eq!(driver.run(&mut sim), StopReason::Terminal(Outcome::Crashed));
    }

    #[test]
    fn test_cleared_flag_stops_immediately() {
        let config = fast_config();
        let mut sim = SimulationLoop::new(config.clone(), RuleSet::new()).unwrap();
        let driver = RealtimeDriver::new(&config);
        driver.running_flag().store(false, Ordering::SeqCst);
        assert_eq!(driver.run(&mut sim), StopReason::Stopped);
        assert_eq!(sim.tick_count(), 0);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let config = fast_config();
        let mut sim = SimulationLoop::new(config.clone(), RuleSet::new()).unwrap();
        sim.pause();
        let driver = RealtimeDriver::new(&config);
        let flag = driver.running_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(false, Ordering::SeqCst);
        });
        assert_eq!(driver.run(&mut sim), StopReason::Stopped);
        stopper.join().unwrap();
        assert_eq!(sim.tick_count(), 0);
    }
}
