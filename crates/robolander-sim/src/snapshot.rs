//! Read-only views published to renderers and other consumers

use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

use robolander_logic::config::SimConfig;
use robolander_logic::flight::Outcome;
use robolander_logic::physics::LanderState;
use robolander_logic::rules::{ConditionVariable, Rule};

/// Immutable copy of the lander after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub x: f64,
    /// Top-edge Y; frozen at the resting height once landed.
    pub y: f64,
    pub vertical_velocity: f64,
    /// Throttled copy of `vertical_velocity` for slow-refresh displays.
    pub display_velocity: f64,
    pub burn_force: f64,
    pub burn_stack_depth: u32,
    pub struts_deployed: bool,
    pub outcome: Outcome,
    pub landing_speed: Option<f64>,
    /// Last rule evaluation error, if the most recent tick had one.
    pub error: Option<String>,
}

impl Snapshot {
    pub(crate) fn capture(
        tick: u64,
        state: &LanderState,
        config: &SimConfig,
        display_velocity: f64,
        error: Option<String>,
    ) -> Self {
        Self {
            tick,
            x: config.start_x,
            y: state.vertical_position,
            vertical_velocity: state.vertical_velocity,
            display_velocity,
            burn_force: state.current_burn_force,
            burn_stack_depth: state.burn_stack_depth,
            struts_deployed: state.struts_deployed,
            outcome: state.outcome,
            landing_speed: state.landing_speed,
            error,
        }
    }
}

/// Altitude marker for an enabled `distanceToGround` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMarker {
    pub rule_id: String,
    /// Distance above ground the rule tests against.
    pub distance: f64,
    /// Screen Y of the marker line.
    pub y: f64,
}

/// Markers for every enabled altitude rule whose threshold is numeric.
pub fn reference_markers<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    config: &SimConfig,
) -> Vec<ReferenceMarker> {
    rules
        .into_iter()
        .filter(|r| r.enabled)
        .filter(|r| {
            ConditionVariable::parse(&r.condition_variable)
                == Some(ConditionVariable::DistanceToGround)
        })
        .filter_map(|r| {
            let distance = r.condition_value.coerce()?;
            Some(ReferenceMarker {
                rule_id: r.id.clone(),
                distance,
                y: config.ground_y - distance,
            })
        })
        .collect()
}

/// Fan-out of snapshots to subscribers; dropped receivers are pruned.
#[derive(Debug, Default)]
pub struct SnapshotBus {
    subscribers: Vec<Sender<Snapshot>>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, snapshot: &Snapshot) {
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robolander_logic::rules::{Literal, NewRule};

    #[test]
    fn test_markers_for_enabled_altitude_rules() {
        let config = SimConfig::default();
        let mut disabled = NewRule::default().into_rule("off");
        disabled.enabled = false;
        let velocity = NewRule {
            condition_variable: "verticalVelocity".into(),
            ..Default::default()
        }
        .into_rule("vel");
        let bad = NewRule {
            condition_value: Literal::from("high"),
            ..Default::default()
        }
        .into_rule("bad");
        let rules = vec![Rule::starter(), disabled, velocity, bad];

        let markers = reference_markers(&rules, &config);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rule_id, "0");
        assert!((markers[0].y - 350.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bus_prunes_dropped_subscribers() {
        let config = SimConfig::default();
        let state = LanderState::initial(&config);
        let snap = Snapshot::capture(1, &state, &config, 0.0, None);

        let mut bus = SnapshotBus::new();
        let keep = bus.subscribe();
        let dropped = bus.subscribe();
        drop(dropped);

        bus.publish(&snap);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), snap);
    }
}
