//! Simulation loop - main entry point for running a descent

use log::{debug, info, warn};
use rand::Rng;
use std::sync::mpsc::Receiver;

use robolander_logic::burn::BurnSmoother;
use robolander_logic::compiler::{compile, CompileError, CompiledProgram, Sensors};
use robolander_logic::config::{validate_config, SimConfig};
use robolander_logic::flight::{evaluate_flight, Outcome};
use robolander_logic::physics::{step, LanderState};
use robolander_logic::rules::{NewRule, Rule, RulePatch, RuleSet};

use crate::error::SimError;
use crate::snapshot::{reference_markers, ReferenceMarker, Snapshot, SnapshotBus};

/// What a call to [`SimulationLoop::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// All pipeline stages ran and a snapshot was published.
    Advanced,
    Paused,
    /// The lander has landed or crashed; nothing moves until reset.
    Terminal(Outcome),
}

/// Owns every piece of mutable session state and runs the per-tick pipeline.
///
/// Ticks are strictly sequential: each one reads the rules, updates the
/// burn stack, integrates, classifies, then publishes a snapshot before
/// returning. Rule edits go through `&mut self` as well, so a tick always
/// sees either the old or the new compiled program.
pub struct SimulationLoop {
    config: SimConfig,
    rules: RuleSet,
    rules_revision: u64,
    /// Last program that compiled; `None` means thrust 0.
    program: Option<CompiledProgram>,
    compile_error: Option<CompileError>,
    burn: BurnSmoother,
    state: LanderState,
    tick_count: u64,
    display_velocity: f64,
    eval_error: Option<String>,
    paused: bool,
    latest: Snapshot,
    bus: SnapshotBus,
}

impl SimulationLoop {
    /// Start a session. Fails only on an invalid config; a rule set that
    /// does not compile leaves the loop running with zero thrust.
    pub fn new(config: SimConfig, rules: RuleSet) -> Result<Self, SimError> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }

        let state = LanderState::initial(&config);
        let latest = Snapshot::capture(0, &state, &config, 0.0, None);
        let mut sim = Self {
            burn: BurnSmoother::new(config.burn_base_unit, config.burn_stack_cap),
            config,
            rules,
            rules_revision: 0,
            program: None,
            compile_error: None,
            state,
            tick_count: 0,
            display_velocity: 0.0,
            eval_error: None,
            paused: false,
            latest,
            bus: SnapshotBus::new(),
        };
        // A bad starting rule set is reported through compile_error()
        let _ = sim.recompile();
        Ok(sim)
    }

    /// Default config with the single starter rule.
    pub fn with_defaults() -> Result<Self, SimError> {
        Self::new(SimConfig::default(), RuleSet::starter())
    }

    // ── Tick pipeline ───────────────────────────────────────────────────

    /// Run one tick.
    pub fn tick(&mut self) -> TickStatus {
        if self.paused {
            return TickStatus::Paused;
        }
        if self.state.is_terminal() {
            return TickStatus::Terminal(self.state.outcome);
        }

        // 1. Rules decide the thrust level
        let thrust_level = self.evaluate_rules();
        if thrust_level > 0.0 {
            self.burn.request_burn();
        }

        // 2. Burn stack turns requests into force
        let force = self.burn.tick();

        // 3. Integrate
        step(&mut self.state, force, &self.config);
        self.state.burn_stack_depth = self.burn.depth();

        // 4. Classify
        let eval = evaluate_flight(&mut self.state, &self.config);
        self.tick_count += 1;

        if eval.struts_just_deployed {
            debug!(
                "Struts deployed at tick {} (velocity {:.3})",
                self.tick_count, self.state.vertical_velocity
            );
        }
        if let Some(outcome) = eval.transition {
            info!(
                "Lander {} at tick {} with speed {:.3}",
                outcome,
                self.tick_count,
                self.state.vertical_velocity
            );
        }

        if self.tick_count % self.config.display_every_ticks as u64 == 0 {
            self.display_velocity = self.state.vertical_velocity;
            debug!("Display velocity {:.3}", self.display_velocity);
        }

        // 5. Publish
        self.publish();
        TickStatus::Advanced
    }

    fn evaluate_rules(&mut self) -> f64 {
        let Some(program) = &self.program else {
            self.eval_error = None;
            return 0.0;
        };
        let sensors = Sensors::from_state(&self.state, &self.config);
        match program.evaluate(&sensors) {
            Ok(output) => {
                self.eval_error = None;
                output.thrust_level()
            }
            Err(e) => {
                warn!("Rule evaluation failed at tick {}: {}", self.tick_count + 1, e);
                self.eval_error = Some(e.to_string());
                0.0
            }
        }
    }

    fn publish(&mut self) {
        self.latest = Snapshot::capture(
            self.tick_count,
            &self.state,
            &self.config,
            self.display_velocity,
            self.eval_error.clone(),
        );
        self.bus.publish(&self.latest);
    }

    /// Tick `n` times, stopping early on pause or a terminal outcome.
    /// Returns the number of ticks that advanced.
    pub fn run_ticks(&mut self, n: u64) -> u64 {
        let mut advanced = 0;
        for _ in 0..n {
            if self.tick() != TickStatus::Advanced {
                break;
            }
            advanced += 1;
        }
        advanced
    }

    /// Tick until the lander lands or crashes, or `max_ticks` pass.
    pub fn run_until_terminal(&mut self, max_ticks: u64) -> Option<Outcome> {
        self.run_ticks(max_ticks);
        self.state.outcome.is_terminal().then_some(self.state.outcome)
    }

    // ── Operator input ──────────────────────────────────────────────────

    /// Manual burn, applied on the next tick.
    pub fn request_burn(&mut self) {
        self.burn.request_burn();
    }

    /// Manually drop one level from the burn stack.
    pub fn kill_burn(&mut self) {
        self.burn.kill_burn();
        self.state.burn_stack_depth = self.burn.depth();
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Return the lander to its starting state. Rules are kept.
    pub fn reset(&mut self) {
        self.state = LanderState::initial(&self.config);
        self.burn.reset();
        self.tick_count = 0;
        self.display_velocity = 0.0;
        self.eval_error = None;
        info!("Simulation reset");
        self.publish();
    }

    // ── Rule editing ────────────────────────────────────────────────────

    /// Add a rule with a fresh random id and return the id.
    ///
    /// The rule is kept even if the set then fails to compile; that failure
    /// is reported through [`compile_error`](Self::compile_error) so the
    /// caller always learns the new id.
    pub fn add_rule(&mut self, defaults: NewRule) -> Result<String, SimError> {
        let id = self.fresh_rule_id();
        self.rules.insert(defaults.into_rule(id.clone()))?;
        // Failure is recorded in compile_error()
        let _ = self.rules_changed();
        Ok(id)
    }

    pub fn remove_rule(&mut self, id: &str) -> Result<Rule, SimError> {
        let removed = self.rules.remove(id)?;
        self.rules_changed()?;
        Ok(removed)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), SimError> {
        if self.rules.set_enabled(id, enabled)? {
            self.rules_changed()?;
        }
        Ok(())
    }

    pub fn update_rule(&mut self, id: &str, patch: RulePatch) -> Result<(), SimError> {
        self.rules.update(id, patch)?;
        self.rules_changed()
    }

    /// Swap in a whole new rule set.
    pub fn replace_rules(&mut self, rules: RuleSet) -> Result<(), SimError> {
        self.rules = rules;
        self.rules_changed()
    }

    fn rules_changed(&mut self) -> Result<(), SimError> {
        self.rules_revision += 1;
        self.recompile().map_err(SimError::from)
    }

    /// Compile the current set; on failure the previous program stays active.
    fn recompile(&mut self) -> Result<(), CompileError> {
        match compile(self.rules.rules()) {
            Ok(program) => {
                info!(
                    "Compiled {} of {} rules (revision {})",
                    program.len(),
                    self.rules.len(),
                    self.rules_revision
                );
                self.program = Some(program);
                self.compile_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous rule program: {}", e);
                self.compile_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn fresh_rule_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id = format!("{:x}", rng.gen::<u64>());
            if !self.rules.contains(&id) {
                return id;
            }
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &LanderState {
        &self.state
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Bumped on every rule edit; renderers redraw markers when it changes.
    pub fn rules_revision(&self) -> u64 {
        self.rules_revision
    }

    pub fn reference_markers(&self) -> Vec<ReferenceMarker> {
        reference_markers(self.rules.rules(), &self.config)
    }

    /// Whether a compiled program is active.
    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    /// Error from the most recent compile, if it failed.
    pub fn compile_error(&self) -> Option<&CompileError> {
        self.compile_error.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn outcome(&self) -> Outcome {
        self.state.outcome
    }

    pub fn latest_snapshot(&self) -> &Snapshot {
        &self.latest
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robolander_logic::rules::Literal;

    fn free_fall() -> SimulationLoop {
        SimulationLoop::new(SimConfig::default(), RuleSet::new()).unwrap()
    }

    #[test]
    fn test_loop_creation() {
        let sim = SimulationLoop::with_defaults().unwrap();
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.outcome(), Outcome::Flying);
        assert!(sim.has_program());
        assert_eq!(sim.latest_snapshot().tick, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimConfig {
            tick_period_ms: 0,
            ..Default::default()
        };
        let err = SimulationLoop::new(config, RuleSet::new()).err().unwrap();
        assert!(matches!(err, SimError::InvalidConfig(ref e) if e.len() == 1));
    }

    #[test]
    fn test_free_fall_ends_in_crash() {
        let mut sim = free_fall();
        assert_eq!(sim.run_until_terminal(10_000), Some(Outcome::Crashed));
        assert_eq!(sim.tick(), TickStatus::Terminal(Outcome::Crashed));
    }

    #[test]
    fn test_terminal_tick_does_not_publish() {
        let mut sim = free_fall();
        sim.run_until_terminal(10_000);
        let ticks = sim.tick_count();
        let rx = sim.subscribe();
        sim.tick();
        assert_eq!(sim.tick_count(), ticks);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut sim = free_fall();
        sim.pause();
        assert_eq!(sim.tick(), TickStatus::Paused);
        assert_eq!(sim.tick_count(), 0);
        sim.resume();
        assert_eq!(sim.tick(), TickStatus::Advanced);
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn test_display_velocity_is_decimated() {
        let mut sim = free_fall();
        sim.run_ticks(9);
        assert_eq!(sim.latest_snapshot().display_velocity, 0.0);
        sim.run_ticks(1);
        let snap = sim.latest_snapshot();
        assert_eq!(snap.display_velocity, snap.vertical_velocity);
        sim.run_ticks(3);
        let snap = sim.latest_snapshot();
        assert!(snap.display_velocity < snap.vertical_velocity);
    }

    #[test]
    fn test_manual_burn() {
        let mut sim = free_fall();
        sim.request_burn();
        sim.tick();
        let snap = sim.latest_snapshot();
        assert_eq!(snap.burn_stack_depth, 1);
        assert!((snap.burn_force - 0.05).abs() < 1e-12);
        sim.tick();
        assert_eq!(sim.latest_snapshot().burn_force, 0.0);
    }

    #[test]
    fn test_kill_burn() {
        let mut sim = free_fall();
        for _ in 0..3 {
            sim.request_burn();
            sim.tick();
        }
        sim.kill_burn();
        assert_eq!(sim.state().burn_stack_depth, 2);
    }

    #[test]
    fn test_add_rule_generates_unique_ids() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        let a = sim.add_rule(NewRule::default()).unwrap();
        let b = sim.add_rule(NewRule::default()).unwrap();
        assert_ne!(a, b);
        assert_eq!(sim.rules().len(), 3);
        assert_eq!(sim.rules_revision(), 2);
    }

    #[test]
    fn test_add_rule_returns_id_while_sibling_is_broken() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        sim.update_rule(
            "0",
            RulePatch {
                operator: Some("<=".into()),
                ..Default::default()
            },
        )
        .unwrap_err();

        let id = sim.add_rule(NewRule::default()).unwrap();
        assert!(sim.rules().contains(&id));
        assert_eq!(sim.compile_error().unwrap().rule_id, "0");

        // The editor can still address the rule it just created
        sim.set_enabled(&id, false).unwrap_err();
        assert!(!sim.rules().get(&id).unwrap().enabled);
        sim.remove_rule(&id).unwrap_err();
        assert!(!sim.rules().contains(&id));
    }

    #[test]
    fn test_add_rule_reports_own_compile_error() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        let id = sim
            .add_rule(NewRule {
                action_variable: "warp".into(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(sim.compile_error().unwrap().rule_id, id);
        assert!(sim.has_program());
    }

    #[test]
    fn test_unknown_rule_edit_rejected() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        let err = sim.set_enabled("missing", false).unwrap_err();
        assert!(matches!(err, SimError::Rules(_)));
        assert_eq!(sim.rules_revision(), 0);
    }

    #[test]
    fn test_compile_error_keeps_previous_program() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        let err = sim
            .update_rule(
                "0",
                RulePatch {
                    operator: Some("<=".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, SimError::Compile(_)));
        assert!(sim.has_program());
        assert!(sim.compile_error().is_some());
        // Edit is kept so the editor can fix it
        assert_eq!(sim.rules().get("0").unwrap().operator, "<=");

        sim.update_rule(
            "0",
            RulePatch {
                operator: Some(">".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(sim.compile_error().is_none());
    }

    #[test]
    fn test_bad_initial_rules_mean_zero_thrust() {
        let mut rule = Rule::starter();
        rule.action_variable = "warp".into();
        let rules = RuleSet::from_rules(vec![rule]).unwrap();
        let mut sim = SimulationLoop::new(SimConfig::default(), rules).unwrap();
        assert!(!sim.has_program());
        assert!(sim.compile_error().is_some());
        assert_eq!(sim.run_until_terminal(10_000), Some(Outcome::Crashed));
    }

    #[test]
    fn test_evaluation_error_is_contained() {
        let rules = RuleSet::from_rules(vec![NewRule {
            condition_value: Literal::from("low"),
            ..Default::default()
        }
        .into_rule("bad")])
        .unwrap();
        let mut sim = SimulationLoop::new(SimConfig::default(), rules).unwrap();
        assert_eq!(sim.tick(), TickStatus::Advanced);
        let snap = sim.latest_snapshot();
        assert!(snap.error.as_deref().unwrap_or("").contains("not a number"));
        assert_eq!(snap.burn_force, 0.0);

        // Fixing the rule clears the error on the next tick
        sim.update_rule(
            "bad",
            RulePatch {
                condition_value: Some(Literal::from("1000")),
                ..Default::default()
            },
        )
        .unwrap();
        sim.tick();
        assert!(sim.latest_snapshot().error.is_none());
        assert!(sim.latest_snapshot().burn_force > 0.0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut sim = free_fall();
        sim.run_until_terminal(10_000);
        sim.reset();
        let state = sim.state();
        assert_eq!(state.vertical_position, 0.0);
        assert_eq!(state.vertical_velocity, 0.0);
        assert_eq!(state.outcome, Outcome::Flying);
        assert!(!state.struts_deployed);
        assert_eq!(state.landing_speed, None);
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.tick(), TickStatus::Advanced);
    }

    #[test]
    fn test_reference_markers_follow_edits() {
        let mut sim = SimulationLoop::with_defaults().unwrap();
        assert_eq!(sim.reference_markers().len(), 1);
        sim.set_enabled("0", false).unwrap();
        assert!(sim.reference_markers().is_empty());
    }
}
