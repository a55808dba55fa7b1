//! Property tests for the pure descent pipeline.
//!
//! Exercises: rules → compile → evaluate → burn stack → physics step
//! → flight outcome, without any engine or timer.

use proptest::prelude::*;
use robolander_logic::burn::BurnSmoother;
use robolander_logic::compiler::{compile, Sensors};
use robolander_logic::config::SimConfig;
use robolander_logic::flight::{evaluate_flight, Outcome};
use robolander_logic::physics::{step, LanderState};
use robolander_logic::rules::{Literal, NewRule, Rule};

// ── Helpers ────────────────────────────────────────────────────────────

fn thrust_rule(id: &str, op: &str, threshold: f64, thrust: f64) -> Rule {
    NewRule {
        operator: op.into(),
        condition_value: Literal::Number(threshold),
        action_value: Literal::Number(thrust),
        ..Default::default()
    }
    .into_rule(id)
}

/// Run ticks the way the engine does and return the final state.
fn descend(rules: &[Rule], config: &SimConfig, max_ticks: u32) -> (LanderState, u32) {
    let program = compile(rules).expect("rules compile");
    let mut burn = BurnSmoother::new(config.burn_base_unit, config.burn_stack_cap);
    let mut state = LanderState::initial(config);
    let mut ticks = 0;
    while ticks < max_ticks && !state.is_terminal() {
        let sensors = Sensors::from_state(&state, config);
        let thrust = program
            .evaluate(&sensors)
            .map(|o| o.thrust_level())
            .unwrap_or(0.0);
        if thrust > 0.0 {
            burn.request_burn();
        }
        let force = burn.tick();
        step(&mut state, force, config);
        evaluate_flight(&mut state, config);
        ticks += 1;
    }
    (state, ticks)
}

// ── Scenario tests ─────────────────────────────────────────────────────

#[test]
fn free_fall_crashes() {
    let config = SimConfig::default();
    let (state, ticks) = descend(&[], &config, 10_000);
    assert_eq!(state.outcome, Outcome::Crashed);
    assert!(state.landing_speed.unwrap_or(0.0) > config.safe_landing_velocity);
    assert!(ticks > 100);
}

#[test]
fn hover_rule_prevents_impact() {
    // Thrust whenever falling faster than 1 px/tick: the stack settles
    // around the gravity balance and the lander drifts down gently.
    let config = SimConfig::default();
    let rule = NewRule {
        condition_variable: "verticalVelocity".into(),
        operator: ">".into(),
        condition_value: Literal::Number(1.0),
        ..Default::default()
    }
    .into_rule("hover");
    let (state, _) = descend(&[rule], &config, 20_000);
    assert_eq!(state.outcome, Outcome::Landed);
    assert!(state.struts_deployed);
    assert!((state.vertical_position - config.resting_y()).abs() < f64::EPSILON);
}

#[test]
fn struts_deploy_before_landing_tick() {
    let config = SimConfig::default();
    let rule = NewRule {
        condition_variable: "verticalVelocity".into(),
        operator: ">".into(),
        condition_value: Literal::Number(1.0),
        ..Default::default()
    }
    .into_rule("hover");
    let program = compile(&[rule]).unwrap();
    let mut burn = BurnSmoother::new(config.burn_base_unit, config.burn_stack_cap);
    let mut state = LanderState::initial(&config);
    let mut struts_tick = None;
    let mut landed_tick = None;
    for tick in 0..20_000u32 {
        if program
            .evaluate(&Sensors::from_state(&state, &config))
            .unwrap()
            .thrust_level()
            > 0.0
        {
            burn.request_burn();
        }
        step(&mut state, burn.tick(), &config);
        let eval = evaluate_flight(&mut state, &config);
        if eval.struts_just_deployed {
            struts_tick = Some(tick);
        }
        if eval.transition.is_some() {
            landed_tick = Some(tick);
            break;
        }
    }
    let (s, l) = (struts_tick.unwrap(), landed_tick.unwrap());
    assert!(s < l, "struts at {} should precede landing at {}", s, l);
}

#[test]
fn later_rule_overrides_earlier() {
    let rules = vec![
        thrust_rule("a", "<", 800.0, 1.0),
        thrust_rule("b", "<", 400.0, 0.0),
    ];
    let program = compile(&rules).unwrap();
    // Both conditions hold, b wins
    let out = program.evaluate(&Sensors::at_distance(100.0)).unwrap();
    assert_eq!(out.thrust_level(), 0.0);
    // Swapping the order flips the winner
    let swapped = compile(&[rules[1].clone(), rules[0].clone()]).unwrap();
    let out = swapped.evaluate(&Sensors::at_distance(100.0)).unwrap();
    assert_eq!(out.thrust_level(), 1.0);
}

// ── Properties ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn gravity_only_velocity_is_linear(n in 0u32..400) {
        let config = SimConfig::default();
        let mut state = LanderState::initial(&config);
        let mut burn = BurnSmoother::new(config.burn_base_unit, config.burn_stack_cap);
        for _ in 0..n {
            step(&mut state, burn.tick(), &config);
        }
        let expected = n as f64 * config.gravity * config.px_per_metre * config.tick_seconds();
        prop_assert!((state.vertical_velocity - expected).abs() < 1e-9);
    }

    #[test]
    fn compile_is_idempotent(
        thresholds in prop::collection::vec(0.0f64..1000.0, 0..6),
        distance in -100.0f64..1100.0,
    ) {
        let rules: Vec<Rule> = thresholds
            .iter()
            .enumerate()
            .map(|(i, t)| thrust_rule(&i.to_string(), if i % 2 == 0 { "<" } else { ">" }, *t, (i % 3) as f64))
            .collect();
        let first = compile(&rules).unwrap();
        let second = compile(&rules).unwrap();
        let sensors = Sensors::at_distance(distance);
        prop_assert_eq!(first.evaluate(&sensors), second.evaluate(&sensors));
    }

    #[test]
    fn burn_stack_stays_within_cap(requests in prop::collection::vec(any::<bool>(), 0..200)) {
        let mut burn = BurnSmoother::new(0.05, 10);
        for request in requests {
            if request {
                burn.request_burn();
            }
            let force = burn.tick();
            prop_assert!(burn.depth() <= 10);
            prop_assert!((force - 0.05 * burn.depth() as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn released_stack_fades_in_depth_ticks(pushes in 1u32..15) {
        let mut burn = BurnSmoother::new(0.05, 10);
        for _ in 0..pushes {
            burn.request_burn();
            burn.tick();
        }
        let depth = burn.depth();
        prop_assert_eq!(depth, pushes.min(10));
        for remaining in (0..depth).rev() {
            burn.tick();
            prop_assert_eq!(burn.depth(), remaining);
        }
        prop_assert_eq!(burn.last_force(), 0.0);
    }
}
