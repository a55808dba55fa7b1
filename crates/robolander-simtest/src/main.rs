//! Robolander Headless Simulation Harness
//!
//! Validates the lander logic and scripted descents without any renderer.
//! Runs entirely in-process; no window, no editor UI.
//!
//! Usage:
//!   cargo run -p robolander-simtest
//!   cargo run -p robolander-simtest -- --verbose
//!   cargo run -p robolander-simtest -- --config session.json --rules rules.json
//!   cargo run -p robolander-simtest -- --rules rules.json --realtime
//!
//! Set `RUST_LOG=debug` to see per-tick engine logging.

use log::error;
use robolander_logic::burn::BurnSmoother;
use robolander_logic::compiler::{compile, CompileErrorKind, Sensors};
use robolander_logic::config::{validate_config, SimConfig};
use robolander_logic::flight::{evaluate_flight, Outcome};
use robolander_logic::physics::LanderState;
use robolander_logic::rules::{Literal, NewRule, Rule, RuleSet};
use robolander_sim::prelude::{RealtimeDriver, SimulationLoop, TickStatus};
use serde::Deserialize;

// ── Scripted descents (shared scenario data) ────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

const MAX_TICKS: u64 = 20_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    name: String,
    #[allow(dead_code)]
    description: String,
    rules: Vec<Rule>,
    expect: Outcome,
    #[serde(default)]
    expect_evaluation_error: bool,
    #[serde(default)]
    expect_compile_error: bool,
}

// ── Command line ────────────────────────────────────────────────────────

struct Options {
    verbose: bool,
    realtime: bool,
    config_path: Option<String>,
    rules_path: Option<String>,
}

fn parse_options() -> Options {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    Options {
        verbose: args.iter().any(|a| a == "--verbose"),
        realtime: args.iter().any(|a| a == "--realtime"),
        config_path: value_of("--config"),
        rules_path: value_of("--rules"),
    }
}

fn load_config(path: Option<&str>) -> Result<SimConfig, String> {
    match path {
        None => Ok(SimConfig::default()),
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p, e))?;
            serde_json::from_str(&text).map_err(|e| format!("{}: {}", p, e))
        }
    }
}

fn load_rules(path: &str) -> Result<RuleSet, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    let rules: Vec<Rule> = serde_json::from_str(&text).map_err(|e| format!("{}: {}", path, e))?;
    RuleSet::from_rules(rules).map_err(|e| format!("{}: {}", path, e))
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();
    let opts = parse_options();
    println!("=== Robolander Simulation Harness ===\n");

    let config = match load_config(opts.config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("Could not load config: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(path) = opts.rules_path.as_deref() {
        let rules = match load_rules(path) {
            Ok(r) => r,
            Err(e) => {
                error!("Could not load rules: {}", e);
                std::process::exit(2);
            }
        };
        run_session(config, rules, opts.realtime, opts.verbose);
        return;
    }

    let mut results = Vec::new();

    // 1. Session config
    results.extend(validate_session_config(&config, opts.verbose));

    // 2. Rule vocabulary & compilation
    results.extend(validate_compiler(opts.verbose));

    // 3. Free-fall integration
    results.extend(validate_free_fall(&config, opts.verbose));

    // 4. Burn stack profile
    results.extend(validate_burn_profile(opts.verbose));

    // 5. Landing boundaries
    results.extend(validate_landing_boundaries(&config, opts.verbose));

    // 6. Scripted descents
    results.extend(validate_scenarios(&config, opts.verbose));

    // 7. Reset determinism
    results.extend(validate_reset(&config, opts.verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || opts.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Single session from a rules file ────────────────────────────────────

fn run_session(config: SimConfig, rules: RuleSet, realtime: bool, verbose: bool) {
    let mut sim = match SimulationLoop::new(config, rules) {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    if let Some(e) = sim.compile_error() {
        println!("  ! rule set does not compile, flying without thrust: {}", e);
    }
    for rule in sim.rules().rules() {
        println!("  {}", rule);
    }
    for marker in sim.reference_markers() {
        println!(
            "  marker [{}] at {:.0} px above ground (y={:.0})",
            marker.rule_id, marker.distance, marker.y
        );
    }

    let snapshots = sim.subscribe();
    let every = sim.config().display_every_ticks as u64;

    if realtime {
        let driver = RealtimeDriver::new(sim.config()).with_max_ticks(MAX_TICKS);
        let reason = driver.run(&mut sim);
        println!("  driver stopped: {:?}", reason);
    } else {
        sim.run_until_terminal(MAX_TICKS);
    }

    for snap in snapshots.try_iter() {
        if verbose || snap.tick % every == 0 || snap.outcome.is_terminal() {
            println!(
                "  t={:5} y={:8.2} v={:6.3} burn={:.2} stack={:2} struts={} {}{}",
                snap.tick,
                snap.y,
                snap.display_velocity,
                snap.burn_force,
                snap.burn_stack_depth,
                snap.struts_deployed,
                snap.outcome,
                snap.error
                    .as_deref()
                    .map(|e| format!(" error: {}", e))
                    .unwrap_or_default()
            );
        }
    }

    let snap = sim.latest_snapshot();
    println!(
        "\n=== {} after {} ticks, landing speed {} ===",
        snap.outcome,
        snap.tick,
        snap.landing_speed
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "-".into())
    );
}

// ── 1. Session Config ───────────────────────────────────────────────────

fn validate_session_config(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Session Config ---");
    let mut results = Vec::new();

    let errors = validate_config(config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            "config passes validation".into()
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    // Partial JSON falls back to defaults
    let partial: Result<SimConfig, _> = serde_json::from_str(r#"{ "gravity": 9.81 }"#);
    let ok = partial
        .as_ref()
        .map(|c| (c.gravity - 9.81).abs() < 1e-12 && c.burn_stack_cap == 10)
        .unwrap_or(false);
    results.push(TestResult {
        name: "config_partial_json".into(),
        passed: ok,
        detail: format!("partial config parsed: {}", partial.is_ok()),
    });

    let broken = SimConfig {
        tick_period_ms: 0,
        burn_stack_cap: 0,
        ..config.clone()
    };
    let n = validate_config(&broken).len();
    results.push(TestResult {
        name: "config_rejects_zero_period_and_cap".into(),
        passed: n >= 2,
        detail: format!("{} errors reported", n),
    });

    if verbose {
        println!(
            "  tick={}ms gravity={} ground={} safe={} cap={}",
            config.tick_period_ms,
            config.gravity,
            config.ground_y,
            config.safe_landing_velocity,
            config.burn_stack_cap
        );
    }

    results
}

// ── 2. Compiler ─────────────────────────────────────────────────────────

fn validate_compiler(_verbose: bool) -> Vec<TestResult> {
    println!("--- Rule Compiler ---");
    let mut results = Vec::new();

    let a = NewRule {
        condition_value: Literal::Number(800.0),
        ..Default::default()
    }
    .into_rule("a");
    let b = NewRule {
        condition_value: Literal::Number(400.0),
        action_value: Literal::Number(0.0),
        ..Default::default()
    }
    .into_rule("b");
    let rules = vec![a, b];

    // Idempotence over a sweep of altitudes
    let first = compile(&rules);
    let second = compile(&rules);
    let identical = match (&first, &second) {
        (Ok(p1), Ok(p2)) => (-100..1100).step_by(5).all(|d| {
            let s = Sensors::at_distance(d as f64);
            p1.evaluate(&s) == p2.evaluate(&s)
        }),
        _ => false,
    };
    results.push(TestResult {
        name: "compile_idempotent".into(),
        passed: identical,
        detail: "two compilations agree on 240 altitudes".into(),
    });

    // Later rule overrides earlier
    let thrust = first
        .as_ref()
        .ok()
        .and_then(|p| p.evaluate(&Sensors::at_distance(100.0)).ok())
        .map(|o| o.thrust_level());
    results.push(TestResult {
        name: "compile_last_assignment_wins".into(),
        passed: thrust == Some(0.0),
        detail: format!("thrust at 100px = {:?}", thrust),
    });

    // Vocabulary errors
    let cases: [(&str, fn(&mut Rule)); 3] = [
        ("condition", |r: &mut Rule| r.condition_variable = "altitude".into()),
        ("operator", |r: &mut Rule| r.operator = "!=".into()),
        ("action", |r: &mut Rule| r.action_variable = "fuel".into()),
    ];
    for (label, mutate) in cases {
        let mut rule = Rule::starter();
        mutate(&mut rule);
        let kind = compile(&[rule]).err().map(|e| e.kind);
        let passed = matches!(
            (label, &kind),
            ("condition", Some(CompileErrorKind::UnknownConditionVariable(_)))
                | ("operator", Some(CompileErrorKind::UnknownOperator(_)))
                | ("action", Some(CompileErrorKind::UnknownActionVariable(_)))
        );
        results.push(TestResult {
            name: format!("compile_rejects_unknown_{}", label),
            passed,
            detail: format!("{:?}", kind),
        });
    }

    results
}

// ── 3. Free Fall ────────────────────────────────────────────────────────

fn validate_free_fall(config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Free Fall ---");
    let mut results = Vec::new();

    let mut sim = match SimulationLoop::new(config.clone(), RuleSet::new()) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "free_fall_setup".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let per_tick = config.gravity_per_tick();
    let mut worst: f64 = 0.0;
    let mut n = 0u64;
    while sim.tick() == TickStatus::Advanced && sim.outcome() == Outcome::Flying {
        n += 1;
        let expected = n as f64 * per_tick;
        worst = worst.max((sim.state().vertical_velocity - expected).abs());
    }
    results.push(TestResult {
        name: "free_fall_linear_velocity".into(),
        passed: worst < 1e-9,
        detail: format!("{} ticks, max drift {:.2e}", n, worst),
    });
    results.push(TestResult {
        name: "free_fall_crashes".into(),
        passed: sim.outcome() == Outcome::Crashed,
        detail: format!("outcome {}", sim.outcome()),
    });

    results
}

// ── 4. Burn Profile ─────────────────────────────────────────────────────

fn validate_burn_profile(verbose: bool) -> Vec<TestResult> {
    println!("--- Burn Stack ---");
    let mut results = Vec::new();

    let mut burn = BurnSmoother::new(0.05, 10);
    burn.request_burn();
    let first = burn.tick();
    let second = burn.tick();
    results.push(TestResult {
        name: "burn_single_request".into(),
        passed: (first - 0.05).abs() < 1e-12 && second == 0.0,
        detail: format!("forces {:.2}, {:.2}", first, second),
    });

    let mut burn = BurnSmoother::new(0.05, 10);
    let mut profile = Vec::new();
    for _ in 0..15 {
        burn.request_burn();
        profile.push(burn.tick());
    }
    let peak = burn.depth();
    let mut fade = 0;
    while burn.tick() > 0.0 {
        fade += 1;
    }
    results.push(TestResult {
        name: "burn_capped_and_fades".into(),
        passed: peak == burn.cap() && fade + 1 == peak,
        detail: format!(
            "peak depth {}/{}, {} ticks to zero",
            peak,
            burn.cap(),
            fade + 1
        ),
    });

    if verbose {
        let shown: Vec<String> = profile.iter().map(|f| format!("{:.2}", f)).collect();
        println!("  ramp: {}", shown.join(" "));
    }

    results
}

// ── 5. Landing Boundaries ───────────────────────────────────────────────

fn validate_landing_boundaries(config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Landing Boundaries ---");
    let mut results = Vec::new();

    let touching = |velocity: f64| {
        let mut state = LanderState {
            vertical_position: config.ground_y - config.lander_height,
            vertical_velocity: velocity,
            ..LanderState::initial(config)
        };
        evaluate_flight(&mut state, config);
        state
    };

    let safe = config.safe_landing_velocity;
    let at_limit = touching(safe);
    results.push(TestResult {
        name: "landing_at_safe_velocity".into(),
        passed: at_limit.outcome == Outcome::Landed && at_limit.landing_speed == Some(safe),
        detail: format!("v={} -> {}", safe, at_limit.outcome),
    });

    let over = touching(safe + 0.1);
    results.push(TestResult {
        name: "crash_above_safe_velocity".into(),
        passed: over.outcome == Outcome::Crashed,
        detail: format!("v={} -> {}", safe + 0.1, over.outcome),
    });

    results
}

// ── 6. Scenarios ────────────────────────────────────────────────────────

fn validate_scenarios(config: &SimConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Scripted Descents ---");
    let mut results = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    for scenario in scenarios {
        let name = format!("scenario_{}", scenario.name);
        let rules = match RuleSet::from_rules(scenario.rules) {
            Ok(r) => r,
            Err(e) => {
                results.push(TestResult {
                    name,
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };
        let mut sim = match SimulationLoop::new(config.clone(), rules) {
            Ok(s) => s,
            Err(e) => {
                results.push(TestResult {
                    name,
                    passed: false,
                    detail: e.to_string(),
                });
                continue;
            }
        };

        let compile_failed = sim.compile_error().is_some();
        let mut saw_eval_error = false;
        let mut struts_tick = None;
        while sim.tick() == TickStatus::Advanced && sim.tick_count() < MAX_TICKS {
            let snap = sim.latest_snapshot();
            saw_eval_error |= snap.error.is_some();
            if snap.struts_deployed && struts_tick.is_none() {
                struts_tick = Some(snap.tick);
            }
        }

        let snap = sim.latest_snapshot();
        let passed = snap.outcome == scenario.expect
            && saw_eval_error == scenario.expect_evaluation_error
            && compile_failed == scenario.expect_compile_error;
        results.push(TestResult {
            name,
            passed,
            detail: format!(
                "{} at tick {} (speed {:.3}, struts {:?}, eval error {}, compile error {})",
                snap.outcome,
                snap.tick,
                snap.landing_speed.unwrap_or(f64::NAN),
                struts_tick,
                saw_eval_error,
                compile_failed
            ),
        });

        if verbose {
            println!("  {:20} -> {}", scenario.name, snap.outcome);
        }
    }

    results
}

// ── 7. Reset ────────────────────────────────────────────────────────────

fn validate_reset(config: &SimConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Reset ---");
    let mut results = Vec::new();

    let build = || SimulationLoop::new(config.clone(), RuleSet::starter());
    let (mut fresh, mut reused) = match (build(), build()) {
        (Ok(a), Ok(b)) => (a, b),
        _ => {
            results.push(TestResult {
                name: "reset_setup".into(),
                passed: false,
                detail: "could not build sessions".into(),
            });
            return results;
        }
    };

    reused.run_until_terminal(MAX_TICKS);
    let terminal = reused.outcome();
    reused.reset();
    let state = reused.state();
    results.push(TestResult {
        name: "reset_restores_initial".into(),
        passed: terminal.is_terminal()
            && state.vertical_position == config.start_y
            && state.vertical_velocity == 0.0
            && state.outcome == Outcome::Flying,
        detail: format!("reset from {}", terminal),
    });

    let mut diverged_at = None;
    for _ in 0..MAX_TICKS {
        let a = fresh.tick();
        let b = reused.tick();
        if a != b || fresh.latest_snapshot() != reused.latest_snapshot() {
            diverged_at = Some(fresh.tick_count());
            break;
        }
        if a != TickStatus::Advanced {
            break;
        }
    }
    results.push(TestResult {
        name: "reset_replays_fresh_session".into(),
        passed: diverged_at.is_none(),
        detail: match diverged_at {
            None => format!("identical through tick {}", fresh.tick_count()),
            Some(t) => format!("diverged at tick {}", t),
        },
    });

    results
}
