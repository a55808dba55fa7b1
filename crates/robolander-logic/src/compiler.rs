//! Rule compiler — turns an ordered rule list into an executable program.
//!
//! Compilation resolves every name against the closed vocabulary in
//! [`rules`](crate::rules) and produces a flat list of clauses. Nothing is
//! evaluated at compile time; literals stay as written and are coerced when
//! the program runs.
//!
//! Evaluation walks the clauses in rule order. Each clause whose condition
//! holds assigns its action variable, so when several rules write the same
//! variable the last matching one wins.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::SimConfig;
use crate::physics::LanderState;
use crate::rules::{ActionVariable, ConditionVariable, Literal, Operator, Rule};

/// Why a rule could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    UnknownConditionVariable(String),
    UnknownOperator(String),
    UnknownActionVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub rule_id: String,
    pub kind: CompileErrorKind,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompileErrorKind::UnknownConditionVariable(name) => write!(
                f,
                "rule '{}': unknown condition variable '{}'",
                self.rule_id, name
            ),
            CompileErrorKind::UnknownOperator(op) => {
                write!(f, "rule '{}': unknown operator '{}'", self.rule_id, op)
            }
            CompileErrorKind::UnknownActionVariable(name) => write!(
                f,
                "rule '{}': unknown action variable '{}'",
                self.rule_id, name
            ),
        }
    }
}

impl std::error::Error for CompileError {}

/// Failure while running a compiled program.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// A condition or action literal did not coerce to a finite number.
    NonNumericLiteral { rule_id: String, text: String },
    /// A sensor reading was NaN or infinite.
    NonFiniteSensor { variable: ConditionVariable, value: f64 },
}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::NonNumericLiteral { rule_id, text } => {
                write!(f, "rule '{}': '{}' is not a number", rule_id, text)
            }
            EvaluationError::NonFiniteSensor { variable, value } => {
                write!(f, "sensor {} reads {}", variable.name(), value)
            }
        }
    }
}

impl std::error::Error for EvaluationError {}

/// Sensor values a compiled program reads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sensors {
    pub distance_to_ground: f64,
    pub vertical_velocity: f64,
}

impl Sensors {
    pub fn from_state(state: &LanderState, config: &SimConfig) -> Self {
        Self {
            distance_to_ground: state.distance_to_ground(config),
            vertical_velocity: state.vertical_velocity,
        }
    }

    /// Sensors with only the altitude set.
    pub fn at_distance(distance_to_ground: f64) -> Self {
        Self {
            distance_to_ground,
            ..Default::default()
        }
    }

    pub fn read(&self, variable: ConditionVariable) -> f64 {
        match variable {
            ConditionVariable::DistanceToGround => self.distance_to_ground,
            ConditionVariable::VerticalVelocity => self.vertical_velocity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    rule_id: String,
    variable: ConditionVariable,
    operator: Operator,
    threshold: Literal,
    action: ActionVariable,
    value: Literal,
}

/// Executable decision procedure built by [`compile`].
///
/// The default program has no clauses and always yields thrust 0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledProgram {
    clauses: Vec<Clause>,
    outputs: Vec<ActionVariable>,
}

/// Values assigned by one program run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgramOutput {
    values: BTreeMap<ActionVariable, Option<f64>>,
}

impl ProgramOutput {
    /// Last value written to `variable`, or `None` if no clause assigned it.
    pub fn get(&self, variable: ActionVariable) -> Option<f64> {
        self.values.get(&variable).copied().flatten()
    }

    /// Action variables the program declares, assigned or not.
    pub fn variables(&self) -> impl Iterator<Item = ActionVariable> + '_ {
        self.values.keys().copied()
    }

    pub fn thrust_level(&self) -> f64 {
        self.get(ActionVariable::ThrustLevel).unwrap_or(0.0)
    }
}

/// Compile the enabled rules, in order, into a program.
///
/// Disabled rules are skipped without being checked. The first enabled rule
/// naming something outside the vocabulary aborts compilation.
pub fn compile(rules: &[Rule]) -> Result<CompiledProgram, CompileError> {
    let mut clauses = Vec::new();
    let mut outputs: Vec<ActionVariable> = Vec::new();

    for rule in rules.iter().filter(|r| r.enabled) {
        let clause = compile_rule(rule)?;
        if !outputs.contains(&clause.action) {
            outputs.push(clause.action);
        }
        clauses.push(clause);
    }

    Ok(CompiledProgram { clauses, outputs })
}

fn compile_rule(rule: &Rule) -> Result<Clause, CompileError> {
    let fail = |kind| CompileError {
        rule_id: rule.id.clone(),
        kind,
    };

    let variable = ConditionVariable::parse(&rule.condition_variable).ok_or_else(|| {
        fail(CompileErrorKind::UnknownConditionVariable(
            rule.condition_variable.clone(),
        ))
    })?;
    let operator = Operator::parse(&rule.operator)
        .ok_or_else(|| fail(CompileErrorKind::UnknownOperator(rule.operator.clone())))?;
    let action = ActionVariable::parse(&rule.action_variable).ok_or_else(|| {
        fail(CompileErrorKind::UnknownActionVariable(
            rule.action_variable.clone(),
        ))
    })?;

    Ok(Clause {
        rule_id: rule.id.clone(),
        variable,
        operator,
        threshold: rule.condition_value.clone(),
        action,
        value: rule.action_value.clone(),
    })
}

fn coerce(literal: &Literal, rule_id: &str) -> Result<f64, EvaluationError> {
    literal
        .coerce()
        .ok_or_else(|| EvaluationError::NonNumericLiteral {
            rule_id: rule_id.to_string(),
            text: literal.to_string(),
        })
}

impl CompiledProgram {
    /// Number of compiled clauses (one per enabled rule).
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Run the program against one set of sensor readings.
    ///
    /// Any failure aborts the whole run; callers treat that as thrust 0.
    pub fn evaluate(&self, sensors: &Sensors) -> Result<ProgramOutput, EvaluationError> {
        let mut values: BTreeMap<ActionVariable, Option<f64>> =
            self.outputs.iter().map(|v| (*v, None)).collect();

        for clause in &self.clauses {
            let reading = sensors.read(clause.variable);
            if !reading.is_finite() {
                return Err(EvaluationError::NonFiniteSensor {
                    variable: clause.variable,
                    value: reading,
                });
            }
            let threshold = coerce(&clause.threshold, &clause.rule_id)?;
            if clause.operator.holds(reading, threshold) {
                let value = coerce(&clause.value, &clause.rule_id)?;
                values.insert(clause.action, Some(value));
            }
        }

        Ok(ProgramOutput { values })
    }
}
