//! Steering rule records and the closed vocabulary they may use.
//!
//! Rules arrive from the rule editor as text: the variable and operator
//! names are plain strings so that an editor (or a JSON file) can send
//! anything. The [`compiler`](crate::compiler) is the single place that
//! maps those names onto [`ConditionVariable`], [`Operator`] and
//! [`ActionVariable`]; anything outside the vocabulary is a compile error.
//!
//! A rule reads as `if <conditionVariable> <operator> <conditionValue>
//! then <actionVariable> = <actionValue>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor readings a rule condition may test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionVariable {
    /// `groundY - (y + landerHeight)`, in pixels.
    DistanceToGround,
    /// Downward speed in pixels per tick (negative while ascending).
    VerticalVelocity,
}

impl ConditionVariable {
    pub fn all() -> &'static [ConditionVariable] {
        &[Self::DistanceToGround, Self::VerticalVelocity]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DistanceToGround => "distanceToGround",
            Self::VerticalVelocity => "verticalVelocity",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.name() == name.trim())
    }
}

/// Comparison operators available to rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Less,
    Equal,
    Greater,
}

impl Operator {
    pub fn all() -> &'static [Operator] {
        &[Self::Less, Self::Equal, Self::Greater]
    }

    /// Canonical symbol used when rules are displayed.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::Equal => "=",
            Self::Greater => ">",
        }
    }

    /// Equality also accepts the `==` and `===` spellings editors emit.
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "<" => Some(Self::Less),
            "=" | "==" | "===" => Some(Self::Equal),
            ">" => Some(Self::Greater),
            _ => None,
        }
    }

    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::Equal => lhs == rhs,
            Self::Greater => lhs > rhs,
        }
    }
}

/// Outputs a rule may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionVariable {
    /// Positive values request a burn this tick.
    ThrustLevel,
}

impl ActionVariable {
    pub fn all() -> &'static [ActionVariable] {
        &[Self::ThrustLevel]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ThrustLevel => "thrustLevel",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.name() == name.trim())
    }
}

/// A rule operand: either already numeric or raw editor text.
///
/// Text is only coerced when the compiled program runs, so a malformed
/// number compiles fine and fails at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    /// Coerce to a finite number. Blank text reads as zero.
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            Literal::Number(n) => *n,
            Literal::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    0.0
                } else {
                    s.parse::<f64>().ok()?
                }
            }
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.to_string())
    }
}

/// One condition-action record as produced by the rule editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub condition_variable: String,
    pub operator: String,
    pub condition_value: Literal,
    pub action_variable: String,
    pub action_value: Literal,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Rule {
    /// `distanceToGround < 600 → thrustLevel = 1`, the rule every session starts with.
    pub fn starter() -> Self {
        NewRule {
            condition_value: Literal::from("600"),
            ..NewRule::default()
        }
        .into_rule("0")
    }

    /// Overwrite the fields the patch carries.
    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(v) = patch.condition_variable {
            self.condition_variable = v;
        }
        if let Some(op) = patch.operator {
            self.operator = op;
        }
        if let Some(v) = patch.condition_value {
            self.condition_value = v;
        }
        if let Some(v) = patch.action_variable {
            self.action_variable = v;
        }
        if let Some(v) = patch.action_value {
            self.action_value = v;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] if {} {} {} then {} = {}{}",
            self.id,
            self.condition_variable,
            self.operator,
            self.condition_value,
            self.action_variable,
            self.action_value,
            if self.enabled { "" } else { " (disabled)" }
        )
    }
}

/// Field values for a rule that has no id yet.
///
/// The default is what the editor's "add rule" button creates:
/// `distanceToGround < 1000 → thrustLevel = 1`, enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRule {
    pub condition_variable: String,
    pub operator: String,
    pub condition_value: Literal,
    pub action_variable: String,
    pub action_value: Literal,
    pub enabled: bool,
}

impl Default for NewRule {
    fn default() -> Self {
        Self {
            condition_variable: ConditionVariable::DistanceToGround.name().to_string(),
            operator: Operator::Less.symbol().to_string(),
            condition_value: Literal::from("1000"),
            action_variable: ActionVariable::ThrustLevel.name().to_string(),
            action_value: Literal::from("1"),
            enabled: true,
        }
    }
}

impl NewRule {
    pub fn into_rule(self, id: impl Into<String>) -> Rule {
        Rule {
            id: id.into(),
            condition_variable: self.condition_variable,
            operator: self.operator,
            condition_value: self.condition_value,
            action_variable: self.action_variable,
            action_value: self.action_value,
            enabled: self.enabled,
        }
    }
}

/// Partial update from the editor; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulePatch {
    pub condition_variable: Option<String>,
    pub operator: Option<String>,
    pub condition_value: Option<Literal>,
    pub action_variable: Option<String>,
    pub action_value: Option<Literal>,
    pub enabled: Option<bool>,
}

/// Rule set editing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSetError {
    UnknownRule(String),
    DuplicateId(String),
}

impl fmt::Display for RuleSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSetError::UnknownRule(id) => write!(f, "no rule with id '{}'", id),
            RuleSetError::DuplicateId(id) => write!(f, "rule id '{}' is already in use", id),
        }
    }
}

impl std::error::Error for RuleSetError {}

/// Ordered rule list with unique ids. Order is evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only [`Rule::starter`].
    pub fn starter() -> Self {
        Self {
            rules: vec![Rule::starter()],
        }
    }

    /// Build a set from records, rejecting the first repeated id.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut set = Self::new();
        for rule in rules {
            set.insert(rule)?;
        }
        Ok(set)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Append a rule at the end of the evaluation order.
    pub fn insert(&mut self, rule: Rule) -> Result<(), RuleSetError> {
        if self.contains(&rule.id) {
            return Err(RuleSetError::DuplicateId(rule.id));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Rule, RuleSetError> {
        let idx = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| RuleSetError::UnknownRule(id.to_string()))?;
        Ok(self.rules.remove(idx))
    }

    /// Returns whether the flag actually changed.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool, RuleSetError> {
        let rule = self.get_mut(id)?;
        let changed = rule.enabled != enabled;
        rule.enabled = enabled;
        Ok(changed)
    }

    pub fn update(&mut self, id: &str, patch: RulePatch) -> Result<(), RuleSetError> {
        self.get_mut(id)?.apply(patch);
        Ok(())
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Rule, RuleSetError> {
        self.rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleSetError::UnknownRule(id.to_string()))
    }
}
