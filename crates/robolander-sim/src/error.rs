//! Engine-level errors

use robolander_logic::compiler::CompileError;
use robolander_logic::config::ConfigError;
use robolander_logic::rules::RuleSetError;

/// Errors returned by [`SimulationLoop`](crate::engine::SimulationLoop) operations
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// The session config failed validation; every problem is listed.
    InvalidConfig(Vec<ConfigError>),
    /// The rule edit was rejected and nothing changed.
    Rules(RuleSetError),
    /// The edit was applied but the new rule set does not compile;
    /// the previous program stays active.
    Compile(CompileError),
}

impl From<RuleSetError> for SimError {
    fn from(e: RuleSetError) -> Self {
        SimError::Rules(e)
    }
}

impl From<CompileError> for SimError {
    fn from(e: CompileError) -> Self {
        SimError::Compile(e)
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidConfig(errors) => {
                write!(f, "invalid config: ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
            SimError::Rules(e) => write!(f, "rule edit rejected: {}", e),
            SimError::Compile(e) => write!(f, "rule set does not compile: {}", e),
        }
    }
}

impl std::error::Error for SimError {}
