//! Error types for aura-core
//!
//! Only construction problems leave the engine as errors. Dispatch faults,
//! verification failures and escalations are carried as data or state.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The graph has nothing to execute
    #[error("assembly '{0}' has no steps to execute")]
    EmptyStepOrder(String),

    /// The graph failed load-time validation
    #[error("assembly graph error: {0}")]
    Graph(#[from] aura_assembly::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Execution could not be launched
    #[error("execution error: {0}")]
    Execution(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::EmptyStepOrder(id) => {
                format!("📋 Assembly '{}' has no steps to execute.", id)
            }
            Error::Graph(e) => format!("🧩 Assembly graph is invalid: {}", e),
            Error::Configuration(msg) => format!("⚙️ Configuration error: {}", msg),
            Error::Execution(msg) => format!("⚡ Execution failed: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::EmptyStepOrder(_) => {
                Some("💡 Re-run the sequence planner so that stepOrder is populated.".to_string())
            }
            Error::Graph(_) => Some(
                "💡 Check that stepOrder lists every step id exactly once and that each successCriteria type is known."
                    .to_string(),
            ),
            Error::Configuration(_) => {
                Some("💡 Check config/default.toml or the AURA_* environment variables.".to_string())
            }
            Error::Execution(_) => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = String::new();

    output.push_str(&error.user_message());
    output.push_str("\n\n");

    if let Some(suggestion) = error.suggestion() {
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_step_order_message() {
        let error = Error::EmptyStepOrder("gearbox".to_string());

        assert_eq!(error.to_string(), "assembly 'gearbox' has no steps to execute");
        assert!(error.user_message().contains("gearbox"));
        assert!(error.suggestion().unwrap().contains("stepOrder"));
    }

    #[test]
    fn test_graph_error_wraps_source() {
        let error: Error = aura_assembly::Error::UnknownStep("ghost".to_string()).into();

        assert!(error.to_string().contains("ghost"));
        assert!(matches!(error, Error::Graph(_)));
    }

    #[test]
    fn test_format_for_cli() {
        let error = Error::Configuration("control_rate_hz must be positive".to_string());
        let output = format_error_for_cli(&error);

        assert!(output.contains("control_rate_hz"));
        assert!(output.contains("AURA_"));
    }

    #[test]
    fn test_execution_has_no_suggestion() {
        let error = Error::Execution("already running".to_string());
        assert!(error.suggestion().is_none());
    }
}
