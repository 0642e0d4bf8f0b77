// SPDX-License-Identifier: MIT

//! Typed error handling for the workflow compiler
//!
//! Parse and configuration errors always abort compilation. Degraded
//! action-pin resolution is not an error; it is logged by the resolver.

use thiserror::Error;

/// Top-level error type for a compilation pass
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Malformed boolean expression in a condition
    #[error("Expression parse error: {0}")]
    Parse(#[from] ParseError),

    /// Invalid or unresolvable workflow configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Job graph violates a structural invariant
    #[error("Job graph error: {0}")]
    Graph(#[from] JobGraphError),

    /// Action could not be pinned to a commit SHA in strict mode
    #[error("Unable to pin action {repo}@{version} to a commit SHA")]
    UnpinnedAction { repo: String, version: String },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while parsing a boolean expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input is empty or only whitespace
    #[error("empty expression")]
    Empty,

    /// A `(` was never closed
    #[error("missing closing parenthesis for '(' at position {position}")]
    MissingClosingParen { position: usize },

    /// A `)` has no matching `(`
    #[error("unexpected ')' at position {position}")]
    UnexpectedClosingParen { position: usize },

    /// An operator is missing its left or right operand
    #[error("operator '{operator}' at position {position} is missing an operand")]
    MissingOperand { operator: String, position: usize },

    /// A quoted string was never terminated
    #[error("unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },

    /// Token that does not fit the grammar at this point
    #[error("unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
}

/// Configuration errors found in the workflow frontmatter
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document has no `---` delimited frontmatter block
    #[error("workflow document has no frontmatter block")]
    MissingFrontmatter,

    /// The `on` section could not be interpreted
    #[error("invalid trigger configuration: {0}")]
    InvalidTrigger(String),

    /// Unknown key below `safe-outputs`
    #[error("unknown safe output type '{0}'")]
    UnknownSafeOutput(String),

    /// A global `safe-outputs` setting has the wrong type
    #[error("invalid safe-outputs setting '{key}': expected {expected}")]
    InvalidSafeOutputSetting { key: String, expected: &'static str },

    /// Invalid entry in a permissions block
    #[error("invalid permission '{scope}: {level}'")]
    InvalidPermission { scope: String, level: String },

    /// Custom job uses the name of a generated control job
    #[error("custom job name '{0}' is reserved")]
    ReservedJobName(String),

    /// Custom job definition is not usable
    #[error("invalid custom job '{name}': {reason}")]
    InvalidCustomJob { name: String, reason: String },

    /// `stop-after` value could not be resolved
    #[error("invalid stop-after value '{0}'")]
    InvalidStopTime(String),

    /// Project outputs need an explicit token in strict mode
    #[error("safe output '{0}' requires an explicit github-token in strict mode")]
    MissingProjectToken(String),

    /// Strict mode forbids write grants on the agent job
    #[error("strict mode does not allow '{0}: write' on the agent job; use safe-outputs instead")]
    WritePermissionInStrictMode(String),
}

/// Structural errors in the compiled job graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobGraphError {
    /// Two jobs share a name
    #[error("job '{0}' is defined more than once")]
    DuplicateJob(String),

    /// A job needs a job that does not exist
    #[error("job '{job}' needs unknown job '{dependency}'")]
    UnknownDependency { job: String, dependency: String },

    /// Dependencies form a cycle
    #[error("dependency cycle detected involving job '{0}'")]
    CycleDetected(String),

    /// A job references `needs.X` without listing X as a direct dependency
    #[error("job '{job}' references outputs of '{referenced}' but does not list it in needs")]
    MissingDirectDependency { job: String, referenced: String },
}

impl CompilerError {
    /// Create an unpinned-action error
    pub fn unpinned(repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self::UnpinnedAction {
            repo: repo.into(),
            version: version.into(),
        }
    }
}

impl ConfigError {
    /// Create an invalid custom job error
    pub fn custom_job(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCustomJob {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl ParseError {
    /// Character offset the error points at
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Empty => None,
            ParseError::MissingClosingParen { position }
            | ParseError::UnexpectedClosingParen { position }
            | ParseError::MissingOperand { position, .. }
            | ParseError::UnterminatedString { position }
            | ParseError::UnexpectedToken { position, .. } => Some(*position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_converts_into_compiler_error() {
        let err: CompilerError = ParseError::Empty.into();
        assert_eq!(err.to_string(), "Expression parse error: empty expression");
    }

    #[test]
    fn test_parse_error_position() {
        assert_eq!(ParseError::Empty.position(), None);
        assert_eq!(
            ParseError::UnexpectedClosingParen { position: 3 }.position(),
            Some(3)
        );
    }

    #[test]
    fn test_unpinned_message() {
        let err = CompilerError::unpinned("actions/checkout", "v9");
        assert!(err.to_string().contains("actions/checkout@v9"));
    }
}
