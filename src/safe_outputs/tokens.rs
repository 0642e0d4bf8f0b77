// SPDX-License-Identifier: MIT

//! Token selection for safe output handlers

use super::config::SafeOutputsConfig;
use super::kinds::SafeOutputKind;
use crate::constants::{DEFAULT_PROJECT_TOKEN, DEFAULT_SAFE_OUTPUTS_TOKEN};
use crate::error::ConfigError;

/// Token of the shared handler manager:
/// `safe-outputs.github-token`, then the workflow `github-token`, then the
/// default secret chain
pub fn standard_token(config: &SafeOutputsConfig, workflow_token: Option<&str>) -> String {
    config
        .github_token
        .as_deref()
        .or(workflow_token)
        .unwrap_or(DEFAULT_SAFE_OUTPUTS_TOKEN)
        .to_string()
}

/// Token for a single kind: its own `github-token`, then the standard chain
pub fn kind_token(
    config: &SafeOutputsConfig,
    kind: SafeOutputKind,
    workflow_token: Option<&str>,
) -> String {
    config
        .outputs
        .get(&kind)
        .and_then(|c| c.github_token.clone())
        .unwrap_or_else(|| standard_token(config, workflow_token))
}

/// Token of the privileged project handler. The default token lacks project
/// scopes, so the first explicit project-kind token wins and strict mode
/// refuses to fall back to the project secret.
pub fn project_token(config: &SafeOutputsConfig, strict: bool) -> Result<String, ConfigError> {
    let mut project_kinds = config.kinds().filter(|kind| kind.is_project()).peekable();
    let first = project_kinds.peek().copied();

    if let Some(token) = project_kinds
        .filter_map(|kind| config.outputs.get(&kind))
        .find_map(|c| c.github_token.clone())
    {
        return Ok(token);
    }

    match first {
        Some(kind) if strict => Err(ConfigError::MissingProjectToken(kind.config_key().to_string())),
        _ => Ok(DEFAULT_PROJECT_TOKEN.to_string()),
    }
}
