// SPDX-License-Identifier: MIT

//! Agent engines
//!
//! An engine contributes the steps that actually run the agent. Engine
//! specific installation is out of scope; [`CommandEngine`] runs a configured
//! command against the generated prompt.

use crate::constants::{PROMPT_PATH, SAFE_OUTPUTS_FILE};
use crate::jobs::Step;
use crate::workflow::{EngineConfig, WorkflowData};

/// Produces the execution steps of the agent job
pub trait AgentEngine {
    fn id(&self) -> &str;

    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step>;
}

/// Engine that runs a single shell command
#[derive(Debug, Clone)]
pub struct CommandEngine {
    config: EngineConfig,
}

impl CommandEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Configured command, or the engine id invoked with the prompt text
    fn command(&self) -> String {
        match &self.config.command {
            Some(command) => command.clone(),
            None => format!("{} \"$(cat \"$GH_AW_PROMPT\")\"", self.config.id),
        }
    }
}

impl AgentEngine for CommandEngine {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn execution_steps(&self, data: &WorkflowData) -> Vec<Step> {
        let mut step = Step::new(format!("Execute {} agent", self.config.id))
            .id("agentic_execution")
            .env("GH_AW_PROMPT", PROMPT_PATH);
        if data.has_safe_outputs() {
            step = step.env("GH_AW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE);
        }
        for (key, value) in &self.config.env {
            step = step.env(key.as_str(), value.as_str());
        }
        vec![step.run(self.command())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_command_reads_prompt() {
        let engine = CommandEngine::new(EngineConfig::default());
        let steps = engine.execution_steps(&WorkflowData::new("demo"));
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].run.as_deref(),
            Some("copilot \"$(cat \"$GH_AW_PROMPT\")\"")
        );
        assert!(!steps[0].env.iter().any(|(k, _)| k == "GH_AW_SAFE_OUTPUTS"));
    }

    #[test]
    fn test_configured_command_and_env() {
        let engine = CommandEngine::new(EngineConfig {
            id: "custom".to_string(),
            command: Some("./agent --prompt-file \"$GH_AW_PROMPT\"".to_string()),
            env: BTreeMap::from([("MODE".to_string(), "review".to_string())]),
        });
        assert_eq!(engine.id(), "custom");
        let rendered = engine.execution_steps(&WorkflowData::new("demo"))[0].render();
        assert!(rendered.contains("- name: Execute custom agent"));
        assert!(rendered.contains("MODE: review"));
    }
}
