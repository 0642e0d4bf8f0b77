// SPDX-License-Identifier: MIT

//! Step builder

use super::yaml::{entry, if_entry, list_item, literal_block, pad, scalar};

/// Column of the `- ` marker of a step inside `jobs.<name>.steps`
pub const STEP_INDENT: usize = 6;

/// A single job step. Rendered once and stored on the job as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub name: String,
    pub id: Option<String>,
    pub if_condition: Option<String>,
    pub uses: Option<String>,
    pub run: Option<String>,
    pub with: Vec<(String, String)>,
    pub env: Vec<(String, String)>,
    pub continue_on_error: bool,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn if_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    /// Action reference, already pinned
    pub fn uses(mut self, action: impl Into<String>) -> Self {
        self.uses = Some(action.into());
        self
    }

    pub fn run(mut self, script: impl Into<String>) -> Self {
        self.run = Some(script.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.push((key.into(), value.into()));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Render as a list item at [`STEP_INDENT`]
    pub fn render(&self) -> String {
        let key_indent = STEP_INDENT + 2;
        let mut lines = vec![format!("{}- name: {}", pad(STEP_INDENT), scalar(&self.name))];

        if let Some(id) = &self.id {
            lines.push(entry(key_indent, "id", id));
        }
        if let Some(condition) = &self.if_condition {
            lines.push(if_entry(key_indent, condition));
        }
        if self.continue_on_error {
            lines.push(format!("{}continue-on-error: true", pad(key_indent)));
        }
        if let Some(uses) = &self.uses {
            // pinned references carry a trailing `# version` comment
            lines.push(format!("{}uses: {}", pad(key_indent), uses));
        }
        if !self.with.is_empty() {
            lines.push(format!("{}with:", pad(key_indent)));
            for (key, value) in &self.with {
                lines.push(literal_block(key_indent + 2, key, value));
            }
        }
        if !self.env.is_empty() {
            lines.push(format!("{}env:", pad(key_indent)));
            for (key, value) in &self.env {
                lines.push(entry(key_indent + 2, key, value));
            }
        }
        if let Some(run) = &self.run {
            lines.push(literal_block(key_indent, "run", run));
        }

        lines.join("\n")
    }

    /// Render a user supplied step given as raw YAML
    pub fn render_raw(value: &serde_yaml::Value) -> String {
        list_item(STEP_INDENT, value)
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.render()
    }
}
