// SPDX-License-Identifier: MIT

//! Job definition and rendering

use super::step::Step;
use super::yaml::{entry, if_entry, pad, value_entry};
use crate::expression::template_expressions;
use crate::permissions::Permissions;
use std::collections::BTreeMap;

const KEY_INDENT: usize = 4;

/// A job of the compiled pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    pub name: String,
    pub display_name: Option<String>,
    pub runs_on: String,
    /// Rendered condition without the `${{ }}` wrapper
    pub if_condition: Option<String>,
    pub permissions: Option<Permissions>,
    pub needs: Vec<String>,
    /// Rendered steps
    pub steps: Vec<String>,
    /// Bare `if:` conditions of the steps, kept for reference checks
    pub step_conditions: Vec<String>,
    pub outputs: BTreeMap<String, String>,
    pub concurrency: Option<String>,
    pub environment: Option<String>,
    pub timeout_minutes: Option<u32>,
    pub env: BTreeMap<String, String>,
    /// Keys of user jobs this compiler does not interpret (`strategy`,
    /// `services`, ...), emitted verbatim
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Job {
    pub fn new(name: impl Into<String>, runs_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs_on: runs_on.into(),
            ..Self::default()
        }
    }

    pub fn needs(mut self, job: impl Into<String>) -> Self {
        let job = job.into();
        if !self.needs.contains(&job) {
            self.needs.push(job);
        }
        self
    }

    pub fn if_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step.render());
        self.step_conditions.extend(step.if_condition);
        self
    }

    /// Append a user step given as raw YAML
    pub fn push_raw_step(&mut self, value: &serde_yaml::Value) {
        self.steps.push(Step::render_raw(value));
        if let Some(condition) = value.get("if").and_then(serde_yaml::Value::as_str) {
            self.step_conditions.push(condition.to_string());
        }
    }

    pub fn output(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(name.into(), value.into());
        self
    }

    /// Every expression of the job the runner evaluates: the job and step
    /// conditions, and the `${{ }}` templates of steps, outputs, env and
    /// concurrency
    pub fn expression_sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self
            .if_condition
            .iter()
            .chain(&self.step_conditions)
            .map(String::as_str)
            .collect();
        let texts = self
            .steps
            .iter()
            .chain(self.outputs.values())
            .chain(self.env.values())
            .chain(&self.concurrency);
        for text in texts {
            sources.extend(template_expressions(text));
        }
        sources
    }

    /// Render below `jobs:` with the job key at two spaces
    pub fn render(&self) -> String {
        let mut lines = vec![format!("  {}:", self.name)];

        if let Some(display_name) = &self.display_name {
            lines.push(entry(KEY_INDENT, "name", display_name));
        }
        match self.needs.as_slice() {
            [] => {}
            [single] => lines.push(entry(KEY_INDENT, "needs", single)),
            many => {
                lines.push(format!("{}needs:", pad(KEY_INDENT)));
                for need in many {
                    lines.push(format!("{}- {}", pad(KEY_INDENT + 2), need));
                }
            }
        }
        if let Some(condition) = &self.if_condition {
            lines.push(if_entry(KEY_INDENT, condition));
        }
        // reusable workflow calls have no runner
        if !self.runs_on.is_empty() {
            lines.push(entry(KEY_INDENT, "runs-on", &self.runs_on));
        }
        if let Some(environment) = &self.environment {
            lines.push(entry(KEY_INDENT, "environment", environment));
        }
        if let Some(permissions) = &self.permissions {
            for line in permissions.render_to_yaml().lines() {
                lines.push(format!("{}{}", pad(KEY_INDENT), line));
            }
        }
        if let Some(group) = &self.concurrency {
            lines.push(format!("{}concurrency:", pad(KEY_INDENT)));
            lines.push(entry(KEY_INDENT + 2, "group", group));
        }
        if let Some(timeout) = self.timeout_minutes {
            lines.push(format!("{}timeout-minutes: {}", pad(KEY_INDENT), timeout));
        }
        for (key, value) in &self.extra {
            lines.push(value_entry(KEY_INDENT, key, value));
        }
        if !self.env.is_empty() {
            lines.push(format!("{}env:", pad(KEY_INDENT)));
            for (key, value) in &self.env {
                lines.push(entry(KEY_INDENT + 2, key, value));
            }
        }
        if !self.outputs.is_empty() {
            lines.push(format!("{}outputs:", pad(KEY_INDENT)));
            for (key, value) in &self.outputs {
                lines.push(entry(KEY_INDENT + 2, key, value));
            }
        }
        if !self.steps.is_empty() {
            lines.push(format!("{}steps:", pad(KEY_INDENT)));
            lines.extend(self.steps.iter().cloned());
        }

        lines.join("\n")
    }
}
