// SPDX-License-Identifier: MIT

//! Workflow loader - markdown document loading and frontmatter parsing
//!
//! A workflow document is a YAML frontmatter block delimited by `---` lines
//! followed by the markdown prompt for the agent.

use super::types::{Frontmatter, SkipQuery, WorkflowData};
use crate::error::{CompilerError, ConfigError};
use crate::safe_outputs::SafeOutputsConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Reactions the activation job can add to the triggering item
const VALID_REACTIONS: [&str; 9] = [
    "+1", "-1", "laugh", "confused", "heart", "hooray", "rocket", "eyes", "none",
];

/// Loads workflow definitions from markdown files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow document from disk. The file stem is the name of last
    /// resort.
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowData, CompilerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut data = Self::parse_markdown(&content)?;
        if data.name.is_empty() {
            data.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("workflow")
                .to_string();
        }
        log::debug!("Loaded workflow '{}' from {}", data.name, path.display());
        Ok(data)
    }

    /// Parse a workflow document from a string
    pub fn parse_markdown(content: &str) -> Result<WorkflowData, CompilerError> {
        let (yaml, body) = split_frontmatter(content)?;
        let frontmatter: Frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        Ok(Self::build(frontmatter, body)?)
    }

    fn build(frontmatter: Frontmatter, body: &str) -> Result<WorkflowData, ConfigError> {
        let on = frontmatter
            .on
            .ok_or_else(|| ConfigError::InvalidTrigger("missing 'on' section".to_string()))?;

        let mut data = WorkflowData {
            name: frontmatter
                .name
                .or_else(|| first_heading(body))
                .unwrap_or_default(),
            description: frontmatter.description,
            roles: frontmatter.roles.unwrap_or_default(),
            permissions: frontmatter.permissions,
            if_condition: frontmatter.if_condition,
            engine: frontmatter.engine.unwrap_or_default(),
            runs_on: frontmatter.runs_on,
            timeout_minutes: frontmatter.timeout_minutes,
            concurrency: frontmatter.concurrency.as_ref().and_then(concurrency_group),
            environment: frontmatter.environment,
            github_token: frontmatter.github_token,
            strict: frontmatter.strict.unwrap_or(false),
            jobs: frontmatter.jobs,
            steps: frontmatter.steps,
            markdown: body.to_string(),
            ..WorkflowData::default()
        };

        if let Some(section) = &frontmatter.safe_outputs {
            data.safe_outputs = Some(SafeOutputsConfig::from_yaml_value(section)?);
        }

        apply_triggers(&mut data, on)?;
        Ok(data)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `---` delimited frontmatter from the markdown body
fn split_frontmatter(content: &str) -> Result<(&str, &str), ConfigError> {
    let content = content.trim_start_matches('\u{feff}');
    let rest = content
        .strip_prefix("---")
        .ok_or(ConfigError::MissingFrontmatter)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .ok_or(ConfigError::MissingFrontmatter)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Ok((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(ConfigError::MissingFrontmatter)
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find_map(|line| line.trim_start().strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn concurrency_group(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(group) => Some(group.clone()),
        serde_yaml::Value::Mapping(mapping) => mapping
            .get("group")
            .and_then(|g| g.as_str())
            .map(String::from),
        _ => None,
    }
}

/// Interpret the `on` section. Compiler keys (`stop-after`, skip queries,
/// `reaction`, `lock-for-agent`) are moved into `data`; the rest become
/// triggers.
fn apply_triggers(data: &mut WorkflowData, on: serde_yaml::Value) -> Result<(), ConfigError> {
    let mut triggers = BTreeMap::new();

    match on {
        serde_yaml::Value::String(event) => {
            triggers.insert(event, serde_yaml::Value::Null);
        }
        serde_yaml::Value::Sequence(events) => {
            for event in events {
                let name = event.as_str().ok_or_else(|| {
                    ConfigError::InvalidTrigger(format!("event names must be strings, got {:?}", event))
                })?;
                triggers.insert(name.to_string(), serde_yaml::Value::Null);
            }
        }
        serde_yaml::Value::Mapping(mapping) => {
            for (key, value) in mapping {
                let key = key
                    .as_str()
                    .ok_or_else(|| ConfigError::InvalidTrigger(format!("{:?}", key)))?
                    .to_string();
                match key.as_str() {
                    "stop-after" => {
                        let deadline = scalar_string(&value)
                            .ok_or_else(|| ConfigError::InvalidStopTime(format!("{:?}", value)))?;
                        data.stop_time = Some(deadline);
                    }
                    "skip-if-match" => data.skip_if_match = Some(skip_query(&key, value)?),
                    "skip-if-no-match" => data.skip_if_no_match = Some(skip_query(&key, value)?),
                    "reaction" => data.reaction = parse_reaction(&value)?,
                    _ => {
                        let value = take_lock_for_agent(data, &key, value);
                        triggers.insert(key, value);
                    }
                }
            }
        }
        other => {
            return Err(ConfigError::InvalidTrigger(format!("{:?}", other)));
        }
    }

    if triggers.is_empty() {
        return Err(ConfigError::InvalidTrigger("no events configured".to_string()));
    }
    data.triggers = triggers;
    Ok(())
}

fn skip_query(key: &str, value: serde_yaml::Value) -> Result<SkipQuery, ConfigError> {
    serde_yaml::from_value(value).map_err(|e| ConfigError::InvalidTrigger(format!("{}: {}", key, e)))
}

/// Strings, and numbers for reactions such as `+1` that YAML reads as integers
fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_reaction(value: &serde_yaml::Value) -> Result<Option<String>, ConfigError> {
    let reaction = match value {
        serde_yaml::Value::Number(n) if n.as_i64() == Some(1) => "+1".to_string(),
        other => scalar_string(other)
            .ok_or_else(|| ConfigError::InvalidTrigger(format!("reaction: {:?}", other)))?,
    };
    if !VALID_REACTIONS.contains(&reaction.as_str()) {
        return Err(ConfigError::InvalidTrigger(format!(
            "reaction '{}' is not one of {}",
            reaction,
            VALID_REACTIONS.join(", ")
        )));
    }
    Ok((reaction != "none").then_some(reaction))
}

/// Remove `lock-for-agent` from an issue event config and record it
fn take_lock_for_agent(
    data: &mut WorkflowData,
    event: &str,
    mut value: serde_yaml::Value,
) -> serde_yaml::Value {
    if let serde_yaml::Value::Mapping(mapping) = &mut value {
        if let Some(flag) = mapping.remove("lock-for-agent") {
            if crate::constants::LOCKABLE_EVENTS.contains(&event) {
                data.lock_for_agent |= flag.as_bool().unwrap_or(false);
            } else {
                log::warn!("Ignoring lock-for-agent on '{}'; only issue events can be locked", event);
            }
        }
        if mapping.is_empty() {
            return serde_yaml::Value::Null;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permissions;
    use crate::safe_outputs::SafeOutputKind;
    use crate::workflow::types::Roles;

    #[test]
    fn test_parse_minimal_document() {
        let doc = "---\non: issues\n---\n# Triage bot\n\nLabel new issues.\n";
        let data = WorkflowLoader::parse_markdown(doc).unwrap();
        assert_eq!(data.name, "Triage bot");
        assert!(data.has_trigger("issues"));
        assert_eq!(data.roles, Roles::Default);
        assert!(data.markdown.contains("Label new issues."));
    }

    #[test]
    fn test_parse_trigger_list() {
        let doc = "---\nname: nightly\non: [schedule, workflow_dispatch]\n---\nbody\n";
        let data = WorkflowLoader::parse_markdown(doc).unwrap();
        assert_eq!(data.name, "nightly");
        assert_eq!(
            data.trigger_names().collect::<Vec<_>>(),
            vec!["schedule", "workflow_dispatch"]
        );
    }

    #[test]
    fn test_compiler_keys_are_removed_from_triggers() {
        let doc = r#"---
on:
  issues:
    types: [opened]
    lock-for-agent: true
  schedule:
    - cron: "0 9 * * 1"
  stop-after: "+7d"
  skip-if-match: "is:issue is:open label:duplicate"
  reaction: eyes
---
Body
"#;
        let data = WorkflowLoader::parse_markdown(doc).unwrap();
        assert_eq!(data.trigger_names().collect::<Vec<_>>(), vec!["issues", "schedule"]);
        assert_eq!(data.stop_time.as_deref(), Some("+7d"));
        assert_eq!(data.reaction.as_deref(), Some("eyes"));
        assert!(data.lock_for_agent);
        assert_eq!(data.skip_if_match.as_ref().unwrap().threshold, 1);

        let issues = &data.triggers["issues"];
        assert!(issues.get("lock-for-agent").is_none());
        assert!(issues.get("types").is_some());
    }

    #[test]
    fn test_numeric_reaction() {
        let doc = "---\non:\n  issues:\n  reaction: +1\n---\n";
        let data = WorkflowLoader::parse_markdown(doc).unwrap();
        assert_eq!(data.reaction.as_deref(), Some("+1"));
    }

    #[test]
    fn test_invalid_reaction() {
        let doc = "---\non:\n  issues:\n  reaction: thumbsup\n---\n";
        let err = WorkflowLoader::parse_markdown(doc).unwrap_err();
        assert!(matches!(err, CompilerError::Config(ConfigError::InvalidTrigger(_))));
    }

    #[test]
    fn test_missing_frontmatter() {
        let err = WorkflowLoader::parse_markdown("# Just markdown\n").unwrap_err();
        assert!(matches!(err, CompilerError::Config(ConfigError::MissingFrontmatter)));

        let err = WorkflowLoader::parse_markdown("---\non: issues\n").unwrap_err();
        assert!(matches!(err, CompilerError::Config(ConfigError::MissingFrontmatter)));
    }

    #[test]
    fn test_missing_triggers() {
        let err = WorkflowLoader::parse_markdown("---\nname: x\n---\n").unwrap_err();
        assert!(matches!(err, CompilerError::Config(ConfigError::InvalidTrigger(_))));
    }

    #[test]
    fn test_permissions_and_safe_outputs() {
        let doc = r#"---
on: issues
permissions:
  contents: read
  issues: read
safe-outputs:
  add-comment:
  add-labels:
    max: 5
strict: true
concurrency:
  group: triage-${{ github.event.issue.number }}
---
"#;
        let data = WorkflowLoader::parse_markdown(doc).unwrap();
        assert!(matches!(data.permissions, Some(Permissions::Scopes(_))));
        assert!(data.strict);
        let safe_outputs = data.safe_outputs.unwrap();
        assert!(safe_outputs.has(SafeOutputKind::AddComment));
        assert_eq!(safe_outputs.max_for(SafeOutputKind::AddLabels), 5);
        assert_eq!(
            data.concurrency.as_deref(),
            Some("triage-${{ github.event.issue.number }}")
        );
    }

    #[test]
    fn test_invalid_permission_fails_load() {
        let doc = "---\non: issues\npermissions:\n  contents: admin\n---\n";
        assert!(WorkflowLoader::parse_markdown(doc).is_err());
    }

    #[test]
    fn test_load_workflow_from_file_uses_stem() {
        let dir = std::env::temp_dir().join(format!("awc-loader-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("weekly-report.md");
        fs::write(&path, "---\non: schedule\n---\nNo heading here.\n").unwrap();

        let data = WorkflowLoader::new().load_workflow(&path).unwrap();
        assert_eq!(data.name, "weekly-report");

        fs::remove_dir_all(&dir).unwrap();
    }
}
