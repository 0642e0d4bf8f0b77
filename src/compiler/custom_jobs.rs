// SPDX-License-Identifier: MIT

//! User defined jobs from the `jobs:` frontmatter section

use crate::constants::{ACTIVATION_JOB, RESERVED_JOB_NAMES};
use crate::error::ConfigError;
use crate::expression::unwrap_expression_template;
use crate::jobs::Job;
use crate::permissions::Permissions;
use crate::workflow::WorkflowData;
use serde::Deserialize;

/// Dependencies of a custom job: one job name or a list
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(untagged)]
pub enum Needs {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl Needs {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Needs::None => vec![],
            Needs::Single(s) => vec![s.clone()],
            Needs::Multiple(v) => v.clone(),
        }
    }
}

/// A custom job before conversion
#[derive(Debug, Clone)]
pub struct CustomJob {
    pub name: String,
    pub needs: Vec<String>,
    definition: serde_yaml::Mapping,
}

/// Validate and collect the custom jobs of a workflow, sorted by name
pub fn parse_custom_jobs(data: &WorkflowData) -> Result<Vec<CustomJob>, ConfigError> {
    data.jobs
        .iter()
        .map(|(name, value)| CustomJob::parse(name, value))
        .collect()
}

impl CustomJob {
    fn parse(name: &str, value: &serde_yaml::Value) -> Result<Self, ConfigError> {
        if RESERVED_JOB_NAMES.contains(&name) {
            return Err(ConfigError::ReservedJobName(name.to_string()));
        }
        let definition = value
            .as_mapping()
            .cloned()
            .ok_or_else(|| ConfigError::custom_job(name, "job definition must be a mapping"))?;

        let needs = match definition.get("needs") {
            Some(raw) => serde_yaml::from_value::<Needs>(raw.clone())
                .map_err(|_| ConfigError::custom_job(name, "needs must be a job name or a list of job names"))?
                .to_vec(),
            None => Vec::new(),
        };

        if !definition.contains_key("steps") && !definition.contains_key("uses") {
            return Err(ConfigError::custom_job(name, "job must define steps or uses"));
        }

        Ok(Self {
            name: name.to_string(),
            needs,
            definition,
        })
    }

    pub fn depends_on(&self, job: &str) -> bool {
        self.needs.iter().any(|need| need == job)
    }

    /// Convert into a pipeline job. Jobs without dependencies run after the
    /// activation job when there is one.
    pub fn into_job(self, default_runner: &str, activation_exists: bool) -> Result<Job, ConfigError> {
        let name = self.name;
        let reusable = self.definition.contains_key("uses");
        let mut job = Job::new(name.as_str(), if reusable { "" } else { default_runner });

        job.needs = self.needs;
        if job.needs.is_empty() && activation_exists {
            job.needs.push(ACTIVATION_JOB.to_string());
        }

        for (key, value) in self.definition {
            let Some(key) = key.as_str().map(String::from) else {
                continue;
            };
            match (key.as_str(), &value) {
                ("needs", _) => {}
                ("runs-on", serde_yaml::Value::String(runner)) => job.runs_on = runner.clone(),
                ("if", serde_yaml::Value::String(condition)) => {
                    job.if_condition = Some(unwrap_expression_template(condition).to_string());
                }
                ("name", serde_yaml::Value::String(display)) => {
                    job.display_name = Some(display.clone());
                }
                ("environment", serde_yaml::Value::String(environment)) => {
                    job.environment = Some(environment.clone());
                }
                ("concurrency", serde_yaml::Value::String(group)) => {
                    job.concurrency = Some(group.clone());
                }
                ("timeout-minutes", serde_yaml::Value::Number(n)) => {
                    job.timeout_minutes = n
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| ConfigError::custom_job(&name, "invalid timeout-minutes"))
                        .map(Some)?;
                }
                ("permissions", raw) => {
                    job.permissions = Some(Permissions::from_yaml_value(raw)?);
                }
                ("steps", serde_yaml::Value::Sequence(steps)) => {
                    for step in steps {
                        job.push_raw_step(step);
                    }
                }
                ("steps", _) => {
                    return Err(ConfigError::custom_job(&name, "steps must be a list"));
                }
                ("outputs", serde_yaml::Value::Mapping(outputs)) => {
                    job.outputs = string_map(&name, "outputs", outputs)?;
                }
                ("env", serde_yaml::Value::Mapping(env)) => {
                    job.env = string_map(&name, "env", env)?;
                }
                ("runs-on", _) => {
                    // label lists and runner groups are passed through
                    job.runs_on.clear();
                    job.extra.insert(key.clone(), value.clone());
                }
                _ => {
                    job.extra.insert(key.clone(), value.clone());
                }
            }
        }

        log::debug!("Custom job '{}' needs {:?}", job.name, job.needs);
        Ok(job)
    }
}

fn string_map(
    job: &str,
    section: &str,
    mapping: &serde_yaml::Mapping,
) -> Result<std::collections::BTreeMap<String, String>, ConfigError> {
    mapping
        .iter()
        .map(|(key, value)| {
            let key = key.as_str();
            let value = match value {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            match (key, value) {
                (Some(key), Some(value)) => Ok((key.to_string(), value)),
                _ => Err(ConfigError::custom_job(
                    job,
                    format!("{} entries must be scalar values", section),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{PermissionLevel, PermissionScope};

    fn data_with_job(name: &str, yaml: &str) -> WorkflowData {
        let mut data = WorkflowData::new("custom").with_trigger("issues");
        data.jobs
            .insert(name.to_string(), serde_yaml::from_str(yaml).unwrap());
        data
    }

    #[test]
    fn test_needs_forms() {
        let single: Needs = serde_yaml::from_str("build").unwrap();
        assert_eq!(single.to_vec(), vec!["build"]);
        let many: Needs = serde_yaml::from_str("[a, b]").unwrap();
        assert_eq!(many.to_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let data = data_with_job("agent", "steps:\n  - run: echo");
        let err = parse_custom_jobs(&data).unwrap_err();
        assert!(matches!(err, ConfigError::ReservedJobName(ref n) if n == "agent"));
    }

    #[test]
    fn test_job_without_steps_rejected() {
        let data = data_with_job("lint", "runs-on: ubuntu-latest");
        assert!(matches!(
            parse_custom_jobs(&data),
            Err(ConfigError::InvalidCustomJob { .. })
        ));
    }

    #[test]
    fn test_default_dependency_on_activation() {
        let data = data_with_job("fetch", "steps:\n  - run: ./fetch.sh");
        let custom = parse_custom_jobs(&data).unwrap().remove(0);
        let job = custom.clone().into_job("ubuntu-latest", true).unwrap();
        assert_eq!(job.needs, vec!["activation"]);
        assert_eq!(job.runs_on, "ubuntu-latest");

        let job = custom.into_job("ubuntu-latest", false).unwrap();
        assert!(job.needs.is_empty());
    }

    #[test]
    fn test_full_conversion() {
        let data = data_with_job(
            "fetch",
            r#"
needs: pre_activation
runs-on: macos-latest
if: ${{ github.event_name == 'issues' }}
permissions:
  contents: read
timeout-minutes: 5
strategy:
  matrix:
    shard: [1, 2]
outputs:
  report: ${{ steps.fetch.outputs.report }}
env:
  RETRIES: 3
steps:
  - id: fetch
    run: ./fetch.sh
"#,
        );
        let custom = parse_custom_jobs(&data).unwrap().remove(0);
        assert!(custom.depends_on("pre_activation"));

        let job = custom.into_job("ubuntu-latest", true).unwrap();
        assert_eq!(job.needs, vec!["pre_activation"]);
        assert_eq!(job.runs_on, "macos-latest");
        assert_eq!(job.if_condition.as_deref(), Some("github.event_name == 'issues'"));
        assert_eq!(job.timeout_minutes, Some(5));
        assert_eq!(
            job.permissions.unwrap().get(PermissionScope::Contents),
            Some(PermissionLevel::Read)
        );
        assert_eq!(job.env["RETRIES"], "3");
        assert!(job.extra.contains_key("strategy"));
        assert_eq!(job.steps.len(), 1);
        assert!(job.steps[0].starts_with("      - id: fetch"));
    }

    #[test]
    fn test_reusable_workflow_has_no_runner() {
        let data = data_with_job("deploy", "uses: ./.github/workflows/deploy.yml\nneeds: [fetch]");
        let custom = parse_custom_jobs(&data).unwrap().remove(0);
        let job = custom.into_job("ubuntu-latest", true).unwrap();
        assert!(job.runs_on.is_empty());
        assert!(job.extra.contains_key("uses"));
        assert!(!job.render().contains("runs-on"));
    }
}
