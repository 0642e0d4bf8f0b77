// SPDX-License-Identifier: MIT

//! `safe-outputs:` frontmatter section

use super::kinds::SafeOutputKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keys of the section that configure the job rather than an output kind
const GLOBAL_KEYS: [&str; 3] = ["github-token", "staged", "runs-on"];

/// Configuration of the consolidated safe output job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafeOutputsConfig {
    pub github_token: Option<String>,
    /// Preview mode: handlers report what they would do
    pub staged: bool,
    pub runs_on: Option<String>,
    pub outputs: BTreeMap<SafeOutputKind, SafeOutputTypeConfig>,
}

/// Per-kind settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeOutputTypeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    #[serde(default, skip_serializing)]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_repo: Option<String>,
}

impl SafeOutputsConfig {
    pub fn with_output(mut self, kind: SafeOutputKind, config: SafeOutputTypeConfig) -> Self {
        self.outputs.insert(kind, config);
        self
    }

    pub fn has(&self, kind: SafeOutputKind) -> bool {
        self.outputs.contains_key(&kind)
    }

    /// Configured kinds in dispatch order
    pub fn kinds(&self) -> impl Iterator<Item = SafeOutputKind> + '_ {
        self.outputs.keys().copied()
    }

    /// Effective item limit for `kind`
    pub fn max_for(&self, kind: SafeOutputKind) -> u32 {
        self.outputs
            .get(&kind)
            .and_then(|config| config.max)
            .unwrap_or_else(|| kind.default_max())
    }

    /// JSON handler configuration for `kinds`, keyed by output type, with the
    /// effective `max` filled in
    pub fn handler_config_json(
        &self,
        kinds: impl IntoIterator<Item = SafeOutputKind>,
    ) -> Result<String, serde_json::Error> {
        let mut handlers = serde_json::Map::new();
        for kind in kinds {
            let Some(config) = self.outputs.get(&kind) else {
                continue;
            };
            let mut entry = serde_json::to_value(config)?;
            if let serde_json::Value::Object(fields) = &mut entry {
                fields.insert("max".to_string(), self.max_for(kind).into());
            }
            handlers.insert(kind.output_type(), entry);
        }
        serde_json::to_string(&handlers)
    }

    /// Parse the raw section. `null` values enable a kind with defaults.
    pub fn from_yaml_value(value: &serde_yaml::Value) -> Result<Self, ConfigError> {
        let mapping = match value {
            serde_yaml::Value::Mapping(mapping) => mapping,
            serde_yaml::Value::Null => return Ok(Self::default()),
            other => {
                return Err(ConfigError::UnknownSafeOutput(format!("{:?}", other)));
            }
        };

        let mut config = SafeOutputsConfig::default();
        for (key, entry) in mapping {
            let key = key.as_str().unwrap_or_default();
            if GLOBAL_KEYS.contains(&key) {
                match key {
                    "github-token" => config.github_token = optional_string(key, entry)?,
                    "staged" => {
                        config.staged = match entry {
                            serde_yaml::Value::Null => false,
                            other => other.as_bool().ok_or(
                                ConfigError::InvalidSafeOutputSetting {
                                    key: key.to_string(),
                                    expected: "a boolean",
                                },
                            )?,
                        }
                    }
                    _ => config.runs_on = optional_string(key, entry)?,
                }
                continue;
            }

            let kind: SafeOutputKind = key
                .parse()
                .map_err(|_| ConfigError::UnknownSafeOutput(key.to_string()))?;
            let kind_config = match entry {
                serde_yaml::Value::Null => SafeOutputTypeConfig::default(),
                other => serde_yaml::from_value(other.clone()).map_err(|e| {
                    ConfigError::UnknownSafeOutput(format!("{}: {}", key, e))
                })?,
            };
            config.outputs.insert(kind, kind_config);
        }

        Ok(config)
    }
}

fn optional_string(key: &str, value: &serde_yaml::Value) -> Result<Option<String>, ConfigError> {
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s.clone())),
        _ => Err(ConfigError::InvalidSafeOutputSetting {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}
