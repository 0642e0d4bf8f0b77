// SPDX-License-Identifier: MIT

//! Frontmatter schema types for workflow documents
//!
//! `Frontmatter` mirrors the YAML block verbatim. The loader turns it into a
//! `WorkflowData`, which is the read-only input of the compiler.

use crate::constants::DEFAULT_ROLES;
use crate::permissions::Permissions;
use crate::safe_outputs::SafeOutputsConfig;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Raw frontmatter block as written by the user
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Frontmatter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub on: Option<serde_yaml::Value>,
    #[serde(default)]
    pub roles: Option<Roles>,
    pub permissions: Option<Permissions>,
    #[serde(rename = "if")]
    pub if_condition: Option<String>,
    pub runs_on: Option<String>,
    pub timeout_minutes: Option<u32>,
    pub concurrency: Option<serde_yaml::Value>,
    pub environment: Option<String>,
    pub github_token: Option<String>,
    pub strict: Option<bool>,
    pub engine: Option<EngineConfig>,
    pub safe_outputs: Option<serde_yaml::Value>,
    #[serde(default)]
    pub jobs: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub steps: Vec<serde_yaml::Value>,
}

/// Parsed workflow configuration
#[derive(Debug, Clone, Default)]
pub struct WorkflowData {
    pub name: String,
    pub description: Option<String>,
    /// Event name to its raw configuration, with compiler keys removed
    pub triggers: BTreeMap<String, serde_yaml::Value>,
    pub roles: Roles,
    pub permissions: Option<Permissions>,
    /// User supplied top-level condition, possibly wrapped in `${{ }}`
    pub if_condition: Option<String>,
    pub stop_time: Option<String>,
    pub skip_if_match: Option<SkipQuery>,
    pub skip_if_no_match: Option<SkipQuery>,
    pub reaction: Option<String>,
    pub lock_for_agent: bool,
    pub safe_outputs: Option<SafeOutputsConfig>,
    /// Custom jobs as raw YAML mappings
    pub jobs: BTreeMap<String, serde_yaml::Value>,
    /// Custom steps for the agent job
    pub steps: Vec<serde_yaml::Value>,
    pub engine: EngineConfig,
    pub runs_on: Option<String>,
    pub timeout_minutes: Option<u32>,
    pub concurrency: Option<String>,
    pub environment: Option<String>,
    pub github_token: Option<String>,
    pub strict: bool,
    /// Markdown body below the frontmatter
    pub markdown: String,
}

impl WorkflowData {
    /// Minimal workflow with a name and no triggers
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style trigger registration with an empty event config
    pub fn with_trigger(mut self, event: impl Into<String>) -> Self {
        self.triggers.insert(event.into(), serde_yaml::Value::Null);
        self
    }

    pub fn has_trigger(&self, event: &str) -> bool {
        self.triggers.contains_key(event)
    }

    pub fn trigger_names(&self) -> impl Iterator<Item = &str> {
        self.triggers.keys().map(|k| k.as_str())
    }

    pub fn has_safe_outputs(&self) -> bool {
        self.safe_outputs
            .as_ref()
            .map(|config| !config.outputs.is_empty())
            .unwrap_or(false)
    }
}

/// Role allow-list for the membership pre-check
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Roles {
    /// `[admin, maintainer, write]`
    #[default]
    Default,
    /// Anyone may trigger the workflow
    All,
    Custom(Vec<String>),
}

impl Roles {
    pub fn members(&self) -> Vec<String> {
        match self {
            Roles::Default => DEFAULT_ROLES.iter().map(|r| r.to_string()).collect(),
            Roles::All => vec!["all".to_string()],
            Roles::Custom(roles) => roles.clone(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Roles::All)
    }

    /// True when the workflow relies on the built-in role list and that list
    /// grants access to `write` collaborators
    pub fn default_includes_write(&self) -> bool {
        matches!(self, Roles::Default) && DEFAULT_ROLES.contains(&"write")
    }
}

impl<'de> Deserialize<'de> for Roles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRoles {
            One(String),
            Many(Vec<String>),
        }

        let roles = match RawRoles::deserialize(deserializer)? {
            RawRoles::One(role) => vec![role],
            RawRoles::Many(roles) => roles,
        };
        if roles.iter().any(|r| r == "all") {
            Ok(Roles::All)
        } else {
            Ok(Roles::Custom(roles))
        }
    }
}

/// Search query that gates activation on its match count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipQuery {
    pub query: String,
    /// `max` for skip-if-match, `min` for skip-if-no-match
    pub threshold: u32,
}

impl<'de> Deserialize<'de> for SkipQuery {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawQuery {
            Query(String),
            Full {
                query: String,
                #[serde(alias = "min")]
                max: Option<u32>,
            },
        }

        Ok(match RawQuery::deserialize(deserializer)? {
            RawQuery::Query(query) => SkipQuery {
                query,
                threshold: 1,
            },
            RawQuery::Full { query, max } => SkipQuery {
                query,
                threshold: max.unwrap_or(1),
            },
        })
    }
}

/// AI engine selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub id: String,
    pub command: Option<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id: "copilot".to_string(),
            command: None,
            env: BTreeMap::new(),
        }
    }
}

impl<'de> Deserialize<'de> for EngineConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawEngine {
            Id(String),
            Full {
                id: String,
                command: Option<String>,
                #[serde(default)]
                env: BTreeMap<String, String>,
            },
        }

        Ok(match RawEngine::deserialize(deserializer)? {
            RawEngine::Id(id) => EngineConfig {
                id,
                ..EngineConfig::default()
            },
            RawEngine::Full { id, command, env } => EngineConfig { id, command, env },
        })
    }
}
