// SPDX-License-Identifier: MIT

//! Job permission sets
//!
//! A permission set is either a shorthand (`read-all`, `write-all`, `none`)
//! or an explicit scope map. Sets are built incrementally while a job is
//! assembled and merged with the rules documented on [`Permissions::merge`].

mod scope;

pub use scope::{PermissionLevel, PermissionScope, PermissionShorthand};

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Permissions granted to a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    Shorthand(PermissionShorthand),
    Scopes(BTreeMap<PermissionScope, PermissionLevel>),
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::Scopes(BTreeMap::new())
    }
}

impl Permissions {
    /// Empty explicit map, rendered as `permissions: {}`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_all() -> Self {
        Permissions::Shorthand(PermissionShorthand::ReadAll)
    }

    pub fn write_all() -> Self {
        Permissions::Shorthand(PermissionShorthand::WriteAll)
    }

    pub fn none() -> Self {
        Permissions::Shorthand(PermissionShorthand::None)
    }

    /// Explicit map from `(scope, level)` pairs
    pub fn from_scopes(entries: impl IntoIterator<Item = (PermissionScope, PermissionLevel)>) -> Self {
        let mut permissions = Self::new();
        for (scope, level) in entries {
            permissions.set(scope, level);
        }
        permissions
    }

    /// `contents: read`
    pub fn contents_read() -> Self {
        Self::from_scopes([(PermissionScope::Contents, PermissionLevel::Read)])
    }

    /// Grant `level` on `scope`. Setting a scope on a shorthand replaces the
    /// shorthand with an explicit map. `id-token: read` is not a valid grant
    /// and is ignored.
    pub fn set(&mut self, scope: PermissionScope, level: PermissionLevel) {
        if level == PermissionLevel::Read && !scope.supports_read() {
            log::warn!("Ignoring '{}: read'; the scope only supports none or write", scope);
            return;
        }
        match self {
            Permissions::Scopes(map) => {
                map.insert(scope, level);
            }
            Permissions::Shorthand(_) => {
                *self = Permissions::Scopes(BTreeMap::from([(scope, level)]));
            }
        }
    }

    /// Effective level for `scope`. Shorthands synthesize the level, except
    /// that `read-all` reports `id-token` as absent.
    pub fn get(&self, scope: PermissionScope) -> Option<PermissionLevel> {
        match self {
            Permissions::Shorthand(shorthand) => shorthand.level_for(scope),
            Permissions::Scopes(map) => map.get(&scope).copied(),
        }
    }

    /// Merge `incoming` into `self`:
    ///
    /// 1. both shorthands: keep the higher (`write-all > read-all > none`)
    /// 2. shorthand base, map incoming: the result is exactly the incoming map
    /// 3. map base, shorthand incoming: scopes missing from the base are added
    ///    at the shorthand's level; existing entries are kept; `none` adds
    ///    nothing and `id-token` is only added for `write-all`
    /// 4. both maps: per scope the higher level wins
    pub fn merge(&mut self, incoming: &Permissions) {
        match (&mut *self, incoming) {
            (Permissions::Shorthand(base), Permissions::Shorthand(other)) => {
                if *other > *base {
                    *base = *other;
                }
            }
            (Permissions::Shorthand(_), Permissions::Scopes(map)) => {
                *self = Permissions::Scopes(map.clone());
            }
            (Permissions::Scopes(map), Permissions::Shorthand(shorthand)) => {
                if *shorthand == PermissionShorthand::None {
                    return;
                }
                for scope in PermissionScope::ALL {
                    if map.contains_key(&scope) {
                        continue;
                    }
                    if let Some(level) = shorthand.level_for(scope) {
                        map.insert(scope, level);
                    }
                }
            }
            (Permissions::Scopes(map), Permissions::Scopes(other)) => {
                for (scope, level) in other {
                    map.entry(*scope)
                        .and_modify(|current| {
                            if *level > *current {
                                *current = *level;
                            }
                        })
                        .or_insert(*level);
                }
            }
        }
    }

    /// Builder-style [`Permissions::merge`]
    pub fn merged(mut self, incoming: &Permissions) -> Self {
        self.merge(incoming);
        self
    }

    pub fn is_shorthand(&self) -> bool {
        matches!(self, Permissions::Shorthand(_))
    }

    /// True for an explicit map without entries
    pub fn is_empty(&self) -> bool {
        matches!(self, Permissions::Scopes(map) if map.is_empty())
    }

    /// Scopes granted `write`, ignoring `id-token` which only mints OIDC tokens
    pub fn write_scopes(&self) -> Vec<PermissionScope> {
        PermissionScope::ALL
            .iter()
            .copied()
            .filter(|scope| *scope != PermissionScope::IdToken)
            .filter(|scope| self.get(*scope) == Some(PermissionLevel::Write))
            .collect()
    }

    pub fn has_write(&self) -> bool {
        !self.write_scopes().is_empty()
    }

    /// Render as a `permissions:` YAML entry without indentation
    pub fn render_to_yaml(&self) -> String {
        match self {
            Permissions::Shorthand(shorthand) => format!("permissions: {}", shorthand),
            Permissions::Scopes(map) if map.is_empty() => "permissions: {}".to_string(),
            Permissions::Scopes(map) => {
                let mut out = String::from("permissions:");
                for (scope, level) in map {
                    out.push_str(&format!("\n  {}: {}", scope, level));
                }
                out
            }
        }
    }

    /// Parse a frontmatter value: a shorthand string or a `scope: level` map
    pub fn from_yaml_value(value: &serde_yaml::Value) -> Result<Self, ConfigError> {
        match value {
            serde_yaml::Value::String(s) => parse_shorthand(s),
            serde_yaml::Value::Mapping(mapping) => {
                let mut permissions = Permissions::new();
                for (key, level) in mapping {
                    let scope_name = key.as_str().unwrap_or_default();
                    let level_name = level.as_str().unwrap_or_default();
                    let invalid = || ConfigError::InvalidPermission {
                        scope: scope_name.to_string(),
                        level: level_name.to_string(),
                    };
                    let scope: PermissionScope = scope_name.parse().map_err(|_| invalid())?;
                    let level: PermissionLevel = level_name.parse().map_err(|_| invalid())?;
                    if level == PermissionLevel::Read && !scope.supports_read() {
                        return Err(invalid());
                    }
                    permissions.set(scope, level);
                }
                Ok(permissions)
            }
            other => Err(ConfigError::InvalidPermission {
                scope: "permissions".to_string(),
                level: format!("{:?}", other),
            }),
        }
    }
}

fn parse_shorthand(value: &str) -> Result<Permissions, ConfigError> {
    value
        .parse::<PermissionShorthand>()
        .map(Permissions::Shorthand)
        .map_err(|_| ConfigError::InvalidPermission {
            scope: "permissions".to_string(),
            level: value.to_string(),
        })
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Permissions::from_yaml_value(&value).map_err(serde::de::Error::custom)
    }
}
