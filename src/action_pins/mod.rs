// SPDX-License-Identifier: MIT

//! Action pinning
//!
//! Every `uses:` reference the compiler emits is pinned to a commit SHA.
//! Lookups go to an optional dynamic resolver first and then to the bundled
//! catalog, which is parsed once per process.

use crate::error::CompilerError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

static BUNDLED_PINS: &str = include_str!("../../data/action_pins.json");

static CATALOG: Lazy<Vec<ActionPin>> = Lazy::new(|| load_catalog(BUNDLED_PINS));

/// A known `(repo, version) -> sha` mapping
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionPin {
    pub repo: String,
    pub version: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
struct PinCatalog {
    entries: Vec<ActionPin>,
}

/// Parse a catalog, sorted by repo and then by descending version. A broken
/// catalog degrades to an empty one.
fn load_catalog(json: &str) -> Vec<ActionPin> {
    match serde_json::from_str::<PinCatalog>(json) {
        Ok(catalog) => {
            let mut entries = catalog.entries;
            entries.sort_by(|a, b| {
                a.repo
                    .cmp(&b.repo)
                    .then_with(|| compare_versions(&b.version, &a.version))
            });
            log::debug!("Loaded {} action pins", entries.len());
            entries
        }
        Err(e) => {
            log::error!("Failed to parse bundled action pins: {}", e);
            Vec::new()
        }
    }
}

/// `v4.2.1` -> `[4, 2, 1]`; missing components are zero
fn parse_version(version: &str) -> Option<[u64; 3]> {
    let mut parts = [0u64; 3];
    let trimmed = version.trim_start_matches('v');
    if trimmed.is_empty() {
        return None;
    }
    for (i, component) in trimmed.split('.').enumerate() {
        if i >= 3 {
            return None;
        }
        parts[i] = component.parse().ok()?;
    }
    Some(parts)
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn same_major(a: &str, b: &str) -> bool {
    matches!((parse_version(a), parse_version(b)), (Some(a), Some(b)) if a[0] == b[0])
}

/// Dynamic lookup, e.g. against the hosting API or a lock file
pub trait ShaResolver {
    fn resolve_sha(&self, repo: &str, version: &str) -> Option<String>;
}

/// Resolves action references for one compilation
pub struct ActionPinResolver {
    strict: bool,
    dynamic: Option<Arc<dyn ShaResolver + Send + Sync>>,
    catalog: &'static [ActionPin],
    warned: RefCell<HashSet<(String, String)>>,
}

impl ActionPinResolver {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            dynamic: None,
            catalog: CATALOG.as_slice(),
            warned: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_dynamic_resolver(mut self, resolver: Arc<dyn ShaResolver + Send + Sync>) -> Self {
        self.dynamic = Some(resolver);
        self
    }

    /// Pinned `uses:` value: `repo@<sha> # <version>`. Unresolvable actions
    /// fail in strict mode and fall back to `repo@version` otherwise.
    pub fn resolve(&self, repo: &str, version: &str) -> Result<String, CompilerError> {
        if let Some(sha) = self
            .dynamic
            .as_ref()
            .and_then(|resolver| resolver.resolve_sha(repo, version))
        {
            return Ok(pinned(repo, &sha, version));
        }

        let candidates = self.catalog.iter().filter(|pin| pin.repo == repo);
        let mut approximate = None;
        for pin in candidates {
            if pin.version == version {
                return Ok(pinned(repo, &pin.sha, &pin.version));
            }
            if approximate.is_none() && same_major(&pin.version, version) {
                approximate = Some(pin);
            }
        }

        if let Some(pin) = approximate {
            self.warn_once(repo, version, || {
                log::warn!(
                    "No exact pin for {}@{}; using {}@{}",
                    repo,
                    version,
                    repo,
                    pin.version
                )
            });
            return Ok(pinned(repo, &pin.sha, &pin.version));
        }

        if self.strict {
            return Err(CompilerError::unpinned(repo, version));
        }
        self.warn_once(repo, version, || {
            log::warn!("Unable to pin {}@{} to a commit SHA", repo, version)
        });
        Ok(format!("{}@{}", repo, version))
    }

    fn warn_once(&self, repo: &str, version: &str, warn: impl FnOnce()) {
        let key = (repo.to_string(), version.to_string());
        if self.warned.borrow_mut().insert(key) {
            warn();
        }
    }

    #[cfg(test)]
    fn with_catalog(mut self, catalog: &'static [ActionPin]) -> Self {
        self.catalog = catalog;
        self
    }
}

fn pinned(repo: &str, sha: &str, version: &str) -> String {
    format!("{}@{} # {}", repo, sha, version)
}
