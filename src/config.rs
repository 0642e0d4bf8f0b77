// SPDX-License-Identifier: MIT

//! Compiler options

use crate::constants::DEFAULT_RUNNER;
use chrono::{DateTime, Utc};
use std::env;

/// Options that apply to a whole compilation pass
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Reject unpinnable actions, agent write grants and implicit project tokens
    pub strict: bool,
    /// Runner used when a workflow does not set `runs-on`
    pub default_runner: String,
    /// Base time for relative stop-after deadlines
    pub reference_time: DateTime<Utc>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            strict: false,
            default_runner: DEFAULT_RUNNER.to_string(),
            reference_time: Utc::now(),
        }
    }
}

impl CompilerOptions {
    /// Read `AWC_STRICT` and `AWC_DEFAULT_RUNNER` from the environment
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = env::var("AWC_STRICT") {
            options.strict = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(runner) = env::var("AWC_DEFAULT_RUNNER") {
            if !runner.trim().is_empty() {
                options.default_runner = runner.trim().to_string();
            }
        }
        options
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn default_runner(mut self, runner: impl Into<String>) -> Self {
        self.default_runner = runner.into();
        self
    }

    pub fn reference_time(mut self, time: DateTime<Utc>) -> Self {
        self.reference_time = time;
        self
    }
}
