// SPDX-License-Identifier: MIT

pub mod loader;
pub mod types;

pub use loader::WorkflowLoader;
pub use types::{EngineConfig, Frontmatter, Roles, SkipQuery, WorkflowData};
