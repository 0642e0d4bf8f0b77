// SPDX-License-Identifier: MIT

//! Compiler from agentic workflow documents to CI job graphs
//!
//! A workflow is a markdown document with a YAML frontmatter block. The
//! compiler decides which control jobs exist, how they are gated, what they
//! depend on and which permissions they hold, then renders the pipeline.

pub mod action_pins;
pub mod compiler;
pub mod config;
pub mod constants;
pub mod error;
pub mod expression;
pub mod jobs;
pub mod permissions;
pub mod safe_outputs;
pub mod workflow;

pub use compiler::{CompiledWorkflow, Compiler};
pub use config::CompilerOptions;
pub use error::{CompilerError, ConfigError, JobGraphError, ParseError};
pub use expression::ConditionNode;
pub use permissions::Permissions;
pub use workflow::{WorkflowData, WorkflowLoader};
