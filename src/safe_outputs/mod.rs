// SPDX-License-Identifier: MIT

//! Safe outputs: side effects the agent requests and a separate, privileged
//! job performs

pub mod config;
pub mod job;
pub mod kinds;
pub mod tokens;

pub use config::{SafeOutputTypeConfig, SafeOutputsConfig};
pub use job::build_safe_outputs_job;
pub use kinds::{HandlerCategory, SafeOutputKind};
