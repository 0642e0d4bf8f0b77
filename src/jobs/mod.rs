// SPDX-License-Identifier: MIT

//! Jobs, steps and the job graph

pub mod job;
pub mod manager;
pub mod step;
pub mod yaml;

pub use job::Job;
pub use manager::JobManager;
pub use step::Step;
