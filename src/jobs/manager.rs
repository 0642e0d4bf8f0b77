// SPDX-License-Identifier: MIT

//! Job collection and dependency graph validation

use super::job::Job;
use crate::error::JobGraphError;
use crate::expression::needs_references;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap};

/// Owns every job of a compiled workflow
#[derive(Debug, Clone, Default)]
pub struct JobManager {
    jobs: BTreeMap<String, Job>,
}

impl JobManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_job(&mut self, job: Job) -> Result<(), JobGraphError> {
        if self.jobs.contains_key(&job.name) {
            return Err(JobGraphError::DuplicateJob(job.name));
        }
        log::debug!("Adding job '{}' (needs: {:?})", job.name, job.needs);
        self.jobs.insert(job.name.clone(), job);
        Ok(())
    }

    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs.get(name)
    }

    pub fn has_job(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Check that every dependency exists, the graph is acyclic and every
    /// `needs.<job>` reference names a direct dependency
    pub fn validate(&self) -> Result<(), JobGraphError> {
        self.build_graph()?;

        for job in self.jobs.values() {
            for source in job.expression_sources() {
                for referenced in needs_references(source) {
                    if !job.needs.contains(&referenced) {
                        return Err(JobGraphError::MissingDirectDependency {
                            job: job.name.clone(),
                            referenced,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Jobs ordered so that every job follows its dependencies
    pub fn topological_order(&self) -> Result<Vec<&Job>, JobGraphError> {
        let graph = self.build_graph()?;
        toposort(&graph, None)
            .map(|indices| indices.iter().map(|&idx| graph[idx]).collect())
            .map_err(|cycle| JobGraphError::CycleDetected(graph[cycle.node_id()].name.clone()))
    }

    /// Render the `jobs:` section in dependency order
    pub fn render_to_yaml(&self) -> Result<String, JobGraphError> {
        self.validate()?;
        let mut out = String::from("jobs:");
        for job in self.topological_order()? {
            out.push('\n');
            out.push_str(&job.render());
        }
        out.push('\n');
        Ok(out)
    }

    /// Edges point from a dependency to its dependent
    fn build_graph(&self) -> Result<DiGraph<&Job, ()>, JobGraphError> {
        let mut graph = DiGraph::new();
        let mut name_to_index: HashMap<&str, NodeIndex> = HashMap::new();

        for job in self.jobs.values() {
            let idx = graph.add_node(job);
            name_to_index.insert(job.name.as_str(), idx);
        }

        for job in self.jobs.values() {
            let job_idx = name_to_index[job.name.as_str()];
            for dependency in &job.needs {
                let dep_idx = name_to_index.get(dependency.as_str()).ok_or_else(|| {
                    JobGraphError::UnknownDependency {
                        job: job.name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.add_edge(*dep_idx, job_idx, ());
            }
        }

        toposort(&graph, None)
            .map_err(|cycle| JobGraphError::CycleDetected(graph[cycle.node_id()].name.clone()))?;
        Ok(graph)
    }
}
