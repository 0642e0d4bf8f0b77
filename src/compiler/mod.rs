// SPDX-License-Identifier: MIT

//! Job graph compiler
//!
//! Turns a [`WorkflowData`] into a validated job graph:
//! - `pre_activation` - role, stop-time and skip-query checks
//! - `activation` - the gate in front of the agent job
//! - `agent` - the main job running the engine
//! - custom jobs from the frontmatter
//! - `safe_outputs` - the consolidated job acting on the agent's requests

pub mod activation;
pub mod agent;
pub mod custom_jobs;
pub mod engine;
pub mod pre_activation;
pub mod stop_time;

use crate::action_pins::{ActionPinResolver, ShaResolver};
use crate::config::CompilerOptions;
use crate::constants::{
    ACTIONS_DIR, CHECKOUT_ACTION, DOWNLOAD_ARTIFACT_ACTION, GITHUB_SCRIPT_ACTION,
    UPLOAD_ARTIFACT_ACTION,
};
use crate::error::CompilerError;
use crate::jobs::yaml::{entry, value_entry};
use crate::jobs::JobManager;
use crate::safe_outputs::build_safe_outputs_job;
use crate::workflow::{WorkflowData, WorkflowLoader};
use engine::{AgentEngine, CommandEngine};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Inline script of a github-script step that runs a bundled handler
pub(crate) fn script_body(script: &str) -> String {
    format!(
        "const {{ main }} = require('{}/{}');\nawait main();",
        ACTIONS_DIR, script
    )
}

/// Per-compilation state shared by the job builders
pub struct CompilationContext<'a> {
    pub data: &'a WorkflowData,
    pub options: &'a CompilerOptions,
    /// Strict mode from the options or the frontmatter
    pub strict: bool,
    /// Runner of the generated jobs
    pub runner: String,
    source_stem: Option<String>,
    pins: ActionPinResolver,
}

impl<'a> CompilationContext<'a> {
    pub fn new(data: &'a WorkflowData, options: &'a CompilerOptions) -> Self {
        let strict = options.strict || data.strict;
        Self {
            data,
            options,
            strict,
            runner: data
                .runs_on
                .clone()
                .unwrap_or_else(|| options.default_runner.clone()),
            source_stem: None,
            pins: ActionPinResolver::new(strict),
        }
    }

    pub fn with_sha_resolver(mut self, resolver: Arc<dyn ShaResolver + Send + Sync>) -> Self {
        self.pins = self.pins.with_dynamic_resolver(resolver);
        self
    }

    /// File stem of the source document, used to name the lock file
    pub fn with_source_stem(mut self, stem: impl Into<String>) -> Self {
        self.source_stem = Some(stem.into());
        self
    }

    /// Pinned `uses:` reference for an action
    pub fn pin(&self, repo: &str, version: &str) -> Result<String, CompilerError> {
        self.pins.resolve(repo, version)
    }

    pub fn github_script(&self) -> Result<String, CompilerError> {
        self.pin(GITHUB_SCRIPT_ACTION.0, GITHUB_SCRIPT_ACTION.1)
    }

    pub fn checkout(&self) -> Result<String, CompilerError> {
        self.pin(CHECKOUT_ACTION.0, CHECKOUT_ACTION.1)
    }

    pub fn upload_artifact(&self) -> Result<String, CompilerError> {
        self.pin(UPLOAD_ARTIFACT_ACTION.0, UPLOAD_ARTIFACT_ACTION.1)
    }

    pub fn download_artifact(&self) -> Result<String, CompilerError> {
        self.pin(DOWNLOAD_ARTIFACT_ACTION.0, DOWNLOAD_ARTIFACT_ACTION.1)
    }

    /// Source file stem, or the workflow name as a slug
    pub fn workflow_file_stem(&self) -> String {
        match &self.source_stem {
            Some(stem) => stem.clone(),
            None => slug(&self.data.name),
        }
    }
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "workflow".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A compiled and validated pipeline
#[derive(Debug)]
pub struct CompiledWorkflow {
    pub name: String,
    pub triggers: BTreeMap<String, serde_yaml::Value>,
    pub concurrency: Option<String>,
    pub jobs: JobManager,
}

impl CompiledWorkflow {
    /// Render the complete pipeline definition
    pub fn render_to_yaml(&self) -> Result<String, CompilerError> {
        let mut out = String::from(
            "# This file was generated by awc. Do not edit it by hand;\n\
             # edit the source workflow and recompile instead.\n\n",
        );
        out.push_str(&entry(0, "name", &self.name));
        out.push('\n');

        let triggers: serde_yaml::Mapping = self
            .triggers
            .iter()
            .map(|(event, config)| (serde_yaml::Value::String(event.clone()), config.clone()))
            .collect();
        out.push_str(&value_entry(0, "on", &serde_yaml::Value::Mapping(triggers)));
        out.push('\n');

        if let Some(group) = &self.concurrency {
            out.push_str("concurrency:\n");
            out.push_str(&entry(2, "group", group));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.jobs.render_to_yaml()?);
        Ok(out)
    }
}

/// Compiles workflows into job graphs
pub struct Compiler {
    options: CompilerOptions,
    engine: Option<Box<dyn AgentEngine>>,
    sha_resolver: Option<Arc<dyn ShaResolver + Send + Sync>>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            engine: None,
            sha_resolver: None,
        }
    }

    /// Use `engine` instead of the one configured in the frontmatter
    pub fn with_engine(mut self, engine: Box<dyn AgentEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_sha_resolver(mut self, resolver: Arc<dyn ShaResolver + Send + Sync>) -> Self {
        self.sha_resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Load and compile a markdown workflow file
    pub fn compile_file<P: AsRef<Path>>(&self, path: P) -> Result<CompiledWorkflow, CompilerError> {
        let path = path.as_ref();
        let data = WorkflowLoader::new().load_workflow(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(String::from);
        self.compile_with_source(&data, stem)
    }

    pub fn compile_markdown(&self, content: &str) -> Result<CompiledWorkflow, CompilerError> {
        let data = WorkflowLoader::parse_markdown(content)?;
        self.compile(&data)
    }

    pub fn compile(&self, data: &WorkflowData) -> Result<CompiledWorkflow, CompilerError> {
        self.compile_with_source(data, None)
    }

    fn compile_with_source(
        &self,
        data: &WorkflowData,
        stem: Option<String>,
    ) -> Result<CompiledWorkflow, CompilerError> {
        let mut ctx = CompilationContext::new(data, &self.options);
        if let Some(resolver) = &self.sha_resolver {
            ctx = ctx.with_sha_resolver(Arc::clone(resolver));
        }
        if let Some(stem) = stem {
            ctx = ctx.with_source_stem(stem);
        }
        log::debug!("Compiling '{}' (strict: {})", data.name, ctx.strict);

        let custom_jobs = custom_jobs::parse_custom_jobs(data)?;
        let pre = pre_activation::build_pre_activation_job(&ctx)?;
        let plan = activation::build_activation_job(&ctx, pre.as_ref(), &custom_jobs)?;
        let activation_exists = plan.job.is_some();

        let configured_engine;
        let engine: &dyn AgentEngine = match &self.engine {
            Some(engine) => engine.as_ref(),
            None => {
                configured_engine = CommandEngine::new(data.engine.clone());
                &configured_engine
            }
        };
        let agent = agent::build_agent_job(&ctx, &plan, &custom_jobs, pre.is_some(), engine)?;
        let safe_outputs = build_safe_outputs_job(&ctx, activation_exists)?;

        let mut jobs = JobManager::new();
        if let Some(pre) = pre {
            jobs.add_job(pre.job)?;
        }
        if let Some(job) = plan.job {
            jobs.add_job(job)?;
        }
        jobs.add_job(agent)?;
        for custom in custom_jobs {
            jobs.add_job(custom.into_job(&ctx.runner, activation_exists)?)?;
        }
        if let Some(job) = safe_outputs {
            jobs.add_job(job)?;
        }
        jobs.validate()?;

        log::info!(
            "Compiled '{}' into {} job(s): {}",
            data.name,
            jobs.len(),
            jobs.job_names().collect::<Vec<_>>().join(", ")
        );

        Ok(CompiledWorkflow {
            name: data.name.clone(),
            triggers: data.triggers.clone(),
            concurrency: data.concurrency.clone(),
            jobs,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}
