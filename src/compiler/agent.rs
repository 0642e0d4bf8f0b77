// SPDX-License-Identifier: MIT

//! Main agent job

use super::activation::ActivationPlan;
use super::custom_jobs::CustomJob;
use super::engine::AgentEngine;
use super::{script_body, CompilationContext};
use crate::constants::{
    ACTIVATION_JOB, AGENT_JOB, AGENT_OUTPUT_ARTIFACT, AGENT_OUTPUT_DIR, PATCH_ARTIFACT,
    PATCH_PATH, PRE_ACTIVATION_JOB, PROMPT_PATH, SAFE_OUTPUTS_FILE,
};
use crate::error::{CompilerError, ConfigError};
use crate::expression::{needs_references, template_needs_references};
use crate::jobs::{Job, Step};
use crate::permissions::Permissions;
use crate::safe_outputs::SafeOutputsConfig;
use std::collections::BTreeSet;

/// Delimiter of the prompt heredoc
const PROMPT_EOF: &str = "GH_AW_PROMPT_EOF";

pub fn build_agent_job(
    ctx: &CompilationContext<'_>,
    plan: &ActivationPlan,
    custom_jobs: &[CustomJob],
    pre_activation_exists: bool,
    engine: &dyn AgentEngine,
) -> Result<Job, CompilerError> {
    let data = ctx.data;
    let mut job = Job::new(AGENT_JOB, &ctx.runner);

    if plan.job.is_some() {
        job = job.needs(ACTIVATION_JOB);
    }

    let relocated = plan.agent_condition.as_ref().map(|condition| condition.render());
    for name in referenced_jobs(
        data.markdown.as_str(),
        relocated.as_deref(),
        &data.steps,
        custom_jobs,
        pre_activation_exists,
    ) {
        job = job.needs(name);
    }
    if let Some(condition) = relocated {
        job = job.if_condition(condition);
    }

    let permissions = data.permissions.clone().unwrap_or_else(Permissions::read_all);
    if ctx.strict {
        if let Some(scope) = permissions.write_scopes().first() {
            return Err(ConfigError::WritePermissionInStrictMode(scope.to_string()).into());
        }
    }
    job = job.permissions(permissions);
    job.timeout_minutes = data.timeout_minutes;
    job.environment = data.environment.clone();

    job = job.step(
        Step::new("Checkout repository")
            .uses(ctx.checkout()?)
            .with("persist-credentials", "false"),
    );

    let safe_outputs = data.safe_outputs.as_ref().filter(|config| !config.outputs.is_empty());
    if let Some(config) = safe_outputs {
        job = job.step(
            Step::new("Setup safe outputs")
                .env("GH_AW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE)
                .env("GH_AW_SAFE_OUTPUTS_CONFIG", config.handler_config_json(config.kinds())?)
                .run(
                    "mkdir -p \"$(dirname \"$GH_AW_SAFE_OUTPUTS\")\"\n\
                     touch \"$GH_AW_SAFE_OUTPUTS\"\n\
                     echo \"$GH_AW_SAFE_OUTPUTS_CONFIG\" > \"$(dirname \"$GH_AW_SAFE_OUTPUTS\")/config.json\"",
                ),
        );
    }

    job = job.step(
        Step::new("Create prompt")
            .env("GH_AW_PROMPT", PROMPT_PATH)
            .run(prompt_script(&data.markdown)),
    );
    for step in &data.steps {
        job.push_raw_step(step);
    }
    for step in engine.execution_steps(data) {
        job = job.step(step);
    }

    if let Some(config) = safe_outputs {
        job = collect_outputs(ctx, job, config)?;
    }

    log::debug!(
        "Agent job needs {:?} with {} step(s) using engine '{}'",
        job.needs,
        job.steps.len(),
        engine.id()
    );
    Ok(job)
}

/// Jobs the agent reads `needs.<job>` from and that must be direct
/// dependencies: templates in the prompt and custom steps, step conditions
/// and the relocated condition
fn referenced_jobs(
    markdown: &str,
    condition: Option<&str>,
    custom_steps: &[serde_yaml::Value],
    custom_jobs: &[CustomJob],
    pre_activation_exists: bool,
) -> BTreeSet<String> {
    let mut referenced = template_needs_references(markdown);
    if let Some(condition) = condition {
        referenced.extend(needs_references(condition));
    }
    for step in custom_steps {
        referenced.extend(template_needs_references(&Step::render_raw(step)));
        if let Some(condition) = step.get("if").and_then(serde_yaml::Value::as_str) {
            referenced.extend(needs_references(condition));
        }
    }

    referenced
        .into_iter()
        .filter(|name| {
            custom_jobs.iter().any(|custom| &custom.name == name)
                || (pre_activation_exists && name == PRE_ACTIVATION_JOB)
        })
        .collect()
}

fn prompt_script(markdown: &str) -> String {
    let body = markdown.trim_matches('\n');
    format!(
        "mkdir -p \"$(dirname \"$GH_AW_PROMPT\")\"\ncat << '{eof}' > \"$GH_AW_PROMPT\"\n{body}\n{eof}",
        eof = heredoc_delimiter(body),
        body = body
    )
}

/// A delimiter no line of `body` could be mistaken for
fn heredoc_delimiter(body: &str) -> String {
    let mut delimiter = PROMPT_EOF.to_string();
    let mut suffix = 0;
    while body.lines().any(|line| line.trim() == delimiter) {
        suffix += 1;
        delimiter = format!("{}_{}", PROMPT_EOF, suffix);
    }
    delimiter
}

/// Collect the agent's safe output requests and publish them as an artifact
fn collect_outputs(
    ctx: &CompilationContext<'_>,
    mut job: Job,
    config: &SafeOutputsConfig,
) -> Result<Job, CompilerError> {
    let allowed: Vec<String> = config.kinds().map(|kind| kind.output_type()).collect();
    let output_file = format!("{}{}", AGENT_OUTPUT_DIR, AGENT_OUTPUT_ARTIFACT);

    job = job
        .step(
            Step::new("Ingest agent output")
                .id("collect_output")
                .uses(ctx.github_script()?)
                .env("GH_AW_SAFE_OUTPUTS", SAFE_OUTPUTS_FILE)
                .env("GH_AW_ALLOWED_SAFE_OUTPUTS", allowed.join(","))
                .env("GH_AW_AGENT_OUTPUT", output_file.as_str())
                .with("script", script_body("collect_ndjson_output.cjs")),
        )
        .step(
            Step::new("Upload agent output")
                .if_condition("always()")
                .uses(ctx.upload_artifact()?)
                .with("name", AGENT_OUTPUT_ARTIFACT)
                .with("path", output_file.as_str())
                .with("if-no-files-found", "warn"),
        )
        .output("output", "${{ steps.collect_output.outputs.output }}")
        .output("output_types", "${{ steps.collect_output.outputs.output_types }}");

    if config.kinds().any(|kind| kind.requires_working_tree()) {
        job = job
            .step(
                Step::new("Generate git patch")
                    .id("generate_patch")
                    .if_condition("always()")
                    .env("GH_AW_PATCH_PATH", PATCH_PATH)
                    .run(
                        "git add -A\n\
                         if git diff --cached --quiet HEAD; then\n  \
                           echo \"has_patch=false\" >> \"$GITHUB_OUTPUT\"\n\
                         else\n  \
                           git diff --cached HEAD > \"$GH_AW_PATCH_PATH\"\n  \
                           echo \"has_patch=true\" >> \"$GITHUB_OUTPUT\"\n\
                         fi",
                    ),
            )
            .step(
                Step::new("Upload git patch")
                    .if_condition("steps.generate_patch.outputs.has_patch == 'true'")
                    .uses(ctx.upload_artifact()?)
                    .with("name", PATCH_ARTIFACT)
                    .with("path", PATCH_PATH)
                    .with("if-no-files-found", "ignore"),
            )
            .output("has_patch", "${{ steps.generate_patch.outputs.has_patch }}");
    }

    Ok(job)
}
