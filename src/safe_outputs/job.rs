// SPDX-License-Identifier: MIT

//! Consolidated safe output job
//!
//! One job acts on everything the agent requested. Step order is fixed:
//! artifact download, shared working tree setup, the project handler, the
//! handler manager for message kinds and finally one step per working tree
//! kind.

use super::config::SafeOutputsConfig;
use super::kinds::{HandlerCategory, SafeOutputKind};
use super::tokens::{kind_token, project_token, standard_token};
use crate::compiler::{script_body, CompilationContext};
use crate::constants::{
    ACTIVATION_JOB, AGENT_JOB, AGENT_OUTPUT_ARTIFACT, AGENT_OUTPUT_DIR, PATCH_ARTIFACT,
    RUNTIME_DIR, SAFE_OUTPUTS_JOB,
};
use crate::error::CompilerError;
use crate::expression::builders::{agent_completed, disjunction, output_type_present, safe_output_type};
use crate::expression::ConditionNode;
use crate::jobs::{Job, Step};
use crate::permissions::Permissions;

const PROJECT_HANDLER_STEP: &str = "process_project_safe_outputs";
const HANDLER_MANAGER_STEP: &str = "process_safe_outputs";

/// Build the `safe_outputs` job, or `None` when no output kind is configured
pub fn build_safe_outputs_job(
    ctx: &CompilationContext<'_>,
    activation_exists: bool,
) -> Result<Option<Job>, CompilerError> {
    let data = ctx.data;
    let Some(config) = data.safe_outputs.as_ref().filter(|c| !c.outputs.is_empty()) else {
        return Ok(None);
    };

    let runner = config.runs_on.clone().unwrap_or_else(|| ctx.runner.clone());
    let mut job = Job::new(SAFE_OUTPUTS_JOB, runner)
        .needs(AGENT_JOB)
        .if_condition(agent_completed().render());
    if activation_exists {
        job = job.needs(ACTIVATION_JOB);
    }

    let permissions = config
        .kinds()
        .fold(Permissions::new(), |acc, kind| acc.merged(&kind.permissions()));
    job = job.permissions(permissions);

    job.env.insert("GH_AW_WORKFLOW_NAME".to_string(), data.name.clone());
    job.env.insert(
        "GH_AW_AGENT_OUTPUT".to_string(),
        format!("{}{}", AGENT_OUTPUT_DIR, AGENT_OUTPUT_ARTIFACT),
    );
    if config.staged {
        job.env.insert("GH_AW_SAFE_OUTPUTS_STAGED".to_string(), "true".to_string());
    }

    job = job.step(
        Step::new("Download agent output artifact")
            .continue_on_error()
            .uses(ctx.download_artifact()?)
            .with("name", AGENT_OUTPUT_ARTIFACT)
            .with("path", AGENT_OUTPUT_DIR),
    );

    let working_tree = kinds_in(config, HandlerCategory::WorkingTree);
    if !working_tree.is_empty() {
        job = working_tree_setup(ctx, job, config, &working_tree)?;
    }

    let projects = kinds_in(config, HandlerCategory::Project);
    if !projects.is_empty() {
        job = job
            .step(
                Step::new("Process project safe outputs")
                    .id(PROJECT_HANDLER_STEP)
                    .if_condition(any_output(&projects, safe_output_type))
                    .uses(ctx.github_script()?)
                    .env(
                        "GH_AW_SAFE_OUTPUTS_PROJECT_HANDLER_CONFIG",
                        config.handler_config_json(projects.iter().copied())?,
                    )
                    .with("github-token", project_token(config, ctx.strict)?)
                    .with("script", script_body("safe_output_project_handler_manager.cjs")),
            )
            .output(
                "temporary_project_map",
                format!(
                    "${{{{ steps.{}.outputs.temporary_project_map }}}}",
                    PROJECT_HANDLER_STEP
                ),
            );
    }

    let messages = kinds_in(config, HandlerCategory::Message);
    if !messages.is_empty() {
        let mut step = Step::new("Process safe outputs")
            .id(HANDLER_MANAGER_STEP)
            .if_condition(any_output(&messages, safe_output_type))
            .uses(ctx.github_script()?)
            .env(
                "GH_AW_SAFE_OUTPUTS_HANDLER_CONFIG",
                config.handler_config_json(messages.iter().copied())?,
            );
        if !projects.is_empty() {
            step = step.env(
                "GH_AW_TEMPORARY_PROJECT_MAP",
                format!(
                    "${{{{ steps.{}.outputs.temporary_project_map }}}}",
                    PROJECT_HANDLER_STEP
                ),
            );
        }
        job = job
            .step(
                step.with("github-token", standard_token(config, data.github_token.as_deref()))
                    .with("script", script_body("safe_output_handler_manager.cjs")),
            )
            .output(
                "processed_count",
                format!("${{{{ steps.{}.outputs.processed_count }}}}", HANDLER_MANAGER_STEP),
            );
    }

    for kind in working_tree {
        job = job.step(working_tree_step(ctx, config, kind)?);
    }

    log::debug!(
        "Safe output job handles {} kind(s): {}",
        config.outputs.len(),
        config.kinds().map(|k| k.config_key()).collect::<Vec<_>>().join(", ")
    );
    Ok(Some(job))
}

fn kinds_in(config: &SafeOutputsConfig, category: HandlerCategory) -> Vec<SafeOutputKind> {
    config.kinds().filter(|kind| kind.category() == category).collect()
}

/// Disjunction of `gate` over the output types of `kinds`
fn any_output(kinds: &[SafeOutputKind], gate: fn(&str) -> ConditionNode) -> String {
    let terms = kinds.iter().map(|kind| gate(&kind.output_type())).collect();
    disjunction(terms, false).render()
}

/// Patch download, checkout and git identity, emitted once for all working
/// tree kinds
fn working_tree_setup(
    ctx: &CompilationContext<'_>,
    job: Job,
    config: &SafeOutputsConfig,
    kinds: &[SafeOutputKind],
) -> Result<Job, CompilerError> {
    let condition = any_output(kinds, output_type_present);
    let token = standard_token(config, ctx.data.github_token.as_deref());

    Ok(job
        .step(
            Step::new("Download patch artifact")
                .if_condition(condition.as_str())
                .continue_on_error()
                .uses(ctx.download_artifact()?)
                .with("name", PATCH_ARTIFACT)
                .with("path", format!("{}/", RUNTIME_DIR)),
        )
        .step(
            Step::new("Checkout repository")
                .if_condition(condition.as_str())
                .uses(ctx.checkout()?)
                .with("token", token.as_str())
                .with("persist-credentials", "false")
                .with("fetch-depth", "0"),
        )
        .step(
            Step::new("Configure git credentials")
                .if_condition(condition)
                .env("REPO_NAME", "${{ github.repository }}")
                .env("SERVER_URL", "${{ github.server_url }}")
                .env("GIT_TOKEN", token)
                .run(
                    "git config --global user.email \"github-actions[bot]@users.noreply.github.com\"\n\
                     git config --global user.name \"github-actions[bot]\"\n\
                     SERVER_URL_STRIPPED=\"${SERVER_URL#https://}\"\n\
                     git remote set-url origin \"https://x-access-token:${GIT_TOKEN}@${SERVER_URL_STRIPPED}/${REPO_NAME}.git\"",
                ),
        ))
}

fn working_tree_step(
    ctx: &CompilationContext<'_>,
    config: &SafeOutputsConfig,
    kind: SafeOutputKind,
) -> Result<Step, CompilerError> {
    let (name, script) = match kind {
        SafeOutputKind::CreatePullRequest => ("Create pull request", "create_pull_request.cjs"),
        SafeOutputKind::PushToPullRequestBranch => {
            ("Push to pull request branch", "push_to_pull_request_branch.cjs")
        }
        _ => ("Upload assets", "upload_assets.cjs"),
    };

    let mut step = Step::new(name)
        .id(kind.step_id())
        .if_condition(safe_output_type(&kind.output_type()).render())
        .uses(ctx.github_script()?)
        .env(
            "GH_AW_SAFE_OUTPUT_CONFIG",
            config.handler_config_json([kind])?,
        );
    if kind == SafeOutputKind::CreatePullRequest {
        step = step.env("GH_AW_BASE_BRANCH", "${{ github.ref_name }}");
    }
    Ok(step
        .with("github-token", kind_token(config, kind, ctx.data.github_token.as_deref()))
        .with("script", script_body(script)))
}
