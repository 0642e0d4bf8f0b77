// SPDX-License-Identifier: MIT

//! Activation job: the gate in front of the agent job
//!
//! The activation job exists whenever anything has to be decided or done
//! before the agent runs: a pre-activation result to honour, a user
//! condition, a reaction, an issue lock or a `workflow_run` safety check.

use super::custom_jobs::CustomJob;
use super::pre_activation::PreActivation;
use super::{script_body, CompilationContext};
use crate::constants::{
    ACTIVATED_OUTPUT, ACTIVATION_JOB, LOCKABLE_EVENTS, PRE_ACTIVATION_JOB, REACTION_EVENTS,
};
use crate::error::CompilerError;
use crate::expression::builders::{
    any_event, conjunction, job_output_equals, job_result_equals, or, workflow_run_repo_safety,
};
use crate::expression::{needs_references, parse, unwrap_expression_template, ConditionNode};
use crate::jobs::{Job, Step};
use crate::permissions::{PermissionLevel, PermissionScope, Permissions};

/// Result of activation wiring
#[derive(Debug, Clone, Default)]
pub struct ActivationPlan {
    pub job: Option<Job>,
    /// User condition that references jobs outside the activation's
    /// dependencies and therefore gates the agent job instead
    pub agent_condition: Option<ConditionNode>,
}

/// Parse the workflow's top-level `if`, accepting an optional `${{ }}`
/// wrapper
pub fn parse_user_condition(text: &str) -> Result<ConditionNode, CompilerError> {
    Ok(parse(unwrap_expression_template(text))?)
}

pub fn build_activation_job(
    ctx: &CompilationContext<'_>,
    pre_activation: Option<&PreActivation>,
    custom_jobs: &[CustomJob],
) -> Result<ActivationPlan, CompilerError> {
    let data = ctx.data;
    let user_condition = data
        .if_condition
        .as_deref()
        .map(parse_user_condition)
        .transpose()?;
    let workflow_run = data.has_trigger("workflow_run");

    let exists = pre_activation.is_some()
        || user_condition.is_some()
        || data.reaction.is_some()
        || data.lock_for_agent
        || workflow_run;
    if !exists {
        log::debug!("No activation job needed for '{}'", data.name);
        return Ok(ActivationPlan::default());
    }

    let mut job = Job::new(ACTIVATION_JOB, &ctx.runner);
    let mut clauses = Vec::new();

    if let Some(pre) = pre_activation {
        job = job.needs(PRE_ACTIVATION_JOB);
        let mut gated: Vec<&str> = custom_jobs
            .iter()
            .filter(|custom| custom.depends_on(PRE_ACTIVATION_JOB))
            .map(|custom| custom.name.as_str())
            .collect();
        gated.sort_unstable();
        for name in gated {
            job = job.needs(name);
        }

        let activated = job_output_equals(PRE_ACTIVATION_JOB, ACTIVATED_OUTPUT, "true");
        clauses.push(if pre.has_skip_condition {
            or(job_result_equals(PRE_ACTIVATION_JOB, "skipped"), activated)
        } else {
            activated
        });
    }

    let mut agent_condition = None;
    if let Some(condition) = user_condition {
        let referenced = needs_references(&condition.render());
        if referenced.iter().all(|name| job.needs.contains(name)) {
            clauses.push(condition);
        } else {
            log::debug!(
                "User condition references {:?}; gating the agent job instead",
                referenced
            );
            agent_condition = Some(condition);
        }
    }

    if workflow_run {
        clauses.push(workflow_run_repo_safety());
    }

    if let Some(condition) = conjunction(clauses) {
        job = job.if_condition(condition.render());
    }

    let mut permissions = Permissions::contents_read();
    job = job.step(
        Step::new("Check workflow file timestamps")
            .id("check_workflow_timestamp")
            .uses(ctx.github_script()?)
            .env("GH_AW_WORKFLOW_FILE", format!("{}.lock.yml", ctx.workflow_file_stem()))
            .with("script", script_body("check_workflow_timestamp_api.cjs")),
    );

    if let Some(reaction) = &data.reaction {
        let events = triggered(ctx, &REACTION_EVENTS);
        if events.is_empty() {
            log::warn!(
                "Reaction '{}' configured but no trigger supports reactions; ignoring",
                reaction
            );
        } else {
            job = job
                .step(
                    Step::new(format!("Add {} reaction to the triggering item", reaction))
                        .id("react")
                        .if_condition(any_event(&events).render())
                        .uses(ctx.github_script()?)
                        .env("GH_AW_REACTION", reaction.as_str())
                        .env("GH_AW_WORKFLOW_NAME", data.name.as_str())
                        .with("script", script_body("add_reaction_and_edit_comment.cjs")),
                )
                .output("comment_id", "${{ steps.react.outputs.comment-id }}")
                .output("comment_url", "${{ steps.react.outputs.comment-url }}")
                .output("reaction_id", "${{ steps.react.outputs.reaction-id }}");
            permissions.merge(&Permissions::from_scopes([
                (PermissionScope::Discussions, PermissionLevel::Write),
                (PermissionScope::Issues, PermissionLevel::Write),
                (PermissionScope::PullRequests, PermissionLevel::Write),
            ]));
        }
    }

    if data.lock_for_agent {
        let events = triggered(ctx, &LOCKABLE_EVENTS);
        if events.is_empty() {
            log::warn!("lock-for-agent configured without an issue trigger; ignoring");
        } else {
            job = job
                .step(
                    Step::new("Lock issue for agent workflow")
                        .id("lock-issue")
                        .if_condition(any_event(&events).render())
                        .uses(ctx.github_script()?)
                        .with("script", script_body("lock-issue.cjs")),
                )
                .output("issue_locked", "${{ steps.lock-issue.outputs.locked }}");
            permissions.merge(&Permissions::from_scopes([(
                PermissionScope::Issues,
                PermissionLevel::Write,
            )]));
        }
    }

    log::debug!("Activation job needs {:?}", job.needs);
    Ok(ActivationPlan {
        job: Some(job.permissions(permissions)),
        agent_condition,
    })
}

/// Members of `events` the workflow is triggered by, in the given order
fn triggered<'e>(ctx: &CompilationContext<'_>, events: &[&'e str]) -> Vec<&'e str> {
    events
        .iter()
        .copied()
        .filter(|event| ctx.data.has_trigger(event))
        .collect()
}
