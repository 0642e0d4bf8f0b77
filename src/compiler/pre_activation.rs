// SPDX-License-Identifier: MIT

//! Pre-activation job: role membership, stop-time and skip-query checks

use super::stop_time::resolve_stop_time;
use super::{script_body, CompilationContext};
use crate::constants::{
    ACTIVATED_OUTPUT, GITHUB_TOKEN, PRE_ACTIVATION_JOB, SAFE_EVENTS,
};
use crate::error::CompilerError;
use crate::expression::builders::{conjunction, event_type_not_equals, step_output_equals};
use crate::expression::wrap_expression_template;
use crate::jobs::{Job, Step};
use crate::permissions::Permissions;
use crate::workflow::WorkflowData;

/// The generated pre-activation job and whether it skips itself for safe
/// events
#[derive(Debug, Clone)]
pub struct PreActivation {
    pub job: Job,
    pub has_skip_condition: bool,
}

/// A check step and the output that reports success
struct Check {
    step_id: &'static str,
    output: &'static str,
}

/// Membership must be verified when a user-initiated event can trigger the
/// workflow and the role list is restricted
pub fn needs_permission_check(data: &WorkflowData) -> bool {
    !data.roles.is_unrestricted() && data.trigger_names().any(|event| !SAFE_EVENTS.contains(&event))
}

/// Build the pre-activation job, or `None` when nothing needs checking
pub fn build_pre_activation_job(
    ctx: &CompilationContext<'_>,
) -> Result<Option<PreActivation>, CompilerError> {
    let data = ctx.data;
    let permission_check = needs_permission_check(data);
    let stop_time = data
        .stop_time
        .as_deref()
        .map(|value| resolve_stop_time(value, ctx.options.reference_time))
        .transpose()?;

    if !permission_check
        && stop_time.is_none()
        && data.skip_if_match.is_none()
        && data.skip_if_no_match.is_none()
    {
        log::debug!("No pre-activation checks needed for '{}'", data.name);
        return Ok(None);
    }

    let github_script = ctx.github_script()?;
    let mut job = Job::new(PRE_ACTIVATION_JOB, &ctx.runner).permissions(Permissions::contents_read());
    let mut checks = Vec::new();

    if permission_check {
        job = job.step(
            Step::new("Check team membership for workflow")
                .id("check_membership")
                .uses(&github_script)
                .env("GH_AW_REQUIRED_ROLES", data.roles.members().join(","))
                .with("script", script_body("check_membership.cjs")),
        );
        checks.push(Check {
            step_id: "check_membership",
            output: "is_team_member",
        });
    }

    if let Some(deadline) = &stop_time {
        job = job.step(
            Step::new("Check stop-time limit")
                .id("check_stop_time")
                .uses(&github_script)
                .env("GH_AW_STOP_TIME", deadline.as_str())
                .env("GH_AW_WORKFLOW_NAME", data.name.as_str())
                .with("script", script_body("check_stop_time.cjs")),
        );
        checks.push(Check {
            step_id: "check_stop_time",
            output: "stop_time_ok",
        });
    }

    if let Some(query) = &data.skip_if_match {
        job = job.step(
            Step::new("Check skip-if-match query")
                .id("check_skip_if_match")
                .uses(&github_script)
                .env("GH_AW_SKIP_QUERY", query.query.as_str())
                .env("GH_AW_WORKFLOW_NAME", data.name.as_str())
                .env("GH_AW_SKIP_MAX_MATCHES", query.threshold.to_string())
                .with("github-token", GITHUB_TOKEN)
                .with("script", script_body("check_skip_if_match.cjs")),
        );
        checks.push(Check {
            step_id: "check_skip_if_match",
            output: "skip_check_ok",
        });
    }

    if let Some(query) = &data.skip_if_no_match {
        job = job.step(
            Step::new("Check skip-if-no-match query")
                .id("check_skip_if_no_match")
                .uses(&github_script)
                .env("GH_AW_SKIP_QUERY", query.query.as_str())
                .env("GH_AW_WORKFLOW_NAME", data.name.as_str())
                .env("GH_AW_SKIP_MIN_MATCHES", query.threshold.to_string())
                .with("github-token", GITHUB_TOKEN)
                .with("script", script_body("check_skip_if_no_match.cjs")),
        );
        checks.push(Check {
            step_id: "check_skip_if_no_match",
            output: "skip_no_match_check_ok",
        });
    }

    if let Some(activated) = conjunction(
        checks
            .iter()
            .map(|check| step_output_equals(check.step_id, check.output, "true")),
    ) {
        job = job.output(ACTIVATED_OUTPUT, wrap_expression_template(&activated.render()));
    }

    // stop-time and skip queries must run for every event
    let only_permission_check = permission_check && checks.len() == 1;
    let has_skip_condition = if only_permission_check {
        let condition = skip_condition(data);
        job = job.if_condition(condition);
        true
    } else {
        false
    };

    log::debug!(
        "Pre-activation job with {} check(s), skip condition: {}",
        checks.len(),
        has_skip_condition
    );

    Ok(Some(PreActivation {
        job,
        has_skip_condition,
    }))
}

/// Safe events skip the membership check. `workflow_dispatch` is skipped as
/// well when the built-in role list admits `write` collaborators, since only
/// they can dispatch a workflow.
fn skip_condition(data: &WorkflowData) -> String {
    let mut events: Vec<&str> = SAFE_EVENTS.to_vec();
    if data.roles.default_includes_write() && data.has_trigger("workflow_dispatch") {
        events.push("workflow_dispatch");
    }
    conjunction(events.into_iter().map(event_type_not_equals))
        .map(|node| node.render())
        .unwrap_or_default()
}
