// SPDX-License-Identifier: MIT

//! Names shared between the job builders and the generated pipeline

/// Job that checks roles, stop-time and skip queries
pub const PRE_ACTIVATION_JOB: &str = "pre_activation";
/// Job that gates the agent job
pub const ACTIVATION_JOB: &str = "activation";
/// The main agent job
pub const AGENT_JOB: &str = "agent";
/// Consolidated safe output job
pub const SAFE_OUTPUTS_JOB: &str = "safe_outputs";

/// Job names custom jobs may not use
pub const RESERVED_JOB_NAMES: [&str; 4] = [
    PRE_ACTIVATION_JOB,
    ACTIVATION_JOB,
    AGENT_JOB,
    SAFE_OUTPUTS_JOB,
];

/// Output of the pre-activation job consumed by activation
pub const ACTIVATED_OUTPUT: &str = "activated";

/// Events that never need a permission pre-check
pub const SAFE_EVENTS: [&str; 2] = ["schedule", "merge_group"];

/// Role allow-list used when the workflow does not configure one
pub const DEFAULT_ROLES: [&str; 3] = ["admin", "maintainer", "write"];

/// Events that support adding a reaction to the triggering item
pub const REACTION_EVENTS: [&str; 6] = [
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review_comment",
    "discussion",
    "discussion_comment",
];

/// Events whose triggering item is an issue that can be locked
pub const LOCKABLE_EVENTS: [&str; 2] = ["issues", "issue_comment"];

pub const DEFAULT_RUNNER: &str = "ubuntu-latest";

/// Fallback token for safe output handlers
pub const DEFAULT_SAFE_OUTPUTS_TOKEN: &str =
    "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";
/// Fallback token for the privileged project handler
pub const DEFAULT_PROJECT_TOKEN: &str = "${{ secrets.GH_AW_PROJECT_GITHUB_TOKEN }}";
/// Token the control jobs use for read-only API calls
pub const GITHUB_TOKEN: &str = "${{ secrets.GITHUB_TOKEN }}";

/// Directory the generated steps use for scratch files
pub const RUNTIME_DIR: &str = "/tmp/gh-aw";
/// Directory holding the bundled handler scripts on the runner
pub const ACTIONS_DIR: &str = "/tmp/gh-aw/actions";
pub const PROMPT_PATH: &str = "/tmp/gh-aw/aw-prompts/prompt.txt";
pub const SAFE_OUTPUTS_FILE: &str = "/tmp/gh-aw/safeoutputs/outputs.jsonl";
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";
pub const AGENT_OUTPUT_DIR: &str = "/tmp/gh-aw/safeoutputs/";
pub const PATCH_ARTIFACT: &str = "aw.patch";
pub const PATCH_PATH: &str = "/tmp/gh-aw/aw.patch";

/// Actions the generated steps use, as `(repo, version)` pairs to pin
pub const CHECKOUT_ACTION: (&str, &str) = ("actions/checkout", "v5.0.0");
pub const GITHUB_SCRIPT_ACTION: (&str, &str) = ("actions/github-script", "v8");
pub const UPLOAD_ARTIFACT_ACTION: (&str, &str) = ("actions/upload-artifact", "v4.6.2");
pub const DOWNLOAD_ARTIFACT_ACTION: (&str, &str) = ("actions/download-artifact", "v5.0.0");
