//! End-to-end compilation of workflow documents
//!
//! Each test compiles a markdown document and checks the shape of the
//! resulting job graph and its rendered pipeline.

use agentic_workflow_compiler::action_pins::ShaResolver;
use agentic_workflow_compiler::compiler::engine::AgentEngine;
use agentic_workflow_compiler::error::{ConfigError, JobGraphError};
use agentic_workflow_compiler::expression::normalize_expression_for_comparison;
use agentic_workflow_compiler::jobs::Step;
use agentic_workflow_compiler::{Compiler, CompilerError, CompilerOptions, WorkflowData};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

fn compiler() -> Compiler {
    let reference = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    Compiler::new(CompilerOptions::default().reference_time(reference))
}

/// Step of a parsed job with the given `name`
fn parsed_step<'a>(job: &'a serde_yaml::Value, name: &str) -> &'a serde_yaml::Value {
    job["steps"]
        .as_sequence()
        .unwrap()
        .iter()
        .find(|step| step["name"].as_str() == Some(name))
        .unwrap()
}

fn job_names(doc: &str) -> Vec<String> {
    let compiled = compiler().compile_markdown(doc).unwrap();
    compiled.jobs.job_names().map(String::from).collect()
}

/// Resolves every action to a fixed SHA
struct FixedResolver;

impl ShaResolver for FixedResolver {
    fn resolve_sha(&self, _repo: &str, _version: &str) -> Option<String> {
        Some("0123456789abcdef0123456789abcdef01234567".to_string())
    }
}

/// Engine that echoes the prompt
struct EchoEngine;

impl AgentEngine for EchoEngine {
    fn id(&self) -> &str {
        "echo"
    }

    fn execution_steps(&self, _data: &WorkflowData) -> Vec<Step> {
        vec![Step::new("Echo prompt").run("cat \"$GH_AW_PROMPT\"")]
    }
}

// ============================================================================
// Control job decisions
// ============================================================================

#[test]
fn test_schedule_only_has_no_control_jobs() {
    let doc = r#"---
name: nightly-report
on:
  schedule:
    - cron: "0 6 * * *"
---
Write a report of yesterday's activity.
"#;
    assert_eq!(job_names(doc), vec!["agent"]);
}

#[test]
fn test_schedule_and_issues_gate_on_pre_activation() {
    let doc = r#"---
name: triage
on:
  schedule:
    - cron: "0 6 * * *"
  issues:
    types: [opened]
---
Triage the issue.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let names: Vec<&str> = compiled.jobs.job_names().collect();
    assert_eq!(names, vec!["activation", "agent", "pre_activation"]);

    let pre = compiled.jobs.get_job("pre_activation").unwrap();
    assert_eq!(
        pre.if_condition.as_deref(),
        Some("(github.event_name != 'schedule') && (github.event_name != 'merge_group')")
    );

    let activation = compiled.jobs.get_job("activation").unwrap();
    assert_eq!(activation.needs, vec!["pre_activation"]);
    let condition = activation.if_condition.as_deref().unwrap();
    assert!(condition.contains("needs.pre_activation.result == 'skipped'"));
    assert!(condition.contains("needs.pre_activation.outputs.activated == 'true'"));

    let agent = compiled.jobs.get_job("agent").unwrap();
    assert_eq!(agent.needs, vec!["activation"]);
    assert!(agent.if_condition.is_none());
}

#[test]
fn test_stop_after_disables_skip_condition() {
    let doc = r#"---
name: triage
on:
  schedule:
    - cron: "0 6 * * *"
  issues:
  stop-after: "+7d"
---
Triage the issue.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let pre = compiled.jobs.get_job("pre_activation").unwrap();
    assert!(pre.if_condition.is_none());

    let stop_step = pre
        .steps
        .iter()
        .find(|step| step.contains("id: check_stop_time"))
        .unwrap();
    assert!(stop_step.contains("GH_AW_STOP_TIME: 2026-01-08 00:00:00"));

    let activation = compiled.jobs.get_job("activation").unwrap();
    assert_eq!(
        activation.if_condition.as_deref(),
        Some("needs.pre_activation.outputs.activated == 'true'")
    );
}

#[test]
fn test_roles_all_skips_pre_activation() {
    let doc = r#"---
name: open-triage
on: issues
roles: all
---
Triage the issue.
"#;
    assert_eq!(job_names(doc), vec!["agent"]);
}

#[test]
fn test_reaction_creates_activation_job() {
    let doc = r#"---
name: responder
on:
  issue_comment:
    types: [created]
  reaction: eyes
roles: all
---
Answer the comment.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let activation = compiled.jobs.get_job("activation").unwrap();
    assert!(activation.needs.is_empty());
    assert!(activation.steps.iter().any(|step| step.contains("id: react")));
    assert!(activation.outputs.contains_key("comment_id"));
}

// ============================================================================
// Custom jobs and references
// ============================================================================

#[test]
fn test_custom_job_referenced_in_prompt_is_direct_dependency() {
    let doc = r#"---
name: research
on: workflow_dispatch
jobs:
  fetch:
    runs-on: ubuntu-latest
    outputs:
      data: ${{ steps.fetch.outputs.data }}
    steps:
      - id: fetch
        run: echo "data=42" >> "$GITHUB_OUTPUT"
---
Summarize ${{ needs.fetch.outputs.data }}.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let agent = compiled.jobs.get_job("agent").unwrap();
    assert_eq!(agent.needs, vec!["activation", "fetch"]);

    let fetch = compiled.jobs.get_job("fetch").unwrap();
    assert_eq!(fetch.needs, vec!["activation"]);

    let order: Vec<&str> = compiled
        .jobs
        .topological_order()
        .unwrap()
        .into_iter()
        .map(|job| job.name.as_str())
        .collect();
    let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
    assert!(position("pre_activation") < position("activation"));
    assert!(position("fetch") < position("agent"));
}

#[test]
fn test_custom_job_result_in_prompt_is_direct_dependency() {
    let doc = r#"---
name: research
on: workflow_dispatch
jobs:
  fetch:
    steps:
      - run: ./fetch.sh
---
Fetch finished with ${{ needs.fetch.result }}.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let agent = compiled.jobs.get_job("agent").unwrap();
    assert_eq!(agent.needs, vec!["activation", "fetch"]);
}

#[test]
fn test_needs_in_prose_and_shell_is_not_a_reference() {
    let doc = r#"---
name: planner
on: schedule
steps:
  - name: Note
    run: echo "the build needs.more.work"
---
The plan needs.more.work before anything ships.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let agent = compiled.jobs.get_job("agent").unwrap();
    assert!(agent.needs.is_empty());
}

#[test]
fn test_user_condition_on_unrelated_job_moves_to_agent() {
    let doc = r#"---
name: gated
on: issues
roles: all
if: ${{ needs.scout.outputs.ready == 'true' }}
jobs:
  scout:
    steps:
      - run: echo ready
---
Do the work.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let agent = compiled.jobs.get_job("agent").unwrap();
    assert_eq!(
        agent.if_condition.as_deref(),
        Some("needs.scout.outputs.ready == 'true'")
    );
    assert!(agent.needs.contains(&"scout".to_string()));
}

#[test]
fn test_reserved_custom_job_name_fails() {
    let doc = r#"---
on: issues
jobs:
  activation:
    steps:
      - run: echo
---
body
"#;
    let err = compiler().compile_markdown(doc).unwrap_err();
    assert!(matches!(
        err,
        CompilerError::Config(ConfigError::ReservedJobName(ref name)) if name == "activation"
    ));
}

#[test]
fn test_dependency_cycle_fails() {
    let doc = r#"---
on: schedule
jobs:
  a:
    needs: b
    steps:
      - run: echo
  b:
    needs: a
    steps:
      - run: echo
---
body
"#;
    let err = compiler().compile_markdown(doc).unwrap_err();
    assert!(matches!(
        err,
        CompilerError::Graph(JobGraphError::CycleDetected(_))
    ));
}

#[test]
fn test_malformed_condition_fails() {
    let doc = r#"---
on: issues
if: (github.event.issue.number > 1
---
body
"#;
    let err = compiler().compile_markdown(doc).unwrap_err();
    assert!(matches!(err, CompilerError::Parse(_)));
}

// ============================================================================
// Safe outputs and strict mode
// ============================================================================

#[test]
fn test_safe_outputs_job_wiring() {
    let doc = r#"---
name: issue-bot
on: issues
safe-outputs:
  create-issue:
    title-prefix: "[bot] "
  add-comment:
  create-pull-request:
---
Fix the bug.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let safe_outputs = compiled.jobs.get_job("safe_outputs").unwrap();
    assert_eq!(safe_outputs.needs, vec!["agent", "activation"]);

    let agent = compiled.jobs.get_job("agent").unwrap();
    assert!(agent.outputs.contains_key("output_types"));
    assert!(agent.outputs.contains_key("has_patch"));

    let yaml = compiled.render_to_yaml().unwrap();
    assert!(yaml.contains("\n  safe_outputs:\n"));
    assert!(yaml.contains("GH_AW_SAFE_OUTPUTS_HANDLER_CONFIG"));
    assert!(yaml.find("\n  agent:\n").unwrap() < yaml.find("\n  safe_outputs:\n").unwrap());
}

#[test]
fn test_strict_mode_rejects_agent_write() {
    let doc = r#"---
on: schedule
strict: true
permissions:
  contents: write
---
body
"#;
    let err = compiler().compile_markdown(doc).unwrap_err();
    assert!(matches!(
        err,
        CompilerError::Config(ConfigError::WritePermissionInStrictMode(ref scope)) if scope == "contents"
    ));
}

#[test]
fn test_strict_mode_requires_project_token() {
    let doc = r#"---
on: schedule
safe-outputs:
  update-project:
---
body
"#;
    let strict = Compiler::new(CompilerOptions::default().strict(true));
    let err = strict.compile_markdown(doc).unwrap_err();
    assert!(matches!(
        err,
        CompilerError::Config(ConfigError::MissingProjectToken(ref kind)) if kind == "update-project"
    ));
    assert!(compiler().compile_markdown(doc).is_ok());
}

// ============================================================================
// Extension points and rendering
// ============================================================================

#[test]
fn test_custom_engine_and_sha_resolver() {
    let doc = "---\nname: echo\non: schedule\n---\nSay hello.\n";
    let compiled = compiler()
        .with_engine(Box::new(EchoEngine))
        .with_sha_resolver(Arc::new(FixedResolver))
        .compile_markdown(doc)
        .unwrap();
    let yaml = compiled.render_to_yaml().unwrap();
    assert!(yaml.contains("- name: Echo prompt"));
    assert!(yaml.contains("actions/checkout@0123456789abcdef0123456789abcdef01234567 # v5.0.0"));
}

#[test]
fn test_rendered_pipeline_header() {
    let doc = r#"---
name: nightly
on:
  schedule:
    - cron: "0 6 * * *"
concurrency:
  group: nightly
---
Report.
"#;
    let yaml = compiler().compile_markdown(doc).unwrap().render_to_yaml().unwrap();
    assert!(yaml.starts_with("# This file was generated by awc."));
    assert!(yaml.contains("\nname: nightly\non:\n  schedule:\n"));
    assert!(yaml.contains("cron:"));
    assert!(yaml.contains("\nconcurrency:\n  group: nightly\n"));
    assert!(yaml.ends_with('\n'));
}

#[test]
fn test_rendered_pipeline_reads_back_unchanged() {
    let doc = r#"---
name: issue-bot
on:
  schedule:
    - cron: "0 6 * * *"
  issues:
    types: [opened]
  reaction: eyes
  stop-after: "+7d"
engine:
  id: custom
  command: ./agent
  env:
    AGENT_CONFIG: "model: large\nretries: 3\n"
    AGENT_BANNER: "  indented\nsecond"
safe-outputs:
  create-issue:
  add-comment:
  create-pull-request:
  push-to-pull-request-branch:
---
Triage the issue.

  Keep this indented line: as is.
Numbers like 0x1F stay text.
"#;
    let compiled = compiler().compile_markdown(doc).unwrap();
    let yaml = compiled.render_to_yaml().unwrap();
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

    for name in compiled.jobs.job_names() {
        let job = compiled.jobs.get_job(name).unwrap();
        let rendered = &parsed["jobs"][name];
        assert!(rendered.is_mapping(), "missing job {}", name);
        if let Some(condition) = &job.if_condition {
            assert_eq!(
                normalize_expression_for_comparison(rendered["if"].as_str().unwrap()),
                normalize_expression_for_comparison(condition),
                "condition of {}",
                name
            );
        }
        let step_conditions: Vec<String> = rendered["steps"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|step| step["if"].as_str())
            .map(normalize_expression_for_comparison)
            .collect();
        for condition in &job.step_conditions {
            assert!(step_conditions.contains(&normalize_expression_for_comparison(condition)));
        }
        for (key, value) in &job.env {
            assert_eq!(rendered["env"][key.as_str()].as_str(), Some(value.as_str()));
        }
        for (key, value) in &job.outputs {
            assert_eq!(rendered["outputs"][key.as_str()].as_str(), Some(value.as_str()));
        }
    }

    assert!(yaml.contains("if: >\n"));
    let checkout = parsed_step(&parsed["jobs"]["safe_outputs"], "Checkout repository");
    assert_eq!(
        normalize_expression_for_comparison(checkout["if"].as_str().unwrap()),
        "contains(needs.agent.outputs.output_types, 'create_pull_request') || \
         contains(needs.agent.outputs.output_types, 'push_to_pull_request_branch')"
    );

    let agent = &parsed["jobs"]["agent"];
    let execute = parsed_step(agent, "Execute custom agent");
    assert_eq!(
        execute["env"]["AGENT_CONFIG"].as_str(),
        Some("model: large\nretries: 3\n")
    );
    assert_eq!(
        execute["env"]["AGENT_BANNER"].as_str(),
        Some("  indented\nsecond")
    );

    let prompt = parsed_step(agent, "Create prompt")["run"].as_str().unwrap();
    assert!(prompt.contains(
        "Triage the issue.\n\n  Keep this indented line: as is.\nNumbers like 0x1F stay text.\n"
    ));
    assert!(prompt.ends_with("\nGH_AW_PROMPT_EOF"));

    let stop = parsed_step(&parsed["jobs"]["pre_activation"], "Check stop-time limit");
    assert_eq!(stop["env"]["GH_AW_STOP_TIME"].as_str(), Some("2026-01-08 00:00:00"));

    let handler = parsed_step(&parsed["jobs"]["safe_outputs"], "Process safe outputs");
    let config: serde_json::Value = serde_json::from_str(
        handler["env"]["GH_AW_SAFE_OUTPUTS_HANDLER_CONFIG"].as_str().unwrap(),
    )
    .unwrap();
    assert!(config["create_issue"].is_object());
    assert!(handler["with"]["script"].as_str().unwrap().ends_with("await main();"));
}
