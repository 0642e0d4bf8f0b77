// SPDX-License-Identifier: MIT

//! Constructors for the conditions the compiler emits

use super::ast::{ComparisonOp, ConditionNode, ExpressionNode};
use crate::constants::AGENT_JOB;

/// Opaque expression leaf
pub fn expression(text: impl Into<String>) -> ConditionNode {
    ConditionNode::Expression(ExpressionNode::new(text))
}

/// Expression leaf carrying a description for multiline rendering
pub fn described(text: impl Into<String>, description: impl Into<String>) -> ConditionNode {
    ConditionNode::Expression(ExpressionNode::with_description(text, description))
}

pub fn property(path: impl Into<String>) -> ConditionNode {
    ConditionNode::PropertyAccess(path.into())
}

pub fn string_literal(value: impl Into<String>) -> ConditionNode {
    ConditionNode::StringLiteral(value.into())
}

pub fn number_literal(value: impl ToString) -> ConditionNode {
    ConditionNode::NumberLiteral(value.to_string())
}

pub fn boolean_literal(value: bool) -> ConditionNode {
    ConditionNode::BooleanLiteral(value)
}

pub fn and(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode::And(Box::new(left), Box::new(right))
}

pub fn or(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    ConditionNode::Or(Box::new(left), Box::new(right))
}

pub fn not(child: ConditionNode) -> ConditionNode {
    ConditionNode::Not(Box::new(child))
}

pub fn compare(left: ConditionNode, op: ComparisonOp, right: ConditionNode) -> ConditionNode {
    ConditionNode::Comparison {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

pub fn equals(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    compare(left, ComparisonOp::Eq, right)
}

pub fn not_equals(left: ConditionNode, right: ConditionNode) -> ConditionNode {
    compare(left, ComparisonOp::NotEq, right)
}

pub fn function_call(name: impl Into<String>, args: Vec<ConditionNode>) -> ConditionNode {
    ConditionNode::FunctionCall {
        name: name.into(),
        args,
    }
}

pub fn contains(array: ConditionNode, value: ConditionNode) -> ConditionNode {
    ConditionNode::Contains {
        array: Box::new(array),
        value: Box::new(value),
    }
}

pub fn ternary(
    condition: ConditionNode,
    if_true: ConditionNode,
    if_false: ConditionNode,
) -> ConditionNode {
    ConditionNode::Ternary {
        condition: Box::new(condition),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false),
    }
}

pub fn disjunction(terms: Vec<ConditionNode>, multiline: bool) -> ConditionNode {
    ConditionNode::Disjunction { terms, multiline }
}

/// Left fold of `And` over the nodes; `None` when there are no nodes
pub fn conjunction(nodes: impl IntoIterator<Item = ConditionNode>) -> Option<ConditionNode> {
    nodes.into_iter().reduce(and)
}

/// `github.event_name == '<event>'`
pub fn event_type_equals(event: &str) -> ConditionNode {
    equals(property("github.event_name"), string_literal(event))
}

/// `github.event_name != '<event>'`
pub fn event_type_not_equals(event: &str) -> ConditionNode {
    not_equals(property("github.event_name"), string_literal(event))
}

/// `needs.<job>.result == '<result>'`
pub fn job_result_equals(job: &str, result: &str) -> ConditionNode {
    equals(
        property(format!("needs.{}.result", job)),
        string_literal(result),
    )
}

/// `needs.<job>.outputs.<output> == '<value>'`
pub fn job_output_equals(job: &str, output: &str, value: &str) -> ConditionNode {
    equals(
        property(format!("needs.{}.outputs.{}", job, output)),
        string_literal(value),
    )
}

/// `steps.<step>.outputs.<output> == '<value>'`
pub fn step_output_equals(step: &str, output: &str, value: &str) -> ConditionNode {
    equals(
        property(format!("steps.{}.outputs.{}", step, output)),
        string_literal(value),
    )
}

/// `contains(needs.agent.outputs.output_types, '<type>')`
pub fn output_type_present(output_type: &str) -> ConditionNode {
    function_call(
        "contains",
        vec![
            property(format!("needs.{}.outputs.output_types", AGENT_JOB)),
            string_literal(output_type),
        ],
    )
}

/// Gate for a single safe output type: the run is not cancelled, the agent
/// job was not skipped and the agent reported an output of this type.
pub fn safe_output_type(output_type: &str) -> ConditionNode {
    let not_cancelled = not(function_call("cancelled", vec![]));
    let agent_not_skipped = not_equals(
        property(format!("needs.{}.result", AGENT_JOB)),
        string_literal("skipped"),
    );
    and(
        and(not_cancelled, agent_not_skipped),
        output_type_present(output_type),
    )
}

/// Job-level gate shared by every safe output: not cancelled and agent ran
pub fn agent_completed() -> ConditionNode {
    and(
        not(function_call("cancelled", vec![])),
        not_equals(
            property(format!("needs.{}.result", AGENT_JOB)),
            string_literal("skipped"),
        ),
    )
}

/// Rejects `workflow_run` events coming from forks or other repositories
pub fn workflow_run_repo_safety() -> ConditionNode {
    let not_workflow_run = event_type_not_equals("workflow_run");
    let same_repo = equals(
        property("github.event.workflow_run.repository.id"),
        property("github.repository_id"),
    );
    let not_fork = not(property("github.event.workflow_run.repository.fork"));
    or(not_workflow_run, and(same_repo, not_fork))
}

/// Disjunction of `github.event_name == '<e>'` over the given events
pub fn any_event(events: &[&str]) -> ConditionNode {
    disjunction(events.iter().map(|e| event_type_equals(e)).collect(), false)
}
