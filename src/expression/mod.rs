// SPDX-License-Identifier: MIT

//! Condition expressions for generated jobs and steps
//!
//! This module provides:
//! - `ConditionNode` - the expression tree and its canonical rendering
//! - `parse` - a parser for flat boolean expression strings
//! - `builders` - constructors for the conditions the compiler emits
//! - `wrap` - reflow of long rendered expressions
//! - `references` - `needs.<job>` reference extraction

mod ast;
pub mod builders;
mod parser;
pub mod references;
pub mod wrap;

pub use ast::{ComparisonOp, ConditionNode, ExpressionNode};
pub use parser::{parse, visit_expression_tree};
pub use references::{needs_references, template_expressions, template_needs_references};
pub use wrap::{
    break_at_parentheses, break_long_expression, normalize_expression_for_comparison,
    MAX_EXPRESSION_LINE_LENGTH,
};

/// Strip a surrounding `${{ ... }}` template wrapper, if present
pub fn unwrap_expression_template(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix("${{")
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// Wrap a rendered expression in `${{ ... }}`
pub fn wrap_expression_template(expression: &str) -> String {
    format!("${{{{ {} }}}}", expression)
}
