// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for pipeline condition expressions
//!
//! Every node renders to the exact text the CI expression language expects.
//! Binary logical nodes always parenthesise both operands so precedence never
//! depends on the reader.

use std::fmt;

/// An opaque expression leaf with an optional human readable description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionNode {
    pub expression: String,
    pub description: Option<String>,
}

impl ExpressionNode {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            description: None,
        }
    }

    pub fn with_description(expression: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            description: Some(description.into()),
        }
    }
}

/// A condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    /// Literal expression text, rendered as-is
    Expression(ExpressionNode),
    /// Logical AND
    And(Box<ConditionNode>, Box<ConditionNode>),
    /// Logical OR
    Or(Box<ConditionNode>, Box<ConditionNode>),
    /// Logical NOT
    Not(Box<ConditionNode>),
    /// Comparison expression: left op right
    Comparison {
        left: Box<ConditionNode>,
        op: ComparisonOp,
        right: Box<ConditionNode>,
    },
    /// Dotted property path such as `github.event_name`
    PropertyAccess(String),
    /// Single-quoted string literal
    StringLiteral(String),
    /// Number kept in its source spelling
    NumberLiteral(String),
    BooleanLiteral(bool),
    /// Function call with ordered arguments
    FunctionCall {
        name: String,
        args: Vec<ConditionNode>,
    },
    /// `contains(array, value)`
    Contains {
        array: Box<ConditionNode>,
        value: Box<ConditionNode>,
    },
    /// `condition ? if_true : if_false`
    Ternary {
        condition: Box<ConditionNode>,
        if_true: Box<ConditionNode>,
        if_false: Box<ConditionNode>,
    },
    /// Flat OR over many terms, optionally rendered one term per line
    Disjunction {
        terms: Vec<ConditionNode>,
        multiline: bool,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Eq => write!(f, "=="),
            ComparisonOp::NotEq => write!(f, "!="),
            ComparisonOp::Gt => write!(f, ">"),
            ComparisonOp::Gte => write!(f, ">="),
            ComparisonOp::Lt => write!(f, "<"),
            ComparisonOp::Lte => write!(f, "<="),
        }
    }
}

impl ConditionNode {
    /// Render the node to its canonical single-line text
    pub fn render(&self) -> String {
        match self {
            ConditionNode::Expression(node) => node.expression.clone(),
            ConditionNode::And(left, right) => {
                format!("({}) && ({})", left.render(), right.render())
            }
            ConditionNode::Or(left, right) => {
                format!("({}) || ({})", left.render(), right.render())
            }
            ConditionNode::Not(child) => format!("!({})", child.render()),
            ConditionNode::Comparison { left, op, right } => {
                format!("{} {} {}", left.render(), op, right.render())
            }
            ConditionNode::PropertyAccess(path) => path.clone(),
            ConditionNode::StringLiteral(value) => format!("'{}'", value),
            ConditionNode::NumberLiteral(value) => value.clone(),
            ConditionNode::BooleanLiteral(value) => value.to_string(),
            ConditionNode::FunctionCall { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.render()).collect();
                format!("{}({})", name, rendered.join(", "))
            }
            ConditionNode::Contains { array, value } => {
                format!("contains({}, {})", array.render(), value.render())
            }
            ConditionNode::Ternary {
                condition,
                if_true,
                if_false,
            } => format!(
                "{} ? {} : {}",
                condition.render(),
                if_true.render(),
                if_false.render()
            ),
            ConditionNode::Disjunction { terms, multiline } => {
                if *multiline {
                    return self.render_multiline();
                }
                match terms.len() {
                    0 => String::new(),
                    1 => terms[0].render(),
                    _ => terms
                        .iter()
                        .map(|t| t.render())
                        .collect::<Vec<_>>()
                        .join(" || "),
                }
            }
        }
    }

    /// Render a disjunction with one term per line and description comments.
    /// Other variants render as with [`ConditionNode::render`].
    pub fn render_multiline(&self) -> String {
        let terms = match self {
            ConditionNode::Disjunction { terms, .. } => terms,
            other => return other.render(),
        };
        match terms.len() {
            0 => return String::new(),
            1 => return terms[0].render(),
            _ => {}
        }

        let mut lines = Vec::with_capacity(terms.len() * 2);
        for (i, term) in terms.iter().enumerate() {
            if let Some(description) = term.description() {
                lines.push(format!("# {}", description));
            }
            let mut line = term.render();
            if i + 1 < terms.len() {
                line.push_str(" ||");
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    /// Description of an expression leaf, if any
    pub fn description(&self) -> Option<&str> {
        match self {
            ConditionNode::Expression(node) => node
                .description
                .as_deref()
                .filter(|description| !description.is_empty()),
            _ => None,
        }
    }

    /// True for the empty disjunction, which renders to nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, ConditionNode::Disjunction { terms, .. } if terms.is_empty())
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<ExpressionNode> for ConditionNode {
    fn from(node: ExpressionNode) -> Self {
        ConditionNode::Expression(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> ConditionNode {
        ConditionNode::Expression(ExpressionNode::new(text))
    }

    #[test]
    fn test_comparison_op_display() {
        assert_eq!(format!("{}", ComparisonOp::Eq), "==");
        assert_eq!(format!("{}", ComparisonOp::NotEq), "!=");
        assert_eq!(format!("{}", ComparisonOp::Gt), ">");
        assert_eq!(format!("{}", ComparisonOp::Gte), ">=");
        assert_eq!(format!("{}", ComparisonOp::Lt), "<");
        assert_eq!(format!("{}", ComparisonOp::Lte), "<=");
    }

    #[test]
    fn test_and_or_not_render() {
        let and = ConditionNode::And(Box::new(leaf("a")), Box::new(leaf("b")));
        assert_eq!(and.render(), "(a) && (b)");

        let or = ConditionNode::Or(Box::new(leaf("a")), Box::new(leaf("b")));
        assert_eq!(or.render(), "(a) || (b)");

        let not = ConditionNode::Not(Box::new(leaf("a")));
        assert_eq!(not.render(), "!(a)");
    }

    #[test]
    fn test_comparison_render_has_no_parens() {
        let node = ConditionNode::Comparison {
            left: Box::new(ConditionNode::PropertyAccess("github.event_name".to_string())),
            op: ComparisonOp::Eq,
            right: Box::new(ConditionNode::StringLiteral("issues".to_string())),
        };
        assert_eq!(node.render(), "github.event_name == 'issues'");
    }

    #[test]
    fn test_literal_render() {
        assert_eq!(ConditionNode::StringLiteral("x".to_string()).render(), "'x'");
        assert_eq!(ConditionNode::NumberLiteral("42".to_string()).render(), "42");
        assert_eq!(ConditionNode::BooleanLiteral(true).render(), "true");
        assert_eq!(ConditionNode::BooleanLiteral(false).render(), "false");
        assert_eq!(
            ConditionNode::PropertyAccess("needs.agent.result".to_string()).render(),
            "needs.agent.result"
        );
    }

    #[test]
    fn test_function_call_render() {
        let empty = ConditionNode::FunctionCall {
            name: "cancelled".to_string(),
            args: vec![],
        };
        assert_eq!(empty.render(), "cancelled()");

        let call = ConditionNode::FunctionCall {
            name: "startsWith".to_string(),
            args: vec![
                ConditionNode::PropertyAccess("github.ref".to_string()),
                ConditionNode::StringLiteral("refs/tags/".to_string()),
            ],
        };
        assert_eq!(call.render(), "startsWith(github.ref, 'refs/tags/')");
    }

    #[test]
    fn test_contains_and_ternary_render() {
        let contains = ConditionNode::Contains {
            array: Box::new(ConditionNode::PropertyAccess("labels".to_string())),
            value: Box::new(ConditionNode::StringLiteral("bug".to_string())),
        };
        assert_eq!(contains.render(), "contains(labels, 'bug')");

        let ternary = ConditionNode::Ternary {
            condition: Box::new(leaf("a == b")),
            if_true: Box::new(ConditionNode::StringLiteral("yes".to_string())),
            if_false: Box::new(ConditionNode::StringLiteral("no".to_string())),
        };
        assert_eq!(ternary.render(), "a == b ? 'yes' : 'no'");
    }

    #[test]
    fn test_disjunction_single_line() {
        let empty = ConditionNode::Disjunction {
            terms: vec![],
            multiline: false,
        };
        assert_eq!(empty.render(), "");
        assert!(empty.is_empty());

        let one = ConditionNode::Disjunction {
            terms: vec![leaf("a")],
            multiline: false,
        };
        assert_eq!(one.render(), "a");

        let many = ConditionNode::Disjunction {
            terms: vec![leaf("a"), leaf("b"), leaf("c")],
            multiline: false,
        };
        assert_eq!(many.render(), "a || b || c");
    }

    #[test]
    fn test_disjunction_multiline_with_descriptions() {
        let node = ConditionNode::Disjunction {
            terms: vec![
                ConditionNode::Expression(ExpressionNode::with_description(
                    "github.event_name == 'issues'",
                    "Issue events",
                )),
                leaf("github.event_name == 'push'"),
                ConditionNode::Expression(ExpressionNode::with_description(
                    "github.event_name == 'schedule'",
                    "Scheduled runs",
                )),
            ],
            multiline: true,
        };
        let expected = "# Issue events\n\
                        github.event_name == 'issues' ||\n\
                        github.event_name == 'push' ||\n\
                        # Scheduled runs\n\
                        github.event_name == 'schedule'";
        assert_eq!(node.render(), expected);
    }

    #[test]
    fn test_empty_description_is_not_emitted() {
        let node = ConditionNode::Disjunction {
            terms: vec![
                ConditionNode::Expression(ExpressionNode::with_description("a", "")),
                leaf("b"),
            ],
            multiline: true,
        };
        assert_eq!(node.render(), "a ||\nb");
    }

    #[test]
    fn test_display_matches_render() {
        let node = ConditionNode::Not(Box::new(leaf("cancelled()")));
        assert_eq!(format!("{}", node), node.render());
    }
}
