// SPDX-License-Identifier: MIT

//! Recursive-descent parser for flat boolean expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! OR      := AND ('||' AND)*
//! AND     := UNARY ('&&' UNARY)*
//! UNARY   := '!' UNARY | PRIMARY
//! PRIMARY := '(' OR ')' | LITERAL
//! ```
//!
//! Literals are opaque: `github.event_name == 'issues'` becomes a single
//! expression leaf. Quoted strings, `!=` and function call argument lists
//! stay inside the literal.

use super::ast::{ConditionNode, ExpressionNode};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Literal(String),
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
}

impl TokenKind {
    fn text(&self) -> String {
        match self {
            TokenKind::Literal(text) => text.clone(),
            TokenKind::And => "&&".to_string(),
            TokenKind::Or => "||".to_string(),
            TokenKind::Not => "!".to_string(),
            TokenKind::LeftParen => "(".to_string(),
            TokenKind::RightParen => ")".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

/// Parse a boolean expression string into a condition tree
pub fn parse(input: &str) -> Result<ConditionNode, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(match token.kind {
            TokenKind::RightParen => ParseError::UnexpectedClosingParen {
                position: token.position,
            },
            _ => ParseError::UnexpectedToken {
                token: token.kind.text(),
                position: token.position,
            },
        });
    }

    Ok(node)
}

/// Walk the tree depth-first, left to right, calling `visitor` on every
/// expression leaf. The first error returned by the visitor stops the walk
/// and is returned unchanged.
pub fn visit_expression_tree<E, F>(node: &ConditionNode, visitor: &mut F) -> Result<(), E>
where
    F: FnMut(&ExpressionNode) -> Result<(), E>,
{
    match node {
        ConditionNode::Expression(leaf) => visitor(leaf),
        ConditionNode::And(left, right) | ConditionNode::Or(left, right) => {
            visit_expression_tree(left, visitor)?;
            visit_expression_tree(right, visitor)
        }
        ConditionNode::Not(child) => visit_expression_tree(child, visitor),
        ConditionNode::Comparison { left, right, .. } => {
            visit_expression_tree(left, visitor)?;
            visit_expression_tree(right, visitor)
        }
        ConditionNode::FunctionCall { args, .. } => {
            for arg in args {
                visit_expression_tree(arg, visitor)?;
            }
            Ok(())
        }
        ConditionNode::Contains { array, value } => {
            visit_expression_tree(array, visitor)?;
            visit_expression_tree(value, visitor)
        }
        ConditionNode::Ternary {
            condition,
            if_true,
            if_false,
        } => {
            visit_expression_tree(condition, visitor)?;
            visit_expression_tree(if_true, visitor)?;
            visit_expression_tree(if_false, visitor)
        }
        ConditionNode::Disjunction { terms, .. } => {
            for term in terms {
                visit_expression_tree(term, visitor)?;
            }
            Ok(())
        }
        ConditionNode::PropertyAccess(_)
        | ConditionNode::StringLiteral(_)
        | ConditionNode::NumberLiteral(_)
        | ConditionNode::BooleanLiteral(_) => Ok(()),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = match (c, next) {
            ('(', _) => Some((TokenKind::LeftParen, 1)),
            (')', _) => Some((TokenKind::RightParen, 1)),
            ('&', Some('&')) => Some((TokenKind::And, 2)),
            ('|', Some('|')) => Some((TokenKind::Or, 2)),
            ('!', next) if next != Some('=') => Some((TokenKind::Not, 1)),
            _ => None,
        };

        match kind {
            Some((kind, width)) => {
                tokens.push(Token { kind, position: i });
                i += width;
            }
            None => {
                let (text, end) = scan_literal(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Literal(text),
                    position: i,
                });
                i = end;
            }
        }
    }

    Ok(tokens)
}

/// Scan a literal starting at `start`; returns the trimmed text and the
/// index of the first character after it.
fn scan_literal(chars: &[char], start: usize) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            '\'' | '"' => {
                let end = skip_quoted(chars, i)?;
                text.extend(&chars[i..end]);
                i = end;
            }
            '(' => {
                let is_call = text
                    .chars()
                    .last()
                    .is_some_and(|prev| prev.is_alphanumeric() || prev == '_');
                if !is_call {
                    break;
                }
                let end = skip_call_arguments(chars, i)?;
                text.extend(&chars[i..end]);
                i = end;
            }
            ')' => break,
            '&' if next == Some('&') => break,
            '|' if next == Some('|') => break,
            '!' if next != Some('=') => break,
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    Ok((text.trim().to_string(), i))
}

/// Returns the index just past the closing quote
fn skip_quoted(chars: &[char], start: usize) -> Result<usize, ParseError> {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(ParseError::UnterminatedString { position: start })
}

/// Returns the index just past the `)` matching the `(` at `start`
fn skip_call_arguments(chars: &[char], start: usize) -> Result<usize, ParseError> {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '(' => {
                depth += 1;
                i += 1;
            }
            ')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            '\'' | '"' => i = skip_quoted(chars, i)?,
            _ => i += 1,
        }
    }
    Err(ParseError::MissingClosingParen { position: start })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<ConditionNode, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = ConditionNode::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ConditionNode, ParseError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = ConditionNode::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ConditionNode, ParseError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Not)) {
            self.advance();
            let child = self.parse_unary()?;
            return Ok(ConditionNode::Not(Box::new(child)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ConditionNode, ParseError> {
        let token = match self.peek().cloned() {
            Some(token) => token,
            None => return Err(self.missing_operand()),
        };

        match token.kind {
            TokenKind::Literal(text) => {
                self.advance();
                Ok(ConditionNode::Expression(ExpressionNode::new(text)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RightParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(ParseError::UnexpectedToken {
                        token: other.kind.text(),
                        position: other.position,
                    }),
                    None => Err(ParseError::MissingClosingParen {
                        position: token.position,
                    }),
                }
            }
            TokenKind::And | TokenKind::Or => Err(ParseError::MissingOperand {
                operator: token.kind.text(),
                position: token.position,
            }),
            TokenKind::RightParen => {
                // `(` directly followed by `)` or an operator before `)`
                match self.previous_operator() {
                    Some(prev) => Err(ParseError::MissingOperand {
                        operator: prev.kind.text(),
                        position: prev.position,
                    }),
                    None => Err(ParseError::UnexpectedClosingParen {
                        position: token.position,
                    }),
                }
            }
            TokenKind::Not => unreachable!("handled by parse_unary"),
        }
    }

    fn previous_operator(&self) -> Option<&Token> {
        let prev = self.tokens.get(self.pos.checked_sub(1)?)?;
        match prev.kind {
            TokenKind::And | TokenKind::Or | TokenKind::Not => Some(prev),
            _ => None,
        }
    }

    /// Error for running out of tokens where an operand was expected
    fn missing_operand(&self) -> ParseError {
        match self.previous_operator() {
            Some(prev) => ParseError::MissingOperand {
                operator: prev.kind.text(),
                position: prev.position,
            },
            None => ParseError::Empty,
        }
    }
}
