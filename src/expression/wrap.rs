// SPDX-License-Identifier: MIT

//! Reflow of long rendered expressions
//!
//! Lines are only ever split at whitespace outside quoted strings, so
//! joining the produced lines with single spaces gives back the original
//! expression up to whitespace normalization.

/// Soft limit for a single line of a wrapped expression
pub const MAX_EXPRESSION_LINE_LENGTH: usize = 120;

/// Collapse every whitespace run to one space and trim both ends
pub fn normalize_expression_for_comparison(expression: &str) -> String {
    expression.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a long expression at top-level `||` / `&&` boundaries.
/// Lines that are still too long are split further with
/// [`break_at_parentheses`].
pub fn break_long_expression(expression: &str) -> Vec<String> {
    let trimmed = expression.trim();
    if fits(trimmed) {
        return vec![trimmed.to_string()];
    }

    let segments = split_at_break_points(trimmed, BreakMode::TopLevelOperators);
    pack_segments(segments)
        .into_iter()
        .flat_map(|line| {
            if fits(&line) {
                vec![line]
            } else {
                break_at_parentheses(&line)
            }
        })
        .collect()
}

/// Split a long expression at operator boundaries at any nesting depth and
/// just inside parenthesis groups.
pub fn break_at_parentheses(expression: &str) -> Vec<String> {
    let trimmed = expression.trim();
    if fits(trimmed) {
        return vec![trimmed.to_string()];
    }
    pack_segments(split_at_break_points(trimmed, BreakMode::AnyDepth))
}

fn fits(line: &str) -> bool {
    line.chars().count() <= MAX_EXPRESSION_LINE_LENGTH
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BreakMode {
    TopLevelOperators,
    AnyDepth,
}

/// Split at whitespace runs that qualify as break points for `mode`
fn split_at_break_points(expression: &str, mode: BreakMode) -> Vec<String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                i += 1;
            }
            '(' => {
                depth += 1;
                i += 1;
            }
            ')' => {
                depth -= 1;
                i += 1;
            }
            c if c.is_whitespace() => {
                let run_start = i;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                if is_break_point(&chars, run_start, i, depth, mode) {
                    let segment: String = chars[segment_start..run_start].iter().collect();
                    segments.push(segment.trim().to_string());
                    segment_start = i;
                }
            }
            _ => i += 1,
        }
    }

    let tail: String = chars[segment_start.min(chars.len())..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        segments.push(tail.to_string());
    }
    segments.retain(|s| !s.is_empty());
    segments
}

/// Whitespace run `[start, end)` is a break point
fn is_break_point(chars: &[char], start: usize, end: usize, depth: i32, mode: BreakMode) -> bool {
    if start == 0 || end >= chars.len() {
        return false;
    }
    let after_operator = start >= 2
        && matches!(
            (chars[start - 2], chars[start - 1]),
            ('|', '|') | ('&', '&')
        );
    match mode {
        BreakMode::TopLevelOperators => depth == 0 && after_operator,
        BreakMode::AnyDepth => after_operator || chars[start - 1] == '(' || chars[end] == ')',
    }
}

/// Greedily join segments into lines no longer than the limit
fn pack_segments(segments: Vec<String>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for segment in segments {
        if current.is_empty() {
            current = segment;
        } else if current.chars().count() + 1 + segment.chars().count() <= MAX_EXPRESSION_LINE_LENGTH
        {
            current.push(' ');
            current.push_str(&segment);
        } else {
            lines.push(std::mem::take(&mut current));
            current = segment;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::builders::{disjunction, event_type_equals, safe_output_type};

    fn assert_round_trip(original: &str, lines: &[String]) {
        assert_eq!(
            normalize_expression_for_comparison(&lines.join(" ")),
            normalize_expression_for_comparison(original)
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize_expression_for_comparison("  a ==\n   'b'  &&\tc  "),
            "a == 'b' && c"
        );
    }

    #[test]
    fn test_short_expression_unchanged() {
        let lines = break_long_expression("github.event_name == 'issues'");
        assert_eq!(lines, vec!["github.event_name == 'issues'"]);
    }

    #[test]
    fn test_break_long_disjunction() {
        let events = [
            "issues",
            "issue_comment",
            "pull_request",
            "pull_request_review_comment",
            "discussion",
            "discussion_comment",
        ];
        let node = disjunction(events.iter().map(|e| event_type_equals(e)).collect(), false);
        let rendered = node.render();
        let lines = break_long_expression(&rendered);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= MAX_EXPRESSION_LINE_LENGTH, "{}", line);
        }
        assert!(lines[0].ends_with("||"));
        assert_round_trip(&rendered, &lines);
    }

    #[test]
    fn test_break_nested_groups() {
        let rendered = disjunction(
            vec![
                safe_output_type("create_issue"),
                safe_output_type("add_comment"),
                safe_output_type("create_discussion"),
            ],
            false,
        )
        .render();
        let lines = break_long_expression(&rendered);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= MAX_EXPRESSION_LINE_LENGTH, "{}", line);
        }
        assert_round_trip(&rendered, &lines);
    }

    #[test]
    fn test_never_splits_inside_quotes() {
        let quoted = "'this string has && and || inside it and is long enough to matter when wrapping lines'";
        let expression = format!(
            "github.event.comment.body == {} || github.event.issue.body == {}",
            quoted, quoted
        );
        let lines = break_long_expression(&expression);
        assert_round_trip(&expression, &lines);
        for line in &lines {
            let quotes = line.chars().filter(|c| *c == '\'').count();
            assert_eq!(quotes % 2, 0, "line splits a quoted string: {}", line);
        }
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let expression = format!(
            "{} || github.event.comment.body == 'it\\'s && fine' || {}",
            "a".repeat(60),
            "b".repeat(60)
        );
        let lines = break_long_expression(&expression);
        assert_round_trip(&expression, &lines);
        assert!(lines.iter().any(|l| l.contains("'it\\'s && fine'")));
    }

    #[test]
    fn test_break_at_parentheses_round_trip() {
        let inner = (0..8)
            .map(|i| format!("github.event.label.name == 'label-number-{}'", i))
            .collect::<Vec<_>>()
            .join(" || ");
        let expression = format!("(github.event_name == 'issues') && ({})", inner);
        let lines = break_at_parentheses(&expression);
        assert!(lines.len() > 1);
        assert_round_trip(&expression, &lines);
    }

    #[test]
    fn test_unbreakable_expression_is_kept_whole() {
        let expression = "x".repeat(200);
        assert_eq!(break_long_expression(&expression), vec![expression.clone()]);
    }

    #[test]
    fn test_compact_operators_without_spaces_are_not_split() {
        let expression = format!("{}&&{}", "a".repeat(80), "b".repeat(80));
        let lines = break_long_expression(&expression);
        assert_eq!(lines, vec![expression]);
    }
}
