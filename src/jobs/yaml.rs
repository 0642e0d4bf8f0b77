// SPDX-License-Identifier: MIT

//! Small YAML emitting helpers shared by jobs and steps

use crate::expression::{break_long_expression, MAX_EXPRESSION_LINE_LENGTH};
use once_cell::sync::Lazy;
use regex::Regex;

/// Plain scalars a YAML 1.1 reader resolves to numbers: decimals with `_`
/// separators, hex and octal, sexagesimals, `.inf` and `.nan`
static NUMBER_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.?[0-9][0-9A-Za-z_.:+-]*|\.(inf|Inf|INF|nan|NaN|NAN))$")
        .expect("valid number pattern")
});

/// Render a single-line `value` as a plain scalar, single-quoting it when
/// YAML would read it as something other than the same string. Multi-line
/// values go through [`entry`], which emits a literal block.
pub fn scalar(value: &str) -> String {
    if needs_quotes(value) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

fn needs_quotes(value: &str) -> bool {
    if value.is_empty() || value.trim() != value {
        return true;
    }
    if value == "~" || matches!(value, "y" | "Y" | "n" | "N") {
        return true;
    }
    if matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off" | "null"
    ) {
        return true;
    }
    if value.parse::<f64>().is_ok() || NUMBER_LIKE.is_match(value) {
        return true;
    }
    let first = value.chars().next().unwrap_or(' ');
    if "!&*-?{}[]|>'\"%@`#,:".contains(first) {
        return true;
    }
    value.contains(": ") || value.contains(" #") || value.ends_with(':') || value.contains('\n')
}

/// `key: value` at `indent` spaces
pub fn entry(indent: usize, key: &str, value: &str) -> String {
    if value.contains('\n') {
        return literal_block(indent, key, value);
    }
    format!("{}{}: {}", pad(indent), key, scalar(value))
}

/// `if:` entry at `indent`. Long expressions and expressions YAML would
/// misread are emitted as a folded block, one wrapped line per row.
pub fn if_entry(indent: usize, expression: &str) -> String {
    let folded = expression.chars().count() > MAX_EXPRESSION_LINE_LENGTH
        || expression.contains('\n')
        || needs_quotes(expression);
    if !folded {
        return format!("{}if: {}", pad(indent), expression);
    }

    let mut out = format!("{}if: >", pad(indent));
    for line in expression.lines() {
        for wrapped in break_long_expression(line) {
            out.push('\n');
            out.push_str(&pad(indent + 2));
            out.push_str(&wrapped);
        }
    }
    out
}

/// Literal block (`key: |`) for multi-line text such as shell scripts.
/// The chomping indicator keeps a single trailing newline or none, and an
/// indentation indicator is added when the text starts with a space.
pub fn literal_block(indent: usize, key: &str, text: &str) -> String {
    if !text.contains('\n') {
        return entry(indent, key, text);
    }
    let indicator = if text.starts_with(' ') { "2" } else { "" };
    let chomping = if text.ends_with('\n') { "" } else { "-" };
    let mut out = format!("{}{}: |{}{}", pad(indent), key, indicator, chomping);
    for line in text.trim_end_matches('\n').lines() {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&pad(indent + 2));
            out.push_str(line);
        }
    }
    out
}

/// Serialize an arbitrary YAML value below `key`
pub fn value_entry(indent: usize, key: &str, value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_) => {
            let body = serde_yaml::to_string(value).unwrap_or_default();
            let mut out = format!("{}{}:", pad(indent), key);
            for line in body.trim_end().lines() {
                out.push('\n');
                out.push_str(&pad(indent + 2));
                out.push_str(line);
            }
            out
        }
        serde_yaml::Value::Null => format!("{}{}:", pad(indent), key),
        other => {
            let body = serde_yaml::to_string(other).unwrap_or_default();
            format!("{}{}: {}", pad(indent), key, body.trim_end())
        }
    }
}

/// Render a YAML value as a list item at `indent`
pub fn list_item(indent: usize, value: &serde_yaml::Value) -> String {
    let body = serde_yaml::to_string(value).unwrap_or_default();
    let mut out = String::new();
    for (i, line) in body.trim_end().lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&pad(indent));
        out.push_str(if i == 0 { "- " } else { "  " });
        out.push_str(line);
    }
    out
}

pub fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::normalize_expression_for_comparison;

    #[test]
    fn test_scalar_quoting() {
        assert_eq!(scalar("ubuntu-latest"), "ubuntu-latest");
        assert_eq!(scalar("${{ secrets.GITHUB_TOKEN }}"), "${{ secrets.GITHUB_TOKEN }}");
        assert_eq!(scalar("true"), "'true'");
        assert_eq!(scalar("10"), "'10'");
        assert_eq!(scalar("0x1F"), "'0x1F'");
        assert_eq!(scalar("1_000"), "'1_000'");
        assert_eq!(scalar(".inf"), "'.inf'");
        assert_eq!(scalar("Yes"), "'Yes'");
        assert_eq!(scalar("v1.2"), "v1.2");
        assert_eq!(scalar("{\"a\":1}"), "'{\"a\":1}'");
        assert_eq!(scalar("it's: here"), "'it''s: here'");
        assert_eq!(scalar(""), "''");
    }

    #[test]
    fn test_short_if_is_inline() {
        assert_eq!(
            if_entry(4, "github.event_name == 'issues'"),
            "    if: github.event_name == 'issues'"
        );
    }

    #[test]
    fn test_negated_if_is_folded() {
        assert_eq!(
            if_entry(4, "!cancelled()"),
            "    if: >\n      !cancelled()"
        );
    }

    #[test]
    fn test_long_if_is_folded_and_round_trips() {
        let expression = (0..6)
            .map(|i| format!("github.event.label.name == 'some-long-label-{}'", i))
            .collect::<Vec<_>>()
            .join(" || ");
        let rendered = if_entry(4, &expression);
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("    if: >"));
        let body: Vec<&str> = lines.collect();
        assert!(body.len() > 1);
        assert!(body.iter().all(|l| l.starts_with("      ")));
        assert_eq!(
            normalize_expression_for_comparison(&body.join(" ")),
            expression
        );
    }

    #[test]
    fn test_literal_block() {
        assert_eq!(
            literal_block(8, "run", "echo one\n\necho two\n"),
            "        run: |\n          echo one\n\n          echo two"
        );
        assert_eq!(literal_block(8, "run", "make"), "        run: make");
        assert_eq!(
            literal_block(8, "run", "  indented\nnext"),
            "        run: |2-\n            indented\n          next"
        );
    }

    #[test]
    fn test_multiline_entry_reads_back_unchanged() {
        for value in ["a\nb", "a\nb\n", "first\n\n  second: x"] {
            let yaml = format!("env:\n{}\n", entry(2, "CFG", value));
            let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(parsed["env"]["CFG"].as_str(), Some(value));
        }
    }

    #[test]
    fn test_quoted_scalars_read_back_as_strings() {
        for value in ["0x1F", "0o17", "1_000", ".inf", "-.nan", "190:20:30", "on", "NULL"] {
            let yaml = format!("{}\n", entry(0, "v", value));
            let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(parsed["v"].as_str(), Some(value), "{}", yaml);
        }
    }

    #[test]
    fn test_list_item() {
        let value: serde_yaml::Value = serde_yaml::from_str("name: Build\nrun: make").unwrap();
        assert_eq!(list_item(6, &value), "      - name: Build\n        run: make");
    }

    #[test]
    fn test_value_entry_mapping() {
        let value: serde_yaml::Value = serde_yaml::from_str("matrix:\n  os: [a, b]").unwrap();
        let rendered = value_entry(4, "strategy", &value);
        assert!(rendered.starts_with("    strategy:\n      matrix:"));
    }
}
