// SPDX-License-Identifier: MIT

//! Extraction of `needs.<job>` references from expressions and text

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\{(.*?)\}\}").expect("valid template pattern"));

static NEEDS_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bneeds\.([A-Za-z_][A-Za-z0-9_-]*)\.").expect("valid needs reference pattern")
});

/// Jobs referenced as `needs.<job>.` anywhere in `text`
pub fn needs_references(text: &str) -> BTreeSet<String> {
    collect(&NEEDS_REFERENCE, text)
}

/// Bodies of the `${{ ... }}` templates in `text`. Text outside a template
/// is never evaluated by the runner.
pub fn template_expressions(text: &str) -> impl Iterator<Item = &str> {
    TEMPLATE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Jobs referenced inside the `${{ ... }}` templates of `text`
pub fn template_needs_references(text: &str) -> BTreeSet<String> {
    template_expressions(text)
        .flat_map(|expression| collect(&NEEDS_REFERENCE, expression))
        .collect()
}

fn collect(pattern: &Regex, text: &str) -> BTreeSet<String> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
