//! Line diffs attached to structural mismatches.

use serde_json::Value;
use similar::{ChangeTag, TextDiff};

/// Line-by-line diff of two texts. Removed expected lines start with `-`, added actual lines
/// with `+`, and shared lines are indented.
pub fn generate_diff(expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut lines = Vec::new();
    for change in diff.iter_all_changes() {
        let marker = match change.tag() {
            ChangeTag::Equal => "    ",
            ChangeTag::Delete => "-   ",
            ChangeTag::Insert => "+   ",
        };
        lines.push(format!("{marker}{}", change.value().trim_end_matches(['\r', '\n'])));
    }
    lines.join("\n")
}

/// Diff of two JSON values, pretty-printed.
pub fn generate_json_diff(expected: &Value, actual: &Value) -> String {
    let pretty = |value: &Value| serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    generate_diff(&pretty(expected), &pretty(actual))
}
