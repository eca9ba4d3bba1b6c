//! Rendering helpers for the text output surface.
//!
//! svn output (checkout listings, diffs) can run to thousands of lines;
//! these helpers keep the terminal rendering bounded without losing signal.

use std::collections::BTreeMap;

/// Bound possibly-long command output: keep the first `max_lines` lines,
/// truncate each to `max_chars`, and note what was elided.
pub fn bounded_output(text: &str, max_lines: usize, max_chars: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut shown: Vec<String> = lines
        .iter()
        .take(max_lines)
        .map(|l| truncate_chars(l, max_chars))
        .collect();
    if lines.len() > max_lines {
        shown.push(format!("... ({} more lines)", lines.len() - max_lines));
    }
    shown.join("\n")
}

fn truncate_chars(line: &str, max_chars: usize) -> String {
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Render the changes map as indented `key: value` lines.
pub fn render_changes(changes: &BTreeMap<String, String>) -> String {
    changes
        .iter()
        .map(|(key, value)| format!("  {}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_passes_through() {
        assert_eq!(bounded_output("At revision 105.", 5, 80), "At revision 105.");
    }

    #[test]
    fn long_output_is_bounded_with_elision_note() {
        let text = (0..10).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let bounded = bounded_output(&text, 3, 80);
        assert!(bounded.starts_with("line 0\nline 1\nline 2"));
        assert!(bounded.ends_with("(7 more lines)"));
    }

    #[test]
    fn wide_lines_are_truncated() {
        let bounded = bounded_output("abcdefgh", 5, 4);
        assert_eq!(bounded, "abcd...");
    }

    #[test]
    fn changes_render_sorted_and_indented() {
        let mut changes = BTreeMap::new();
        changes.insert("revision".to_string(), "100 => 105".to_string());
        changes.insert("new".to_string(), "http://example/repo/trunk".to_string());
        assert_eq!(
            render_changes(&changes),
            "  new: http://example/repo/trunk\n  revision: 100 => 105"
        );
    }
}
