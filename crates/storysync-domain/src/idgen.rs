//! Deterministic id suggestions for stories missing a `story id:` line.
//!
//! This is an offline aid: it never edits anything, it only reports
//! where an id line could be inserted and what the id should be. Running
//! it twice on the same document yields the same suggestions.

use crate::parser::{normalize_key, parse_field_line, story_start};
use serde::Serialize;

/// One suggested insertion. `line` is the 1-based line before which the
/// `story id:` line belongs (one past the last line for the final story).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdPatch {
    pub title: String,
    pub suggested_id: String,
    pub file: String,
    pub line: usize,
}

/// Derive a stable id from a story title: lowercased, runs of characters
/// outside `[a-z0-9._-]` become a single hyphen, edge hyphens dropped.
pub fn deterministic_id(title: &str) -> String {
    let mut id = String::new();
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_') {
            id.push(c);
        } else if !id.ends_with('-') {
            id.push('-');
        }
    }
    id.trim_matches('-').to_string()
}

/// Scan a multi-story document for `- Story:` entries with no id and
/// suggest one per missing story.
pub fn suggest_ids(content: &str, file: &str) -> Vec<IdPatch> {
    let lines: Vec<&str> = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut patches = Vec::new();
    let mut current: Option<String> = None;
    let mut has_id = false;

    for (index, line) in lines.iter().enumerate() {
        if let Some(title) = story_start(line) {
            if let Some(open) = current.take() {
                if !has_id {
                    patches.push(patch(open, file, index + 1));
                }
            }
            current = Some(title);
            has_id = false;
            continue;
        }

        if current.is_some() {
            if let Some(field) = parse_field_line(line) {
                if normalize_key(field.key) == "storyid" {
                    has_id = !field.value.is_empty();
                }
            }
        }
    }

    if let Some(open) = current {
        if !has_id {
            patches.push(patch(open, file, lines.len() + 1));
        }
    }

    patches
}

fn patch(title: String, file: &str, line: usize) -> IdPatch {
    IdPatch {
        suggested_id: deterministic_id(&title),
        title,
        file: file.to_string(),
        line,
    }
}
