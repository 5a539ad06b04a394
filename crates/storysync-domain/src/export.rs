//! Render board items back into single-story markdown files.
//!
//! Fresh files get the canonical template. Existing files are merged:
//! only the status value and the description body are spliced in place,
//! every other hand-authored section stays byte-identical. Writes are
//! idempotent, a file already in sync comes back with `changed = false`.

use crate::board::BoardItem;
use crate::markdown::MarkdownSurface;
use crate::parser::{normalize_key, strip_story_prefix};

const NO_DESCRIPTION: &str = "No description provided.";

pub struct StoryExporter<'a> {
    md: &'a dyn MarkdownSurface,
}

impl<'a> StoryExporter<'a> {
    pub fn new(md: &'a dyn MarkdownSurface) -> Self {
        Self { md }
    }

    /// Produce the file content for one board item. `column_name` supplies
    /// the status when the item carries none. Returns the new content and
    /// whether it differs from `existing`.
    pub fn export_item(
        &self,
        item: &BoardItem,
        column_name: &str,
        existing: Option<&str>,
    ) -> (String, bool) {
        let status = effective_status(item, column_name);
        let description = clean_body(&item.body);

        match existing {
            None => (render(item, status, &description), true),
            Some(existing) => self.merge(existing, status, &description),
        }
    }

    fn merge(&self, existing: &str, status: &str, description: &str) -> (String, bool) {
        let mut lines: Vec<String> = existing.split('\n').map(str::to_string).collect();
        let headings = self.md.headings(existing);

        // 0-based (heading line, exclusive section end) per section
        let mut status_sec: Option<(usize, usize)> = None;
        let mut desc_sec: Option<(usize, usize)> = None;
        let mut title_fix: Option<(usize, String)> = None;

        for (index, heading) in headings.iter().enumerate() {
            let start = heading.line - 1;
            let end = headings
                .iter()
                .skip(index + 1)
                .find(|next| next.level <= 3)
                .map(|next| next.line - 1)
                .unwrap_or(lines.len());

            match heading.level {
                2 => {
                    // a `Story: Story: ...` title must collapse to one prefix
                    if title_fix.is_none() {
                        if let Some(rest) = strip_story_prefix(&heading.text) {
                            if strip_story_prefix(rest).is_some() {
                                title_fix = Some((start, display_title(&heading.text)));
                            }
                        }
                    }
                }
                3 => match normalize_key(&heading.text).as_str() {
                    "status" if status_sec.is_none() => status_sec = Some((start, end)),
                    "description" if desc_sec.is_none() => desc_sec = Some((start, end)),
                    _ => {}
                },
                _ => {}
            }
        }

        let current_status = status_sec.and_then(|(start, end)| {
            lines[start + 1..end]
                .iter()
                .find(|line| !line.trim().is_empty())
                .map(|line| line.trim().to_string())
        });
        let current_description =
            desc_sec.map(|(start, end)| lines[start + 1..end].join("\n").trim().to_string());

        let status_in_sync = current_status.as_deref() == Some(status);
        let description_in_sync = current_description.as_deref() == Some(description);

        if status_in_sync && description_in_sync && title_fix.is_none() {
            return (existing.to_string(), false);
        }

        // collect non-overlapping line edits, apply back to front
        let mut edits: Vec<(usize, usize, Vec<String>)> = Vec::new();

        if let Some((line, title)) = title_fix {
            edits.push((line, line + 1, vec![format!("## Story: {title}")]));
        }

        // sections absent from the file get appended instead of spliced
        let mut appended: Vec<String> = Vec::new();

        if !status_in_sync {
            match status_sec {
                Some((start, end)) => {
                    match (start + 1..end).find(|&i| !lines[i].trim().is_empty()) {
                        Some(i) => edits.push((i, i + 1, vec![status.to_string()])),
                        None => edits.push((
                            start + 1,
                            start + 1,
                            vec![String::new(), status.to_string()],
                        )),
                    }
                }
                None => appended.extend(section_lines("### Status", status)),
            }
        }

        if !description_in_sync {
            match desc_sec {
                Some((start, end)) => {
                    let mut replacement = vec![String::new()];
                    replacement.extend(description.split('\n').map(str::to_string));
                    replacement.push(String::new());
                    edits.push((start + 1, end, replacement));
                }
                None => match status_sec {
                    Some((_, end)) if appended.is_empty() => {
                        let at = rewind_blank_lines(&lines, end);
                        let mut replacement = vec![String::new()];
                        replacement.extend(section_lines("### Description", description));
                        edits.push((at, end, replacement));
                    }
                    _ => appended.extend(section_lines("### Description", description)),
                },
            }
        }

        if !appended.is_empty() {
            let at = rewind_blank_lines(&lines, lines.len());
            let mut replacement = vec![String::new()];
            replacement.extend(appended);
            edits.push((at, lines.len(), replacement));
        }

        edits.sort_by(|a, b| b.0.cmp(&a.0));
        for (start, end, replacement) in edits {
            lines.splice(start..end, replacement);
        }

        (lines.join("\n"), true)
    }
}

/// File name for an item: `<story-id>-<title>` slugified, `.md` suffix.
pub fn file_name_for(item: &BoardItem) -> String {
    let base = match &item.story_id {
        Some(id) => format!("{id}-{}", item.title),
        None => item.title.clone(),
    };

    let mut slug = String::new();
    for c in base.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        "untitled-story.md".to_string()
    } else {
        format!("{slug}.md")
    }
}

fn render(item: &BoardItem, status: &str, description: &str) -> String {
    let mut content = format!("## Story: {}\n\n", display_title(&item.title));
    if let Some(id) = &item.story_id {
        content.push_str(&format!("### Story ID\n\n{id}\n\n"));
    }
    content.push_str(&format!("### Status\n\n{status}\n\n"));
    content.push_str(&format!("### Description\n\n{description}\n\n"));
    content
}

fn effective_status<'b>(item: &'b BoardItem, column_name: &'b str) -> &'b str {
    if item.status.trim().is_empty() {
        column_name
    } else {
        item.status.trim()
    }
}

/// Title with every accumulated `Story:` prefix removed.
fn display_title(title: &str) -> String {
    let mut rest = title.trim();
    while let Some(stripped) = strip_story_prefix(rest) {
        rest = stripped;
    }
    rest.to_string()
}

/// Item body as it appears in the description section: sync bookkeeping
/// lines (`story id:`, `description:`) are dropped so they never round-trip
/// into the file.
fn clean_body(body: &str) -> String {
    if body.trim().is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !is_marker_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_marker_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(colon) = trimmed.find(':') else {
        return false;
    };
    matches!(
        normalize_key(&trimmed[..colon]).as_str(),
        "storyid" | "description"
    )
}

/// Step `at` back over a trailing run of blank lines.
fn rewind_blank_lines(lines: &[String], mut at: usize) -> usize {
    while at > 0 && lines[at - 1].trim().is_empty() {
        at -= 1;
    }
    at
}

fn section_lines(header: &str, value: &str) -> Vec<String> {
    let mut lines = vec![header.to_string(), String::new()];
    lines.extend(value.split('\n').map(str::to_string));
    lines.push(String::new());
    lines
}
