//! Markdown story parsing.
//!
//! Two input shapes are supported: multi-story documents (`- Story: <title>`
//! list entries under status section headings) and the single-story files
//! the exporter writes (`## Story:` title with `### Story ID` / `### Status`
//! / `### Description` sections).

use crate::markdown::MarkdownSurface;
use crate::status::StatusAliasTable;
use crate::story::{validate_story_id, ParsedStory, SourceLocation, StoryStatus};
use std::collections::HashMap;
use storysync_core::{LogEntry, LogLevel};

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub stories: Vec<ParsedStory>,
    pub warnings: Vec<LogEntry>,
    pub errors: Vec<LogEntry>,
}

pub struct StoryParser<'a> {
    md: &'a dyn MarkdownSurface,
    aliases: StatusAliasTable,
}

struct StoryDraft {
    title: String,
    id: Option<String>,
    status: StoryStatus,
    description: String,
    line: usize,
}

pub(crate) struct FieldLine<'a> {
    pub(crate) indent: usize,
    pub(crate) key: &'a str,
    pub(crate) value: &'a str,
}

impl<'a> StoryParser<'a> {
    pub fn new(md: &'a dyn MarkdownSurface, aliases: StatusAliasTable) -> Self {
        Self { md, aliases }
    }

    /// Parse a multi-story markdown document. Stories missing an id are
    /// dropped with an error; duplicate ids keep the first occurrence and
    /// drop later ones with a warning.
    pub fn parse(&self, text: &str, file_name: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();

        let section_at: HashMap<usize, String> = self
            .md
            .headings(text)
            .into_iter()
            .filter(|heading| heading.level == 2)
            .map(|heading| (heading.line, heading.text))
            .collect();

        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut current_section = StoryStatus::Backlog;
        let mut draft: Option<StoryDraft> = None;
        let mut in_description = false;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];

            if let Some(heading) = section_at.get(&(i + 1)) {
                current_section = self.aliases.resolve_heading(heading);
                flush(&mut draft, &mut in_description, &mut outcome, file_name);
                i += 1;
                continue;
            }

            if let Some(title) = story_start(line) {
                flush(&mut draft, &mut in_description, &mut outcome, file_name);
                draft = Some(StoryDraft {
                    title,
                    id: None,
                    status: current_section.clone(),
                    description: String::new(),
                    line: i + 1,
                });
                i += 1;
                continue;
            }

            if let Some(story) = draft.as_mut() {
                let field = parse_field_line(line);

                if in_description {
                    match field {
                        Some(field) => match normalize_key(field.key).as_str() {
                            "storyid" => {
                                in_description = false;
                                if !field.value.is_empty() {
                                    story.id = Some(field.value.trim().to_string());
                                }
                            }
                            "description" => {
                                if !field.value.is_empty() {
                                    story.description.push_str(field.value);
                                    story.description.push('\n');
                                }
                            }
                            _ if field.indent <= 2 => {
                                // shallow unknown key ends the description;
                                // the line is reprocessed outside it
                                in_description = false;
                                outcome.warnings.push(warning(
                                    format!("Unknown field key \"{}\"", field.key),
                                    file_name,
                                    i + 1,
                                ));
                                continue;
                            }
                            _ => {
                                // deep indent: literal description content
                                story.description.push_str(strip_description_indent(line));
                                story.description.push('\n');
                            }
                        },
                        None => {
                            story.description.push_str(strip_description_indent(line));
                            story.description.push('\n');
                        }
                    }
                } else if let Some(field) = field {
                    match normalize_key(field.key).as_str() {
                        "storyid" => {
                            if !field.value.is_empty() {
                                story.id = Some(field.value.trim().to_string());
                            }
                        }
                        "description" => {
                            in_description = true;
                            if !field.value.is_empty() {
                                story.description.push_str(field.value);
                                story.description.push('\n');
                            }
                        }
                        _ => {}
                    }
                }
            }

            i += 1;
        }

        flush(&mut draft, &mut in_description, &mut outcome, file_name);
        outcome
    }

    /// Parse one exported single-story file into the same record shape.
    /// A missing `### Story ID` section falls back to an id derived from
    /// the file name, so these files never produce a missing-id error.
    pub fn parse_story_file(&self, text: &str, file_name: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let headings = self.md.headings(text);
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut title = String::new();
        let mut title_line = 1;
        let mut status = StoryStatus::Backlog;
        let mut story_id: Option<String> = None;
        let mut description = String::new();

        #[derive(PartialEq)]
        enum Section {
            None,
            StoryId,
            Status,
            Description,
            Other,
        }
        let mut section = Section::None;

        let heading_at: HashMap<usize, (u32, String)> = headings
            .into_iter()
            .map(|h| (h.line, (h.level, h.text)))
            .collect();

        for (index, line) in lines.iter().enumerate() {
            if let Some((level, text)) = heading_at.get(&(index + 1)) {
                match level {
                    2 => {
                        if let Some(rest) = strip_story_prefix(text) {
                            title = rest.to_string();
                            title_line = index + 1;
                        }
                        section = Section::None;
                    }
                    3 => {
                        section = match normalize_key(text).as_str() {
                            "storyid" => Section::StoryId,
                            "status" => Section::Status,
                            "description" => Section::Description,
                            _ => Section::Other,
                        };
                    }
                    _ => section = Section::None,
                }
                continue;
            }

            match section {
                Section::Status => {
                    if !line.trim().is_empty() {
                        status = StoryStatus::from_name(line.trim());
                    }
                }
                Section::StoryId => {
                    if !line.trim().is_empty() {
                        story_id = Some(line.trim().to_string());
                    }
                }
                Section::Description => {
                    description.push_str(line);
                    description.push('\n');
                }
                Section::None | Section::Other => {}
            }
        }

        if title.is_empty() {
            outcome.errors.push(error(
                "Story file has no \"## Story:\" title".to_string(),
                file_name,
                1,
            ));
            return outcome;
        }

        let id = story_id.unwrap_or_else(|| fallback_id(file_name));
        for issue in validate_story_id(&id) {
            outcome
                .warnings
                .push(warning(issue.message(&id), file_name, title_line));
        }

        outcome.stories.push(ParsedStory {
            title,
            id: Some(id),
            status,
            description: description.trim().to_string(),
            source: SourceLocation {
                file: file_name.to_string(),
                line: title_line,
            },
        });
        outcome
    }
}

/// True when the file uses the exported single-story format. Only the first
/// few lines are examined.
pub fn is_story_file(content: &str) -> bool {
    content
        .trim()
        .lines()
        .take(3)
        .any(|line| strip_story_heading(line).is_some())
}

fn strip_story_heading(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if hashes < 2 {
        return None;
    }
    strip_story_prefix(trimmed[hashes..].trim_start())
}

/// Strip a leading case-insensitive `Story:` marker, returning the rest.
pub(crate) fn strip_story_prefix(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let marker = trimmed.get(..5)?;
    if !marker.eq_ignore_ascii_case("story") {
        return None;
    }
    let rest = trimmed[5..].trim_start();
    rest.strip_prefix(':').map(str::trim)
}

fn fallback_id(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    format!("mdsync-{stem}")
}

pub(crate) fn story_start(line: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix('-')?;
    let rest = rest.trim_start().strip_prefix("Story:")?;
    let title = rest.trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

pub(crate) fn parse_field_line(line: &str) -> Option<FieldLine<'_>> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    let colon = trimmed.find(':')?;
    let key = trimmed[..colon].trim_end();
    if !key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '-'))
    {
        return None;
    }
    Some(FieldLine {
        indent,
        key,
        value: trimmed[colon + 1..].trim(),
    })
}

/// Case/separator-insensitive field key form: spaces, hyphens, and
/// underscores are equivalent and ignored.
pub(crate) fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

fn strip_description_indent(line: &str) -> &str {
    let spaces = line.bytes().take_while(|b| *b == b' ').count().min(4);
    &line[spaces..]
}

fn flush(
    draft: &mut Option<StoryDraft>,
    in_description: &mut bool,
    outcome: &mut ParseOutcome,
    file_name: &str,
) {
    let story = match draft.take() {
        Some(story) => story,
        None => return,
    };
    *in_description = false;

    match &story.id {
        None => {
            outcome.errors.push(
                LogEntry::new(LogLevel::Error, "Missing story id").with_payload(serde_json::json!({
                    "file": file_name,
                    "line": story.line,
                    "title": story.title,
                })),
            );
        }
        Some(id) => {
            if outcome
                .stories
                .iter()
                .any(|existing| existing.id.as_deref() == Some(id.as_str()))
            {
                outcome.warnings.push(warning(
                    format!("Duplicate story id \"{id}\""),
                    file_name,
                    story.line,
                ));
                return;
            }
            for issue in validate_story_id(id) {
                outcome
                    .warnings
                    .push(warning(issue.message(id), file_name, story.line));
            }
            outcome.stories.push(ParsedStory {
                title: story.title,
                id: story.id,
                status: story.status,
                description: story.description,
                source: SourceLocation {
                    file: file_name.to_string(),
                    line: story.line,
                },
            });
        }
    }
}

fn warning(message: String, file: &str, line: usize) -> LogEntry {
    LogEntry::new(LogLevel::Warn, message)
        .with_payload(serde_json::json!({ "file": file, "line": line }))
}

fn error(message: String, file: &str, line: usize) -> LogEntry {
    LogEntry::new(LogLevel::Error, message)
        .with_payload(serde_json::json!({ "file": file, "line": line }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::CommonMark;

    fn parser() -> StoryParser<'static> {
        static MD: CommonMark = CommonMark;
        StoryParser::new(&MD, StatusAliasTable::default())
    }

    #[test]
    fn test_parse_single_story_with_description() {
        let text = "## Ready\n\
                    - Story: Title A\n\
                    \x20 story id: X-1\n\
                    \x20 description:\n\
                    \x20   line a\n";
        let outcome = parser().parse(text, "stories.md");
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.stories.len(), 1);
        let story = &outcome.stories[0];
        assert_eq!(story.title, "Title A");
        assert_eq!(story.id.as_deref(), Some("X-1"));
        assert_eq!(story.status, StoryStatus::Ready);
        assert_eq!(story.description.trim(), "line a");
        assert_eq!(story.source.line, 2);
    }

    #[test]
    fn test_sections_assign_statuses() {
        let text = "## Backlog\n- Story: One\n  story id: A-1\n\
                    ## In Progress\n- Story: Two\n  story id: A-2\n\
                    ## Done\n- Story: Three\n  story id: A-3\n";
        let outcome = parser().parse(text, "stories.md");
        let statuses: Vec<_> = outcome.stories.iter().map(|s| s.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![StoryStatus::Backlog, StoryStatus::InProgress, StoryStatus::Done]
        );
    }

    #[test]
    fn test_unrecognized_heading_becomes_custom_status() {
        let text = "## Blocked\n- Story: Stuck\n  story id: B-1\n";
        let outcome = parser().parse(text, "stories.md");
        assert_eq!(
            outcome.stories[0].status,
            StoryStatus::Custom("Blocked".to_string())
        );
    }

    #[test]
    fn test_missing_id_is_error_and_story_dropped() {
        let text = "## Ready\n- Story: No id here\n  description: something\n";
        let outcome = parser().parse(text, "stories.md");
        assert!(outcome.stories.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("Missing story id"));
    }

    #[test]
    fn test_duplicate_id_keeps_first_and_warns_once() {
        let text = "- Story: First\n  story id: DUP-1\n\
                    - Story: Second\n  story id: DUP-1\n";
        let outcome = parser().parse(text, "stories.md");
        assert_eq!(outcome.stories.len(), 1);
        assert_eq!(outcome.stories[0].title, "First");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].message.contains("DUP-1"));
    }

    #[test]
    fn test_field_keys_are_separator_insensitive() {
        let text = "- Story: Mixed keys\n  Story-ID: K-1\n  Description: inline text\n";
        let outcome = parser().parse(text, "stories.md");
        let story = &outcome.stories[0];
        assert_eq!(story.id.as_deref(), Some("K-1"));
        assert_eq!(story.description.trim(), "inline text");
    }

    #[test]
    fn test_description_keeps_nested_content_verbatim() {
        let text = "- Story: Nested\n\
                    \x20 story id: N-1\n\
                    \x20 description:\n\
                    \x20   first line\n\
                    \x20     indented: looks like a field\n\
                    \x20   ```\n\
                    \x20   code: block\n\
                    \x20   ```\n";
        let outcome = parser().parse(text, "stories.md");
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        let description = &outcome.stories[0].description;
        assert!(description.contains("first line"));
        assert!(description.contains("indented: looks like a field"));
        assert!(description.contains("code: block"));
    }

    #[test]
    fn test_shallow_unknown_key_ends_description_with_warning() {
        let text = "- Story: Shallow\n\
                    \x20 story id: SH-1\n\
                    \x20 description:\n\
                    \x20   real content\n\
                    \x20priority: high\n\
                    - Story: Next\n\
                    \x20 story id: SH-2\n";
        let outcome = parser().parse(text, "stories.md");
        assert_eq!(outcome.stories.len(), 2);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].message.contains("priority"));
        assert!(!outcome.stories[0].description.contains("priority"));
    }

    #[test]
    fn test_heading_flushes_open_story() {
        let text = "- Story: Open\n  story id: O-1\n  description:\n    text\n\
                    ## Done\n- Story: Later\n  story id: O-2\n";
        let outcome = parser().parse(text, "stories.md");
        assert_eq!(outcome.stories.len(), 2);
        assert_eq!(outcome.stories[0].status, StoryStatus::Backlog);
        assert_eq!(outcome.stories[1].status, StoryStatus::Done);
        assert!(!outcome.stories[1].description.contains("text"));
    }

    #[test]
    fn test_is_story_file() {
        assert!(is_story_file("## Story: A title\n\n### Status\n"));
        assert!(is_story_file("\n## story : lower\n"));
        assert!(!is_story_file("# Plain document\n- Story: x\n"));
        assert!(!is_story_file("body first\nbody second\nbody third\n## Story: late\n"));
    }

    #[test]
    fn test_parse_story_file_round_trip_shape() {
        let text = "## Story: Implement login\n\n\
                    ### Story ID\n\nAUTH-42\n\n\
                    ### Status\n\nIn progress\n\n\
                    ### Description\n\nAdd the login form.\n\nWith validation.\n";
        let outcome = parser().parse_story_file(text, "auth-42-implement-login.md");
        assert!(outcome.errors.is_empty());
        let story = &outcome.stories[0];
        assert_eq!(story.title, "Implement login");
        assert_eq!(story.id.as_deref(), Some("AUTH-42"));
        assert_eq!(story.status, StoryStatus::InProgress);
        assert_eq!(story.description, "Add the login form.\n\nWith validation.");
    }

    #[test]
    fn test_parse_story_file_without_id_uses_filename_fallback() {
        let text = "## Story: Unnamed\n\n### Status\n\nBacklog\n";
        let outcome = parser().parse_story_file(text, "notes/unnamed.md");
        assert_eq!(outcome.stories[0].id.as_deref(), Some("mdsync-unnamed"));
    }

    #[test]
    fn test_short_id_gets_format_warning() {
        let text = "- Story: Short\n  story id: ab\n";
        let outcome = parser().parse(text, "stories.md");
        assert_eq!(outcome.stories.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].message.contains("length"));
    }
}
