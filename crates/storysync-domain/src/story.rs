use serde::{Deserialize, Serialize};

/// Status bucket a story belongs to, derived from the nearest preceding
/// section heading. Headings outside the closed set are kept verbatim as a
/// custom status so boards with extra columns still round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryStatus {
    #[default]
    Backlog,
    Ready,
    InProgress,
    InReview,
    Done,
    Custom(String),
}

impl StoryStatus {
    pub fn name(&self) -> &str {
        match self {
            StoryStatus::Backlog => "Backlog",
            StoryStatus::Ready => "Ready",
            StoryStatus::InProgress => "In progress",
            StoryStatus::InReview => "In review",
            StoryStatus::Done => "Done",
            StoryStatus::Custom(name) => name,
        }
    }

    /// Map a status name back to the closed enum, falling back to Custom.
    /// Comparison is lowercase and whitespace-collapsed.
    pub fn from_name(name: &str) -> Self {
        match crate::status::normalize_status(name).as_str() {
            "backlog" => StoryStatus::Backlog,
            "ready" => StoryStatus::Ready,
            "in progress" => StoryStatus::InProgress,
            "in review" => StoryStatus::InReview,
            "done" => StoryStatus::Done,
            _ => StoryStatus::Custom(name.trim().to_string()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StoryStatus::Done)
    }
}

impl std::fmt::Display for StoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

/// One work item extracted from markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStory {
    pub title: String,
    pub id: Option<String>,
    pub status: StoryStatus,
    pub description: String,
    pub source: SourceLocation,
}

/// Scan an item body for a `story id:` / `story-id:` line. Used to backfill
/// ids onto board items whose Story ID field was never populated.
pub fn find_story_id_in_body(body: &str) -> Option<String> {
    for line in body.lines() {
        let lower = line.to_lowercase();
        let start = match lower.find("story-id:").or_else(|| lower.find("story id:")) {
            Some(start) => start,
            None => continue,
        };
        // both markers are the same byte length
        let value = line[start + "story id:".len()..].trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

const ID_MIN_LEN: usize = 3;
const ID_MAX_LEN: usize = 64;

/// Format problems with a story id. These are surfaced as warnings; only a
/// missing id is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdIssue {
    Whitespace,
    Length,
    Charset,
}

impl IdIssue {
    pub fn message(&self, id: &str) -> String {
        match self {
            IdIssue::Whitespace => format!("Story id \"{id}\" has leading or trailing whitespace"),
            IdIssue::Length => format!(
                "Story id \"{id}\" length should be between {ID_MIN_LEN}-{ID_MAX_LEN} characters"
            ),
            IdIssue::Charset => format!(
                "Story id \"{id}\" allows only letters, digits, dot, underscore, and hyphen"
            ),
        }
    }
}

pub fn validate_story_id(id: &str) -> Vec<IdIssue> {
    let mut issues = Vec::new();
    if id != id.trim() {
        issues.push(IdIssue::Whitespace);
    }
    let trimmed = id.trim();
    if trimmed.len() < ID_MIN_LEN || trimmed.len() > ID_MAX_LEN {
        issues.push(IdIssue::Length);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        issues.push(IdIssue::Charset);
    }
    issues
}
