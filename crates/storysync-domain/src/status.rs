use crate::story::StoryStatus;
use storysync_core::{StatusAlias, SyncConfig};

/// Lowercase and collapse runs of whitespace to a single space. This is the
/// comparison form for status names everywhere: heading mapping, planner
/// drift checks, and status-option lookup.
pub fn normalize_status(status: &str) -> String {
    status
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Data-driven mapping from free-text section headings to status buckets.
/// Rules are checked in order; the first pattern contained in the lowered
/// heading wins. Headings matching no rule become a custom status verbatim.
#[derive(Debug, Clone)]
pub struct StatusAliasTable {
    rules: Vec<(String, StoryStatus)>,
}

impl StatusAliasTable {
    pub fn new(aliases: &[StatusAlias]) -> Self {
        let rules = aliases
            .iter()
            .map(|alias| {
                (
                    alias.pattern.trim().to_lowercase(),
                    StoryStatus::from_name(&alias.status),
                )
            })
            .collect();
        Self { rules }
    }

    pub fn resolve_heading(&self, heading: &str) -> StoryStatus {
        let lowered = heading.trim().to_lowercase();
        for (pattern, status) in &self.rules {
            if !pattern.is_empty() && lowered.contains(pattern.as_str()) {
                return status.clone();
            }
        }
        StoryStatus::Custom(heading.trim().to_string())
    }
}

impl Default for StatusAliasTable {
    fn default() -> Self {
        Self::new(&SyncConfig::default().status_aliases)
    }
}
