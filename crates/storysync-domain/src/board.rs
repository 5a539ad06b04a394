//! In-memory snapshot of the remote board.
//!
//! The snapshot is rebuilt from a [`BoardFetch`] on every run and never
//! mutated afterwards, apart from the story-id backfill performed during
//! construction (a cache-fill from item bodies, not a source-of-truth
//! write).

use crate::status::normalize_status;
use crate::story::find_story_id_in_body;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Issue,
    PullRequest,
    DraftIssue,
    #[serde(rename = "ProjectCard")]
    Card,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "OPEN",
            ItemState::Closed => "CLOSED",
        }
    }
}

/// One item already on the board. `content_id` identifies the underlying
/// issue/PR/draft; `board_item_id` identifies its placement on the board.
/// The two have distinct lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    pub kind: ItemKind,
    pub content_id: String,
    pub board_item_id: String,
    pub title: String,
    pub url: Option<String>,
    pub body: String,
    pub state: ItemState,
    pub story_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusField {
    pub id: String,
    pub name: String,
    pub options: Vec<StatusOption>,
}

/// A plain text field on the board, such as the "Story ID" field that
/// persists the stable cross-system key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub id: String,
    pub name: String,
    pub items: Vec<BoardItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub columns: Vec<BoardColumn>,
    pub status_field: Option<StatusField>,
    pub story_id_field: Option<TextField>,
}

// Wire shape returned by the board-fetch transport call.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardFetch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldFetch>,
    #[serde(default)]
    pub items: Vec<ItemFetch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFetch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<StatusOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemFetch {
    pub item_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub story_id: Option<String>,
    pub content: Option<ContentFetch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentFetch {
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

const DEFAULT_STATUS: &str = "Backlog";

impl Board {
    /// Build the snapshot from a fetch response. Columns come from the
    /// Status field's declared options when one exists (stable ordering,
    /// empty columns included); statuses observed on items but absent from
    /// the options are appended as extra columns so their items stay
    /// matchable. Items without content are dropped.
    pub fn from_fetch(fetch: BoardFetch) -> Self {
        let status_field = fetch
            .fields
            .iter()
            .find(|field| field.name == "Status")
            .map(|field| StatusField {
                id: field.id.clone(),
                name: field.name.clone(),
                options: field.options.clone(),
            });
        let story_id_field = fetch
            .fields
            .iter()
            .find(|field| field.name == "Story ID")
            .map(|field| TextField {
                id: field.id.clone(),
                name: field.name.clone(),
            });

        let mut grouped: Vec<(String, Vec<BoardItem>)> = Vec::new();
        for item in fetch.items {
            let content = match item.content {
                Some(content) => content,
                None => continue,
            };

            let status = item
                .status
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
            let state = match content.state.as_deref() {
                Some("CLOSED") | Some("MERGED") => ItemState::Closed,
                _ => ItemState::Open,
            };
            let story_id = item
                .story_id
                .filter(|s| !s.trim().is_empty())
                .or_else(|| find_story_id_in_body(&content.body));

            let board_item = BoardItem {
                kind: content.kind,
                content_id: content.id,
                board_item_id: item.item_id,
                title: content.title,
                url: content.url.filter(|u| !u.is_empty()),
                body: content.body,
                state,
                story_id,
                status: status.clone(),
            };

            match grouped.iter_mut().find(|(name, _)| *name == status) {
                Some((_, items)) => items.push(board_item),
                None => grouped.push((status, vec![board_item])),
            }
        }

        let mut columns = Vec::new();
        match &status_field {
            Some(field) if !field.options.is_empty() => {
                for option in &field.options {
                    let items = grouped
                        .iter()
                        .position(|(name, _)| *name == option.name)
                        .map(|index| grouped.remove(index).1)
                        .unwrap_or_default();
                    columns.push(BoardColumn {
                        id: option.id.clone(),
                        name: option.name.clone(),
                        items,
                    });
                }
            }
            _ => {}
        }
        for (name, items) in grouped {
            columns.push(BoardColumn {
                id: format!("status-{name}"),
                name,
                items,
            });
        }

        Self {
            id: fetch.id,
            name: fetch.name,
            columns,
            status_field,
            story_id_field,
        }
    }

    /// All items in board traversal order (columns, then items within).
    pub fn items(&self) -> impl Iterator<Item = &BoardItem> {
        self.columns.iter().flat_map(|column| column.items.iter())
    }

    pub fn total_items(&self) -> usize {
        self.columns.iter().map(|column| column.items.len()).sum()
    }

    /// Resolve a desired status name to its single-select option id via
    /// normalized-name lookup. None means no such option is declared.
    pub fn status_option_id(&self, status_name: &str) -> Option<&str> {
        let wanted = normalize_status(status_name);
        let field = self.status_field.as_ref()?;
        field
            .options
            .iter()
            .find(|option| normalize_status(&option.name) == wanted)
            .map(|option| option.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_with_status_field() -> BoardFetch {
        BoardFetch {
            id: "PROJ_1".to_string(),
            name: "Demo Board".to_string(),
            fields: vec![
                FieldFetch {
                    id: "FIELD_STATUS".to_string(),
                    name: "Status".to_string(),
                    options: vec![
                        StatusOption { id: "opt-backlog".to_string(), name: "Backlog".to_string() },
                        StatusOption { id: "opt-ready".to_string(), name: "Ready".to_string() },
                        StatusOption { id: "opt-done".to_string(), name: "Done".to_string() },
                    ],
                },
                FieldFetch {
                    id: "FIELD_STORY_ID".to_string(),
                    name: "Story ID".to_string(),
                    options: vec![],
                },
            ],
            items: vec![
                ItemFetch {
                    item_id: "PVTI_1".to_string(),
                    status: Some("Ready".to_string()),
                    story_id: Some("S-1".to_string()),
                    content: Some(ContentFetch {
                        kind: ItemKind::DraftIssue,
                        id: "DI_1".to_string(),
                        title: "First story".to_string(),
                        body: "body text".to_string(),
                        state: None,
                        url: None,
                    }),
                },
                ItemFetch {
                    item_id: "PVTI_2".to_string(),
                    status: None,
                    story_id: None,
                    content: Some(ContentFetch {
                        kind: ItemKind::Issue,
                        id: "I_2".to_string(),
                        title: "Closed issue".to_string(),
                        body: "Story ID: S-2\nrest".to_string(),
                        state: Some("CLOSED".to_string()),
                        url: Some("https://example.com/issues/2".to_string()),
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_columns_follow_status_field_options() {
        let board = Board::from_fetch(fetch_with_status_field());
        let names: Vec<_> = board.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Backlog", "Ready", "Done"]);
        // empty columns are kept
        assert!(board.columns[2].items.is_empty());
        assert_eq!(board.columns[1].items[0].title, "First story");
    }

    #[test]
    fn test_item_without_status_defaults_to_backlog() {
        let board = Board::from_fetch(fetch_with_status_field());
        let backlog = &board.columns[0];
        assert_eq!(backlog.items.len(), 1);
        assert_eq!(backlog.items[0].status, "Backlog");
        assert_eq!(backlog.items[0].state, ItemState::Closed);
    }

    #[test]
    fn test_story_id_field_is_captured() {
        let board = Board::from_fetch(fetch_with_status_field());
        let field = board.story_id_field.as_ref().unwrap();
        assert_eq!(field.id, "FIELD_STORY_ID");

        let mut fetch = fetch_with_status_field();
        fetch.fields.truncate(1);
        assert!(Board::from_fetch(fetch).story_id_field.is_none());
    }

    #[test]
    fn test_story_id_backfilled_from_body() {
        let board = Board::from_fetch(fetch_with_status_field());
        let item = board.items().find(|i| i.content_id == "I_2").unwrap();
        assert_eq!(item.story_id.as_deref(), Some("S-2"));
    }

    #[test]
    fn test_columns_from_observed_statuses_without_field() {
        let mut fetch = fetch_with_status_field();
        fetch.fields.clear();
        fetch.items[0].status = Some("In review".to_string());
        let board = Board::from_fetch(fetch);
        let names: Vec<_> = board.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["In review", "Backlog"]);
        assert_eq!(board.columns[0].id, "status-In review");
    }

    #[test]
    fn test_status_option_lookup_is_normalized() {
        let board = Board::from_fetch(fetch_with_status_field());
        assert_eq!(board.status_option_id("READY"), Some("opt-ready"));
        assert_eq!(board.status_option_id("  ready "), Some("opt-ready"));
        assert_eq!(board.status_option_id("Blocked"), None);
    }

    #[test]
    fn test_items_without_content_are_dropped() {
        let mut fetch = fetch_with_status_field();
        fetch.items.push(ItemFetch {
            item_id: "PVTI_3".to_string(),
            status: Some("Ready".to_string()),
            story_id: None,
            content: None,
        });
        let board = Board::from_fetch(fetch);
        assert_eq!(board.total_items(), 2);
    }
}
