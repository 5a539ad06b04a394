//! Sync planning: decide the minimal set of mutations that brings the
//! board in line with the parsed stories.

use crate::board::{Board, BoardItem, ItemKind, ItemState};
use crate::matcher::find_item;
use crate::status::normalize_status;
use crate::story::ParsedStory;
use serde::Serialize;
use storysync_core::{RunLog, SyncPolicy};

/// Reference to the item a mutation targets. `Pending` holds the position
/// of the paired `CreateItem` in the intent list; the executor resolves it
/// to the real identifier once the create response arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ItemRef {
    Existing(String),
    Pending(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MutationIntent {
    CreateItem {
        title: String,
        body: String,
        initial_status: Option<String>,
    },
    UpdateItemContent {
        target_id: String,
        title: String,
        body: String,
        state: ItemState,
    },
    UpdateItemStatus {
        target: ItemRef,
        status_option_id: String,
    },
    UpdateItemStoryId {
        target: ItemRef,
        story_id: String,
    },
    UpdateItemState {
        target_id: String,
        kind: ItemKind,
        state: ItemState,
    },
    Skip {
        reason: String,
    },
}

const DEFAULT_STATUS: &str = "Backlog";

const SKIP_ALREADY_EXISTS: &str = "already exists";
const SKIP_NO_CHANGE: &str = "no change";

/// Compute the ordered mutation intents for one document's stories against
/// one board snapshot. Re-running on unchanged inputs yields only `Skip`
/// intents.
pub fn plan(
    stories: &[ParsedStory],
    board: &Board,
    policy: SyncPolicy,
    log: &mut RunLog,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for story in stories {
        match find_item(board, story.id.as_deref(), None, &story.title) {
            None => {
                log.debug(format!("No existing item for \"{}\"", story.title));
                plan_create(story, board, &mut intents, log);
            }
            Some(item) => {
                log.debug(format!(
                    "Found existing item for \"{}\": {}",
                    story.title, item.content_id
                ));
                match policy {
                    SyncPolicy::CreateOnly => intents.push(MutationIntent::Skip {
                        reason: SKIP_ALREADY_EXISTS.to_string(),
                    }),
                    SyncPolicy::Full => plan_update(story, item, board, &mut intents, log),
                }
            }
        }
    }

    intents
}

fn desired_state(story: &ParsedStory) -> ItemState {
    if story.status.is_done() {
        ItemState::Closed
    } else {
        ItemState::Open
    }
}

fn plan_create(
    story: &ParsedStory,
    board: &Board,
    intents: &mut Vec<MutationIntent>,
    log: &mut RunLog,
) {
    let status_name = story.status.name().to_string();
    let wants_status = normalize_status(&status_name) != normalize_status(DEFAULT_STATUS);

    let create_index = intents.len();
    intents.push(MutationIntent::CreateItem {
        title: story.title.clone(),
        body: story.description.trim().to_string(),
        initial_status: wants_status.then(|| status_name.clone()),
    });

    if wants_status && board.status_field.is_some() {
        match board.status_option_id(&status_name) {
            Some(option_id) => intents.push(MutationIntent::UpdateItemStatus {
                target: ItemRef::Pending(create_index),
                status_option_id: option_id.to_string(),
            }),
            None => log.warn_with(
                format!("No status option matches \"{status_name}\", dropping status update"),
                serde_json::json!({ "title": story.title }),
            ),
        }
    }

    // persist the stable key so the next fetch matches by id, not title
    if board.story_id_field.is_some() {
        if let Some(story_id) = &story.id {
            intents.push(MutationIntent::UpdateItemStoryId {
                target: ItemRef::Pending(create_index),
                story_id: story_id.clone(),
            });
        }
    }
}

fn plan_update(
    story: &ParsedStory,
    item: &BoardItem,
    board: &Board,
    intents: &mut Vec<MutationIntent>,
    log: &mut RunLog,
) {
    let state = desired_state(story);
    let status_name = story.status.name();

    let content_changed =
        story.description.trim() != item.body.trim() || story.title != item.title;
    let state_changed = state != item.state;
    let status_changed = normalize_status(status_name) != normalize_status(&item.status);

    let mut emitted = false;

    match item.kind {
        ItemKind::DraftIssue | ItemKind::Card => {
            if content_changed || state_changed {
                intents.push(MutationIntent::UpdateItemContent {
                    target_id: item.content_id.clone(),
                    title: story.title.clone(),
                    body: story.description.trim().to_string(),
                    state,
                });
                emitted = true;
            }
        }
        ItemKind::Issue | ItemKind::PullRequest => {
            // issue/PR content is owned elsewhere; only open/closed state
            // can be pushed
            if state_changed {
                intents.push(MutationIntent::UpdateItemState {
                    target_id: item.content_id.clone(),
                    kind: item.kind,
                    state,
                });
                emitted = true;
            }
        }
    }

    if status_changed && board.status_field.is_some() {
        match board.status_option_id(status_name) {
            Some(option_id) => {
                intents.push(MutationIntent::UpdateItemStatus {
                    target: ItemRef::Existing(item.board_item_id.clone()),
                    status_option_id: option_id.to_string(),
                });
                emitted = true;
            }
            None => log.warn_with(
                format!("No status option matches \"{status_name}\", dropping status update"),
                serde_json::json!({ "title": story.title }),
            ),
        }
    }

    // items matched by url or title may predate the id write-back
    if item.story_id.is_none() && board.story_id_field.is_some() {
        if let Some(story_id) = &story.id {
            intents.push(MutationIntent::UpdateItemStoryId {
                target: ItemRef::Existing(item.board_item_id.clone()),
                story_id: story_id.clone(),
            });
            emitted = true;
        }
    }

    if !emitted {
        intents.push(MutationIntent::Skip {
            reason: SKIP_NO_CHANGE.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardColumn, BoardFetch, FieldFetch, StatusField, StatusOption, TextField};
    use crate::story::{SourceLocation, StoryStatus};

    fn story(id: &str, title: &str, status: StoryStatus, description: &str) -> ParsedStory {
        ParsedStory {
            title: title.to_string(),
            id: Some(id.to_string()),
            status,
            description: description.to_string(),
            source: SourceLocation {
                file: "stories.md".to_string(),
                line: 1,
            },
        }
    }

    fn item(content_id: &str, story_id: &str, title: &str, status: &str, body: &str) -> BoardItem {
        BoardItem {
            kind: ItemKind::DraftIssue,
            content_id: content_id.to_string(),
            board_item_id: format!("PVTI_{content_id}"),
            title: title.to_string(),
            url: None,
            body: body.to_string(),
            state: ItemState::Open,
            story_id: Some(story_id.to_string()),
            status: status.to_string(),
        }
    }

    fn status_field() -> StatusField {
        StatusField {
            id: "FIELD_STATUS".to_string(),
            name: "Status".to_string(),
            options: vec![
                StatusOption { id: "opt-backlog".to_string(), name: "Backlog".to_string() },
                StatusOption { id: "opt-ready".to_string(), name: "Ready".to_string() },
                StatusOption { id: "opt-progress".to_string(), name: "In progress".to_string() },
                StatusOption { id: "opt-done".to_string(), name: "Done".to_string() },
            ],
        }
    }

    fn board_with(items: Vec<BoardItem>) -> Board {
        Board {
            id: "PROJ_1".to_string(),
            name: "Board".to_string(),
            columns: vec![BoardColumn {
                id: "col".to_string(),
                name: "All".to_string(),
                items,
            }],
            status_field: Some(status_field()),
            story_id_field: Some(TextField {
                id: "FIELD_STORY_ID".to_string(),
                name: "Story ID".to_string(),
            }),
        }
    }

    #[test]
    fn test_unmatched_story_becomes_create_with_dependent_status() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let board = board_with(vec![]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::CreateOnly, &mut log);
        assert_eq!(intents.len(), 3);
        assert_eq!(
            intents[0],
            MutationIntent::CreateItem {
                title: "Title A".to_string(),
                body: "line a".to_string(),
                initial_status: Some("Ready".to_string()),
            }
        );
        assert_eq!(
            intents[1],
            MutationIntent::UpdateItemStatus {
                target: ItemRef::Pending(0),
                status_option_id: "opt-ready".to_string(),
            }
        );
        assert_eq!(
            intents[2],
            MutationIntent::UpdateItemStoryId {
                target: ItemRef::Pending(0),
                story_id: "X-1".to_string(),
            }
        );
    }

    #[test]
    fn test_backlog_story_needs_no_status_intent() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Backlog, "")];
        let board = board_with(vec![]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::CreateOnly, &mut log);
        assert_eq!(intents.len(), 2);
        assert!(matches!(
            &intents[0],
            MutationIntent::CreateItem { initial_status: None, .. }
        ));
        assert!(matches!(
            &intents[1],
            MutationIntent::UpdateItemStoryId { target: ItemRef::Pending(0), .. }
        ));
    }

    #[test]
    fn test_create_only_skips_matched_story() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "line a")]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::CreateOnly, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::Skip { reason: "already exists".to_string() }]
        );
    }

    #[test]
    fn test_full_sync_unchanged_story_is_skip() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "line a")]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::Skip { reason: "no change".to_string() }]
        );
    }

    #[test]
    fn test_full_sync_detects_description_drift() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "new body")];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "old body")]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(intents.len(), 1);
        assert_eq!(
            intents[0],
            MutationIntent::UpdateItemContent {
                target_id: "DI_1".to_string(),
                title: "Title A".to_string(),
                body: "new body".to_string(),
                state: ItemState::Open,
            }
        );
    }

    #[test]
    fn test_full_sync_detects_status_drift_with_normalization() {
        let stories = vec![story("X-1", "Title A", StoryStatus::InProgress, "body")];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "IN  PROGRESS", "body")]);
        let mut log = RunLog::new();

        // normalized equal: no intent beyond skip
        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::Skip { reason: "no change".to_string() }]
        );

        // genuinely different status: one status update against the
        // board item id, not the content id
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "body")]);
        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::UpdateItemStatus {
                target: ItemRef::Existing("PVTI_DI_1".to_string()),
                status_option_id: "opt-progress".to_string(),
            }]
        );
    }

    #[test]
    fn test_done_story_closes_issue_via_state_update() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Done, "body")];
        let mut issue = item("I_1", "X-1", "Title A", "Done", "different body upstream");
        issue.kind = ItemKind::Issue;
        let board = board_with(vec![issue]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::UpdateItemState {
                target_id: "I_1".to_string(),
                kind: ItemKind::Issue,
                state: ItemState::Closed,
            }]
        );
    }

    #[test]
    fn test_unknown_status_option_drops_intent_with_warning() {
        let stories = vec![story(
            "X-1",
            "Title A",
            StoryStatus::Custom("Blocked".to_string()),
            "body",
        )];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "body")]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::Skip { reason: "no change".to_string() }]
        );
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message.contains("No status option matches \"Blocked\"")));
    }

    #[test]
    fn test_title_rename_matches_by_persisted_id_without_second_create() {
        // the item as a previous run left it: story id written to the
        // board's field. Renaming the title in markdown must update the
        // matched item, never create a duplicate.
        let stories = vec![story("X-1", "Renamed title", StoryStatus::Ready, "line a")];
        let board = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "line a")]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert!(intents
            .iter()
            .all(|intent| !matches!(intent, MutationIntent::CreateItem { .. })));
        assert_eq!(
            intents,
            vec![MutationIntent::UpdateItemContent {
                target_id: "DI_1".to_string(),
                title: "Renamed title".to_string(),
                body: "line a".to_string(),
                state: ItemState::Open,
            }]
        );
    }

    #[test]
    fn test_full_sync_backfills_missing_story_id() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let mut matched = item("DI_1", "X-1", "Title A", "Ready", "line a");
        matched.story_id = None;
        let board = board_with(vec![matched]);
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::UpdateItemStoryId {
                target: ItemRef::Existing("PVTI_DI_1".to_string()),
                story_id: "X-1".to_string(),
            }]
        );
    }

    #[test]
    fn test_planner_is_idempotent_after_sync() {
        // simulate the board state after a successful full sync, then
        // re-plan: only Skip intents may remain
        let stories = vec![
            story("X-1", "Title A", StoryStatus::Ready, "line a"),
            story("X-2", "Title B", StoryStatus::InProgress, "line b"),
        ];
        let board = board_with(vec![
            item("DI_1", "X-1", "Title A", "Ready", "line a"),
            item("DI_2", "X-2", "Title B", "In progress", "line b"),
        ]);
        let mut log = RunLog::new();

        let first = plan(&stories, &board, SyncPolicy::Full, &mut log);
        let second = plan(&stories, &board, SyncPolicy::Full, &mut log);
        assert_eq!(first, second);
        assert!(second
            .iter()
            .all(|intent| matches!(intent, MutationIntent::Skip { .. })));
    }

    #[test]
    fn test_spec_example_create_then_skip() {
        // first run: empty board, one create (+ dependent status intent);
        // second run: the item exists with id X-1, one skip
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let mut log = RunLog::new();

        let empty = board_with(vec![]);
        let intents = plan(&stories, &empty, SyncPolicy::CreateOnly, &mut log);
        assert!(matches!(&intents[0], MutationIntent::CreateItem { title, .. } if title == "Title A"));

        let synced = board_with(vec![item("DI_1", "X-1", "Title A", "Ready", "line a")]);
        let intents = plan(&stories, &synced, SyncPolicy::CreateOnly, &mut log);
        assert_eq!(
            intents,
            vec![MutationIntent::Skip { reason: "already exists".to_string() }]
        );
    }

    #[test]
    fn test_board_without_status_field_plans_create_without_status() {
        let stories = vec![story("X-1", "Title A", StoryStatus::Ready, "line a")];
        let board = Board::from_fetch(BoardFetch {
            id: "PROJ_1".to_string(),
            name: "Board".to_string(),
            fields: vec![FieldFetch {
                id: "FIELD_OTHER".to_string(),
                name: "Priority".to_string(),
                options: vec![],
            }],
            items: vec![],
        });
        let mut log = RunLog::new();

        let intents = plan(&stories, &board, SyncPolicy::CreateOnly, &mut log);
        assert_eq!(intents.len(), 1);
        assert!(matches!(&intents[0], MutationIntent::CreateItem { .. }));
    }
}
