//! Two-round mutation batch execution.
//!
//! Round one dispatches every concrete mutation. Status updates that
//! target an item created in the same run only learn their real id from
//! the create response, so they are held back and re-batched as round two
//! once the ids are known.

use crate::request::{AliasedOperation, BatchOperation, BatchOutcome};
use crate::traits::BoardTransport;
use std::collections::HashMap;
use storysync_core::{RunLog, SyncError, SyncResult};
use storysync_domain::planner::{ItemRef, MutationIntent};
use storysync_domain::{Board, ItemKind, ItemState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

pub struct BatchExecutor<'a> {
    transport: &'a dyn BoardTransport,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(transport: &'a dyn BoardTransport) -> Self {
        Self { transport }
    }

    /// Execute one plan against the board. A batch whose response count
    /// does not match what was dispatched is a hard failure: the error is
    /// logged, remaining rounds are not sent, and mutations already
    /// dispatched stand.
    pub async fn execute(
        &self,
        intents: &[MutationIntent],
        board: &Board,
        log: &mut RunLog,
    ) -> SyncResult<ExecutionReport> {
        let mut report = ExecutionReport::default();
        let mut round_one: Vec<AliasedOperation> = Vec::new();
        let mut create_aliases: HashMap<usize, String> = HashMap::new();
        // (intent index, create intent index, field write)
        let mut deferred: Vec<(usize, usize, DeferredWrite)> = Vec::new();

        for (index, intent) in intents.iter().enumerate() {
            match intent {
                MutationIntent::Skip { reason } => {
                    report.skipped += 1;
                    log.debug(format!("Skipping item: {reason}"));
                }
                MutationIntent::CreateItem { title, body, .. } => {
                    let alias = format!("create{index}");
                    create_aliases.insert(index, alias.clone());
                    round_one.push(AliasedOperation::new(
                        alias,
                        BatchOperation::CreateDraftItem {
                            board_id: board.id.clone(),
                            title: title.clone(),
                            body: body.clone(),
                        },
                    ));
                }
                MutationIntent::UpdateItemContent {
                    target_id,
                    title,
                    body,
                    state,
                } => {
                    round_one.push(AliasedOperation::new(
                        format!("updateContent{index}"),
                        content_operation(board, target_id, title, body, *state),
                    ));
                }
                MutationIntent::UpdateItemStatus {
                    target,
                    status_option_id,
                } => match target {
                    ItemRef::Existing(item_id) => round_one.push(AliasedOperation::new(
                        format!("setStatus{index}"),
                        BatchOperation::SetItemOption {
                            board_id: board.id.clone(),
                            item_id: item_id.clone(),
                            field_id: status_field_id(board)?,
                            option_id: status_option_id.clone(),
                        },
                    )),
                    ItemRef::Pending(create_index) => {
                        deferred.push((
                            index,
                            *create_index,
                            DeferredWrite::Status(status_option_id.clone()),
                        ));
                    }
                },
                MutationIntent::UpdateItemStoryId { target, story_id } => match target {
                    ItemRef::Existing(item_id) => round_one.push(AliasedOperation::new(
                        format!("setStoryId{index}"),
                        BatchOperation::SetItemText {
                            board_id: board.id.clone(),
                            item_id: item_id.clone(),
                            field_id: story_id_field_id(board)?,
                            text: story_id.clone(),
                        },
                    )),
                    ItemRef::Pending(create_index) => {
                        deferred.push((
                            index,
                            *create_index,
                            DeferredWrite::StoryId(story_id.clone()),
                        ));
                    }
                },
                MutationIntent::UpdateItemState {
                    target_id,
                    kind,
                    state,
                } => round_one.push(AliasedOperation::new(
                    format!("setState{index}"),
                    BatchOperation::SetItemState {
                        target_id: target_id.clone(),
                        kind: *kind,
                        state: *state,
                    },
                )),
            }
        }

        let mut created_ids: HashMap<usize, String> = HashMap::new();
        if !round_one.is_empty() {
            let outcome = self.dispatch(&round_one, log).await?;
            for (create_index, alias) in &create_aliases {
                if let Some(item_id) = outcome.item_id(alias) {
                    created_ids.insert(*create_index, item_id.to_string());
                }
            }
            // a create whose response carried no id did not materialize
            report.created += created_ids.len();
            report.updated += round_one.len() - create_aliases.len();
        }

        let mut round_two: Vec<AliasedOperation> = Vec::new();
        for (index, create_index, write) in deferred {
            match created_ids.get(&create_index) {
                Some(item_id) => round_two.push(match write {
                    DeferredWrite::Status(option_id) => AliasedOperation::new(
                        format!("setStatus{index}"),
                        BatchOperation::SetItemOption {
                            board_id: board.id.clone(),
                            item_id: item_id.clone(),
                            field_id: status_field_id(board)?,
                            option_id,
                        },
                    ),
                    DeferredWrite::StoryId(text) => AliasedOperation::new(
                        format!("setStoryId{index}"),
                        BatchOperation::SetItemText {
                            board_id: board.id.clone(),
                            item_id: item_id.clone(),
                            field_id: story_id_field_id(board)?,
                            text,
                        },
                    ),
                }),
                None => log.warn_with(
                    "Dropping field update for an item whose creation returned no id",
                    serde_json::json!({ "intent": index }),
                ),
            }
        }

        if !round_two.is_empty() {
            self.dispatch(&round_two, log).await?;
            report.updated += round_two.len();
        }

        Ok(report)
    }

    async fn dispatch(
        &self,
        operations: &[AliasedOperation],
        log: &mut RunLog,
    ) -> SyncResult<BatchOutcome> {
        tracing::debug!(count = operations.len(), "dispatching mutation batch");
        let outcome = self.transport.execute_batch(operations).await?;
        if outcome.len() != operations.len() {
            log.error_with(
                "Batch response count mismatch",
                serde_json::json!({
                    "expected": operations.len(),
                    "actual": outcome.len(),
                }),
            );
            return Err(SyncError::BatchMismatch {
                expected: operations.len(),
                actual: outcome.len(),
            });
        }
        Ok(outcome)
    }
}

/// Field writes that must wait for the create response to carry an id.
enum DeferredWrite {
    Status(String),
    StoryId(String),
}

fn status_field_id(board: &Board) -> SyncResult<String> {
    board
        .status_field
        .as_ref()
        .map(|field| field.id.clone())
        .ok_or_else(|| SyncError::Validation("board has no Status field".to_string()))
}

fn story_id_field_id(board: &Board) -> SyncResult<String> {
    board
        .story_id_field
        .as_ref()
        .map(|field| field.id.clone())
        .ok_or_else(|| SyncError::Validation("board has no Story ID field".to_string()))
}

/// Content updates go to the draft-issue mutation, except legacy cards
/// which fold title and body back into a single note.
fn content_operation(
    board: &Board,
    target_id: &str,
    title: &str,
    body: &str,
    state: ItemState,
) -> BatchOperation {
    let kind = board
        .items()
        .find(|item| item.content_id == target_id)
        .map(|item| item.kind);

    match kind {
        Some(ItemKind::Card) => BatchOperation::UpdateCard {
            card_id: target_id.to_string(),
            note: if body.is_empty() {
                title.to_string()
            } else {
                format!("{title}\n\n{body}")
            },
            archived: state == ItemState::Closed,
        },
        _ => BatchOperation::UpdateDraftItem {
            draft_id: target_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            state,
        },
    }
}
