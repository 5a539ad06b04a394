//! GitHub Projects GraphQL transport.
//!
//! This module owns every wire string: the board query, the aliased
//! mutation documents, and the response unpacking. Nothing above it sees
//! GraphQL.

use crate::request::{AliasedOperation, BatchOperation, BatchOutcome};
use crate::traits::BoardTransport;
use async_trait::async_trait;
use serde_json::Value;
use storysync_core::{SyncError, SyncResult};
use storysync_domain::board::{BoardFetch, ContentFetch, FieldFetch, ItemFetch, StatusOption};
use storysync_domain::{ItemKind, ItemState};

const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
const USER_AGENT: &str = concat!("storysync/", env!("CARGO_PKG_VERSION"));

const BOARD_QUERY: &str = r#"
query($projectId: ID!) {
    node(id: $projectId) {
        ... on ProjectV2 {
            id
            title
            fields(first: 100) {
                nodes {
                    ... on ProjectV2Field {
                        id
                        name
                    }
                    ... on ProjectV2SingleSelectField {
                        id
                        name
                        options {
                            id
                            name
                        }
                    }
                }
            }
            items(first: 100) {
                nodes {
                    id
                    fieldValues(first: 100) {
                        nodes {
                            ... on ProjectV2ItemFieldTextValue {
                                text
                                field {
                                    ... on ProjectV2FieldCommon {
                                        name
                                    }
                                }
                            }
                            ... on ProjectV2ItemFieldSingleSelectValue {
                                name
                                field {
                                    ... on ProjectV2FieldCommon {
                                        name
                                    }
                                }
                            }
                        }
                    }
                    content {
                        __typename
                        ... on DraftIssue {
                            id
                            title
                            body
                        }
                        ... on Issue {
                            id
                            title
                            body
                            state
                            url
                        }
                        ... on PullRequest {
                            id
                            title
                            body
                            state
                            url
                        }
                    }
                }
            }
        }
    }
}
"#;

pub struct GithubTransport {
    client: reqwest::Client,
    token: String,
    endpoint: String,
}

impl GithubTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoint(token, DEFAULT_ENDPOINT)
    }

    /// Endpoint override, used for GitHub Enterprise hosts and tests.
    pub fn with_endpoint(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            endpoint: endpoint.into(),
        }
    }

    async fn graphql(&self, query: &str, variables: Value) -> SyncResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Transport(format!(
                "GraphQL endpoint returned {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors[0]
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown GraphQL error");
                return Err(SyncError::Transport(format!("GraphQL error: {message}")));
            }
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| SyncError::Transport("GraphQL response missing data".to_string()))
    }
}

#[async_trait]
impl BoardTransport for GithubTransport {
    async fn fetch_board(&self, board_id: &str) -> SyncResult<BoardFetch> {
        tracing::debug!(board_id, "fetching project board");
        let data = self
            .graphql(BOARD_QUERY, serde_json::json!({ "projectId": board_id }))
            .await?;
        parse_board(&data, board_id)
    }

    async fn execute_batch(&self, operations: &[AliasedOperation]) -> SyncResult<BatchOutcome> {
        if operations.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let document = render_batch(operations);
        tracing::debug!(count = operations.len(), "sending mutation batch");
        let data = self.graphql(&document, serde_json::json!({})).await?;

        let map = data.as_object().ok_or_else(|| {
            SyncError::Transport("mutation response is not an object".to_string())
        })?;
        let mut outcome = BatchOutcome::default();
        for (alias, result) in map {
            outcome.insert(alias.clone(), extract_item_id(result));
        }
        Ok(outcome)
    }
}

fn parse_board(data: &Value, board_id: &str) -> SyncResult<BoardFetch> {
    let node = match data.get("node") {
        Some(node) if !node.is_null() => node,
        _ => return Err(SyncError::NotFound(format!("project {board_id}"))),
    };

    let mut fetch = BoardFetch {
        id: string_at(node, "id").unwrap_or_else(|| board_id.to_string()),
        name: string_at(node, "title").unwrap_or_default(),
        fields: Vec::new(),
        items: Vec::new(),
    };

    for field in nodes_at(node, "fields") {
        let (Some(id), Some(name)) = (string_at(field, "id"), string_at(field, "name")) else {
            continue;
        };
        let options = field
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| {
                        Some(StatusOption {
                            id: string_at(option, "id")?,
                            name: string_at(option, "name")?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        fetch.fields.push(FieldFetch { id, name, options });
    }

    for item in nodes_at(node, "items") {
        let Some(item_id) = string_at(item, "id") else {
            continue;
        };

        let mut status = None;
        let mut story_id = None;
        for value in nodes_at(item, "fieldValues") {
            let field_name = value
                .get("field")
                .and_then(|field| field.get("name"))
                .and_then(Value::as_str);
            match field_name {
                Some("Status") => status = string_at(value, "name").or(status),
                Some("Story ID") => story_id = string_at(value, "text").or(story_id),
                _ => {}
            }
        }

        let content = item.get("content").and_then(parse_content);
        fetch.items.push(ItemFetch {
            item_id,
            status,
            story_id,
            content,
        });
    }

    Ok(fetch)
}

fn parse_content(content: &Value) -> Option<ContentFetch> {
    let kind = match content.get("__typename").and_then(Value::as_str)? {
        "Issue" => ItemKind::Issue,
        "PullRequest" => ItemKind::PullRequest,
        "DraftIssue" => ItemKind::DraftIssue,
        "ProjectCard" => ItemKind::Card,
        _ => return None,
    };
    Some(ContentFetch {
        kind,
        id: string_at(content, "id")?,
        title: string_at(content, "title").unwrap_or_default(),
        body: string_at(content, "body").unwrap_or_default(),
        state: string_at(content, "state"),
        url: string_at(content, "url"),
    })
}

fn render_batch(operations: &[AliasedOperation]) -> String {
    let body: Vec<String> = operations.iter().map(render_operation).collect();
    format!("mutation {{\n{}\n}}", body.join("\n"))
}

fn render_operation(operation: &AliasedOperation) -> String {
    let alias = &operation.alias;
    match &operation.op {
        BatchOperation::CreateDraftItem {
            board_id,
            title,
            body,
        } => format!(
            "{alias}: addProjectV2DraftIssue(input: {{projectId: {}, title: {}, body: {}}}) {{ projectItem {{ id }} }}",
            quote(board_id),
            quote(title),
            quote(body),
        ),
        BatchOperation::UpdateDraftItem {
            draft_id,
            title,
            body,
            state,
        } => format!(
            "{alias}: updateProjectV2DraftIssue(input: {{draftIssueId: {}, title: {}, body: {}, state: {}}}) {{ draftIssue {{ id }} }}",
            quote(draft_id),
            quote(title),
            quote(body),
            quote(state.as_str()),
        ),
        BatchOperation::SetItemText {
            board_id,
            item_id,
            field_id,
            text,
        } => format!(
            "{alias}: updateProjectV2ItemFieldValue(input: {{projectId: {}, itemId: {}, fieldId: {}, value: {{text: {}}}}}) {{ projectV2Item {{ id }} }}",
            quote(board_id),
            quote(item_id),
            quote(field_id),
            quote(text),
        ),
        BatchOperation::SetItemOption {
            board_id,
            item_id,
            field_id,
            option_id,
        } => format!(
            "{alias}: updateProjectV2ItemFieldValue(input: {{projectId: {}, itemId: {}, fieldId: {}, value: {{singleSelectOptionId: {}}}}}) {{ projectV2Item {{ id }} }}",
            quote(board_id),
            quote(item_id),
            quote(field_id),
            quote(option_id),
        ),
        BatchOperation::SetItemState {
            target_id,
            kind,
            state,
        } => render_state_change(alias, target_id, *kind, *state),
        BatchOperation::UpdateCard {
            card_id,
            note,
            archived,
        } => format!(
            "{alias}: updateProjectCard(input: {{projectCardId: {}, note: {}, isArchived: {archived}}}) {{ clientMutationId }}",
            quote(card_id),
            quote(note),
        ),
    }
}

fn render_state_change(alias: &str, target_id: &str, kind: ItemKind, state: ItemState) -> String {
    match (kind, state) {
        (ItemKind::Issue, ItemState::Open) => format!(
            "{alias}: reopenIssue(input: {{issueId: {}}}) {{ issue {{ url }} }}",
            quote(target_id)
        ),
        (ItemKind::Issue, ItemState::Closed) => format!(
            "{alias}: closeIssue(input: {{issueId: {}}}) {{ issue {{ url }} }}",
            quote(target_id)
        ),
        (ItemKind::PullRequest, ItemState::Open) => format!(
            "{alias}: reopenPullRequest(input: {{pullRequestId: {}}}) {{ pullRequest {{ url }} }}",
            quote(target_id)
        ),
        (ItemKind::PullRequest, ItemState::Closed) => format!(
            "{alias}: closePullRequest(input: {{pullRequestId: {}}}) {{ pullRequest {{ url }} }}",
            quote(target_id)
        ),
        (ItemKind::DraftIssue, state) => format!(
            "{alias}: updateProjectV2DraftIssue(input: {{draftIssueId: {}, state: {}}}) {{ draftIssue {{ id }} }}",
            quote(target_id),
            quote(state.as_str()),
        ),
        (ItemKind::Card, state) => format!(
            "{alias}: updateProjectCard(input: {{projectCardId: {}, isArchived: {}}}) {{ clientMutationId }}",
            quote(target_id),
            state == ItemState::Closed,
        ),
    }
}

/// Id carried by a mutation result, wherever the mutation nests it.
fn extract_item_id(result: &Value) -> Option<String> {
    for container in ["projectItem", "draftIssue", "projectV2Item"] {
        if let Some(id) = result.get(container).and_then(|v| string_at(v, "id")) {
            return Some(id);
        }
    }
    None
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn nodes_at<'v>(value: &'v Value, key: &str) -> impl Iterator<Item = &'v Value> {
    value
        .get(key)
        .and_then(|v| v.get("nodes"))
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter())
        .into_iter()
        .flatten()
}

// quote a string for inline use in a GraphQL document
fn quote(text: &str) -> String {
    Value::from(text).to_string()
}
