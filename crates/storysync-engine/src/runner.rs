//! Directory-level sync runs.
//!
//! `push_dir` drives markdown → board, `pull_dir` drives board →
//! markdown. Files are processed strictly sequentially and every run
//! returns the full collected log next to the outcome; success is
//! decided only by the absence of error entries.

use crate::executor::BatchExecutor;
use crate::traits::{BoardTransport, FileStore};
use std::path::Path;
use storysync_core::{LogEntry, RunLog, SyncConfig, SyncOutcome};
use storysync_domain::{
    file_name_for, is_story_file, plan, Board, MarkdownSurface, StatusAliasTable, StoryExporter,
    StoryParser,
};

/// Optional narrowing for `pull_dir`: export only the item with a given
/// story id, or only items in certain status buckets.
#[derive(Debug, Clone, Default)]
pub struct PullFilters {
    pub story_id: Option<String>,
    pub statuses: Vec<String>,
}

/// Sync every markdown file in `dir` up to the board. Each file gets a
/// fresh board snapshot so earlier files' mutations are visible to later
/// ones.
pub async fn push_dir(
    transport: &dyn BoardTransport,
    files: &dyn FileStore,
    md: &dyn MarkdownSurface,
    dir: &Path,
    board_id: &str,
    config: &SyncConfig,
) -> (SyncOutcome, Vec<LogEntry>) {
    let mut log = RunLog::new();
    let mut created_total = 0;
    let mut skipped_total = 0;

    let paths = match files.list(dir).await {
        Ok(paths) => paths,
        Err(err) => {
            log.error_with(
                format!("Failed to read source directory: {}", dir.display()),
                serde_json::json!({ "error": err.to_string() }),
            );
            return finish(log, 0, 0);
        }
    };

    let md_files: Vec<_> = paths
        .into_iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    if md_files.is_empty() {
        log.warn("No markdown files found in the source directory");
        return finish(log, 0, 0);
    }
    log.info(format!("Found {} markdown files to process", md_files.len()));

    let aliases = StatusAliasTable::new(&config.status_aliases);
    let parser = StoryParser::new(md, aliases);
    let executor = BatchExecutor::new(transport);

    for path in md_files {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content = match files.read(&path).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                log.warn_with(
                    format!("File vanished before it could be read: {file_name}"),
                    serde_json::json!({ "path": path.display().to_string() }),
                );
                continue;
            }
            Err(err) => {
                log.warn_with(
                    format!("Failed to read file: {file_name}"),
                    serde_json::json!({ "error": err.to_string() }),
                );
                continue;
            }
        };
        log.info(format!("Processing markdown file: {file_name}"));

        let fetch = match transport.fetch_board(board_id).await {
            Ok(fetch) => fetch,
            Err(err) => {
                log.error_with(
                    format!("Failed to fetch board while processing {file_name}"),
                    serde_json::json!({ "error": err.to_string() }),
                );
                continue;
            }
        };
        let board = Board::from_fetch(fetch);

        let parsed = if is_story_file(&content) {
            parser.parse_story_file(&content, &file_name)
        } else {
            parser.parse(&content, &file_name)
        };
        log.extend(parsed.warnings);
        log.extend(parsed.errors);

        let intents = plan(&parsed.stories, &board, config.policy, &mut log);
        match executor.execute(&intents, &board, &mut log).await {
            Ok(report) => {
                created_total += report.created;
                skipped_total += report.skipped;
                log.info(format!("Processed file: {file_name}"));
            }
            Err(err) => {
                log.error_with(
                    format!("Failed to sync file: {file_name}"),
                    serde_json::json!({ "error": err.to_string() }),
                );
            }
        }
    }

    log.info(format!(
        "Sync completed: {created_total} created, {skipped_total} skipped"
    ));
    finish(log, created_total, skipped_total)
}

/// Export the board's items into single-story files under `dir`. The
/// board is fetched once; files already in sync are left untouched.
pub async fn pull_dir(
    transport: &dyn BoardTransport,
    files: &dyn FileStore,
    md: &dyn MarkdownSurface,
    dir: &Path,
    board_id: &str,
    filters: &PullFilters,
) -> (SyncOutcome, Vec<LogEntry>) {
    let mut log = RunLog::new();

    let fetch = match transport.fetch_board(board_id).await {
        Ok(fetch) => fetch,
        Err(err) => {
            log.error_with(
                "Failed to fetch board",
                serde_json::json!({ "error": err.to_string() }),
            );
            return finish(log, 0, 0);
        }
    };
    let board = Board::from_fetch(fetch);
    log.info(format!(
        "Processing {} items from the board",
        board.total_items()
    ));

    let target_story_id = filters
        .story_id
        .as_deref()
        .map(|id| id.trim().to_lowercase());
    if let Some(id) = &target_story_id {
        log.info(format!("Story filter enabled for id: {id}"));
    }
    let status_filter: Vec<String> = filters.statuses.iter().map(|s| filter_key(s)).collect();

    let exporter = StoryExporter::new(md);
    let mut written = 0;
    let mut unchanged = 0;
    let mut matched_story_filter = false;

    for column in &board.columns {
        for item in &column.items {
            if let Some(wanted) = &target_story_id {
                let item_id = item.story_id.as_deref().map(|id| id.trim().to_lowercase());
                if item_id.as_deref() != Some(wanted.as_str()) {
                    continue;
                }
                matched_story_filter = true;
            }

            if !status_filter.is_empty() {
                let actual = if item.status.trim().is_empty() {
                    column.name.as_str()
                } else {
                    item.status.as_str()
                };
                if !status_filter.contains(&filter_key(actual)) {
                    continue;
                }
            }

            if item.title.trim().is_empty() {
                log.debug("Skipping item with no title");
                continue;
            }

            let file_name = file_name_for(item);
            let path = dir.join(&file_name);

            let existing = match files.read(&path).await {
                Ok(existing) => existing,
                Err(err) => {
                    log.error_with(
                        format!("Failed to read story file: {file_name}"),
                        serde_json::json!({ "error": err.to_string() }),
                    );
                    continue;
                }
            };

            let (content, changed) =
                exporter.export_item(item, &column.name, existing.as_deref());
            if !changed {
                unchanged += 1;
                log.debug(format!("File already in sync, skipping: {file_name}"));
                continue;
            }

            match files.write(&path, &content).await {
                Ok(()) => {
                    written += 1;
                    if existing.is_some() {
                        log.info(format!("Updated story file: {file_name}"));
                    } else {
                        log.info(format!("Created story file: {file_name}"));
                    }
                }
                Err(err) => {
                    log.error_with(
                        format!("Failed to write story file: {file_name}"),
                        serde_json::json!({ "error": err.to_string() }),
                    );
                }
            }
        }
    }

    if let Some(id) = &target_story_id {
        if !matched_story_filter {
            log.warn(format!("Story with id \"{id}\" was not found on the board"));
        }
    }
    log.info("Story export completed");
    finish(log, written, unchanged)
}

fn finish(log: RunLog, created: usize, skipped: usize) -> (SyncOutcome, Vec<LogEntry>) {
    let outcome = log.outcome(created, skipped);
    (outcome, log.entries().to_vec())
}

/// Key used for status filter comparison: whitespace-free lowercase, with
/// the historical `todo` spelling folded into `ready`.
fn filter_key(status: &str) -> String {
    let key: String = status
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if key == "todo" {
        "ready".to_string()
    } else {
        key
    }
}
