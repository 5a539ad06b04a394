//! Seams between the sync engine and the outside world.

use crate::request::{AliasedOperation, BatchOperation, BatchOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use storysync_core::SyncResult;
use storysync_domain::BoardFetch;

/// Remote board access. Implementations own every query and mutation
/// document; nothing above this trait concatenates wire strings.
#[async_trait]
pub trait BoardTransport: Send + Sync {
    /// Fetch the full board snapshot: fields with their options plus all
    /// items with inlined content.
    async fn fetch_board(&self, board_id: &str) -> SyncResult<BoardFetch>;

    /// Dispatch one batch of aliased mutations. The returned outcome is
    /// keyed by the same aliases; the caller verifies the counts.
    async fn execute_batch(&self, operations: &[AliasedOperation]) -> SyncResult<BatchOutcome>;
}

/// Story file access. `read` returns None for a missing file so the
/// runners can distinguish absent from unreadable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read(&self, path: &Path) -> SyncResult<Option<String>>;

    async fn write(&self, path: &Path, content: &str) -> SyncResult<()>;

    async fn list(&self, dir: &Path) -> SyncResult<Vec<PathBuf>>;
}

/// Local filesystem store over tokio::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStore;

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read(&self, path: &Path) -> SyncResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, path: &Path, content: &str) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn list(&self, dir: &Path) -> SyncResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Transport decorator for dry runs: board fetches pass through, mutation
/// batches are recorded and acknowledged without being sent.
pub struct DryRunTransport<'a> {
    inner: &'a dyn BoardTransport,
    recorded: Mutex<Vec<AliasedOperation>>,
}

impl<'a> DryRunTransport<'a> {
    pub fn new(inner: &'a dyn BoardTransport) -> Self {
        Self {
            inner,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// All operations the run would have dispatched, in order.
    pub fn recorded(&self) -> Vec<AliasedOperation> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl BoardTransport for DryRunTransport<'_> {
    async fn fetch_board(&self, board_id: &str) -> SyncResult<BoardFetch> {
        self.inner.fetch_board(board_id).await
    }

    async fn execute_batch(&self, operations: &[AliasedOperation]) -> SyncResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for (index, operation) in operations.iter().enumerate() {
            // fabricated ids keep dependent field updates plannable
            let item_id = matches!(operation.op, BatchOperation::CreateDraftItem { .. })
                .then(|| format!("dry-run-{index}"));
            outcome.insert(operation.alias.clone(), item_id);
        }
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(operations.iter().cloned());
        Ok(outcome)
    }
}
