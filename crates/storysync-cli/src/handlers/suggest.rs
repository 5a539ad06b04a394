use crate::output;
use std::path::Path;
use storysync_core::SyncConfig;
use storysync_domain::{suggest_ids, IdPatch};
use storysync_engine::{FileStore, LocalFileStore};

pub async fn handle(dir: Option<String>) -> ! {
    let config = SyncConfig::load();
    let dir = dir.unwrap_or_else(|| config.stories_dir.clone());
    let store = LocalFileStore;

    let paths = match store.list(Path::new(&dir)).await {
        Ok(paths) => paths,
        Err(err) => output::output_error(&format!("failed to read directory {dir}: {err}")),
    };

    let mut patches: Vec<IdPatch> = Vec::new();
    for path in paths
        .into_iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
    {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match store.read(&path).await {
            Ok(Some(content)) => patches.extend(suggest_ids(&content, &file_name)),
            Ok(None) => {}
            Err(err) => output::output_error(&format!("failed to read {file_name}: {err}")),
        }
    }

    output::output_data(patches);
}
