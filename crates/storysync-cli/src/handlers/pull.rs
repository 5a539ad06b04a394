use crate::cli::PullArgs;
use crate::output;
use std::path::Path;
use storysync_core::SyncConfig;
use storysync_domain::CommonMark;
use storysync_engine::{pull_dir, GithubTransport, LocalFileStore, PullFilters};

pub async fn handle(args: PullArgs) -> ! {
    if args.board.project_id.trim().is_empty() || args.board.token.trim().is_empty() {
        output::output_error("project id and token must not be empty");
    }

    let config = SyncConfig::load();
    let dir = args
        .board
        .dir
        .clone()
        .unwrap_or_else(|| config.stories_dir.clone());

    let transport = GithubTransport::new(args.board.token.clone());
    let store = LocalFileStore;
    let filters = PullFilters {
        story_id: args.story_id.clone(),
        statuses: args.status.clone(),
    };

    let (outcome, _logs) = pull_dir(
        &transport,
        &store,
        &CommonMark,
        Path::new(&dir),
        &args.board.project_id,
        &filters,
    )
    .await;
    output::output_outcome(outcome, None);
}
