use crate::cli::PushArgs;
use crate::output;
use std::path::Path;
use storysync_core::SyncConfig;
use storysync_domain::CommonMark;
use storysync_engine::{push_dir, DryRunTransport, GithubTransport, LocalFileStore};

pub async fn handle(args: PushArgs) -> ! {
    if args.board.project_id.trim().is_empty() || args.board.token.trim().is_empty() {
        output::output_error("project id and token must not be empty");
    }

    let mut config = SyncConfig::load();
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    let dir = args
        .board
        .dir
        .clone()
        .unwrap_or_else(|| config.stories_dir.clone());

    let transport = GithubTransport::new(args.board.token.clone());
    let store = LocalFileStore;

    if args.dry_run {
        let recorder = DryRunTransport::new(&transport);
        let (outcome, _logs) = push_dir(
            &recorder,
            &store,
            &CommonMark,
            Path::new(&dir),
            &args.board.project_id,
            &config,
        )
        .await;
        output::output_outcome(outcome, Some(recorder.recorded()));
    }

    let (outcome, _logs) = push_dir(
        &transport,
        &store,
        &CommonMark,
        Path::new(&dir),
        &args.board.project_id,
        &config,
    )
    .await;
    output::output_outcome(outcome, None);
}
