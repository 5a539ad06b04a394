use clap::{Args, Parser, Subcommand};
use storysync_core::SyncPolicy;

#[derive(Parser)]
#[command(name = "storysync")]
#[command(about = "Keep markdown story files and a project board in sync", long_about = None)]
#[command(version, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push markdown stories up to the board
    Push(PushArgs),
    /// Pull board items down into story files
    Pull(PullArgs),
    /// Suggest deterministic ids for stories missing one
    SuggestIds {
        /// Stories directory (defaults to the configured stories_dir)
        #[arg(long)]
        dir: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
pub struct BoardArgs {
    /// Project board node id (or set PROJECT_ID env var)
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// API token with project scope (or set GITHUB_TOKEN env var)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Stories directory (defaults to the configured stories_dir)
    #[arg(long)]
    pub dir: Option<String>,
}

#[derive(Args)]
pub struct PushArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Sync policy for stories that already exist on the board
    #[arg(long)]
    pub policy: Option<SyncPolicy>,

    /// Plan the sync without dispatching any mutation
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PullArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Export only the story with this id
    #[arg(long)]
    pub story_id: Option<String>,

    /// Export only items in these status buckets (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<String>,
}
