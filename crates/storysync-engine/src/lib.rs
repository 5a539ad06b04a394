pub mod executor;
pub mod github;
pub mod request;
pub mod runner;
pub mod traits;

pub use executor::{BatchExecutor, ExecutionReport};
pub use github::GithubTransport;
pub use request::{AliasedOperation, BatchOperation, BatchOutcome};
pub use runner::{pull_dir, push_dir, PullFilters};
pub use traits::{BoardTransport, DryRunTransport, FileStore, LocalFileStore};
