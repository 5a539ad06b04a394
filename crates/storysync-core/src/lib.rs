pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::{StatusAlias, SyncConfig, SyncPolicy};
pub use error::SyncError;
pub use logging::{LogEntry, LogLevel, RunLog, SyncOutcome};
pub use result::SyncResult;
