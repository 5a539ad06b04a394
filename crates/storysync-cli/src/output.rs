use serde::Serialize;
use storysync_core::{LogEntry, SyncOutcome};
use storysync_engine::AliasedOperation;

#[derive(Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<Vec<AliasedOperation>>,
}

/// Prints the run summary and terminates the process.
///
/// Exit code 0 only when the run logged no error-level entries. The never
/// type signals that callers cannot continue past this point.
pub fn output_outcome(outcome: SyncOutcome, planned: Option<Vec<AliasedOperation>>) -> ! {
    let success = outcome.success;
    let response = CliResponse {
        success,
        api_version: env!("CARGO_PKG_VERSION"),
        data: Some(SyncSummary {
            created: outcome.created,
            skipped: outcome.skipped,
            errors: outcome.errors,
            planned,
        }),
        error: None,
    };
    println!("{}", serde_json::to_string(&response).unwrap());
    std::process::exit(if success { 0 } else { 1 });
}

/// Prints a successful data payload and terminates with exit code 0.
pub fn output_data<T: Serialize>(data: T) -> ! {
    let response = CliResponse {
        success: true,
        api_version: env!("CARGO_PKG_VERSION"),
        data: Some(data),
        error: None,
    };
    println!("{}", serde_json::to_string(&response).unwrap());
    std::process::exit(0);
}

/// Outputs an error response to stderr and terminates with exit code 1.
pub fn output_error(message: &str) -> ! {
    let response: CliResponse<()> = CliResponse {
        success: false,
        api_version: env!("CARGO_PKG_VERSION"),
        data: None,
        error: Some(message.to_string()),
    };
    eprintln!("{}", serde_json::to_string(&response).unwrap());
    std::process::exit(1);
}
