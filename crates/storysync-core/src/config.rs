use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Which mutations the planner may emit for stories that already exist on
/// the board. Create-only never touches matched items; full sync also
/// pushes content, state, and status updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    #[default]
    CreateOnly,
    Full,
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create-only" | "create_only" | "createonly" => Ok(SyncPolicy::CreateOnly),
            "full" | "full-sync" | "fullsync" => Ok(SyncPolicy::Full),
            other => Err(format!(
                "unknown sync policy '{other}' (expected 'create-only' or 'full')"
            )),
        }
    }
}

impl std::fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPolicy::CreateOnly => write!(f, "create-only"),
            SyncPolicy::Full => write!(f, "full"),
        }
    }
}

/// One heading-to-status mapping rule. `pattern` is matched as a lowercase
/// substring of the section heading; `status` is the canonical board status
/// name the heading maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAlias {
    pub pattern: String,
    pub status: String,
}

impl StatusAlias {
    pub fn new(pattern: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub policy: SyncPolicy,
    #[serde(default = "default_status_aliases")]
    pub status_aliases: Vec<StatusAlias>,
    #[serde(default = "default_stories_dir")]
    pub stories_dir: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: SyncPolicy::default(),
            status_aliases: default_status_aliases(),
            stories_dir: default_stories_dir(),
        }
    }
}

/// Default alias table. Folds "to do"/"todo" into Ready; teams that keep
/// them distinct override this table in config.toml.
fn default_status_aliases() -> Vec<StatusAlias> {
    vec![
        StatusAlias::new("backlog", "Backlog"),
        StatusAlias::new("to do", "Ready"),
        StatusAlias::new("todo", "Ready"),
        StatusAlias::new("ready", "Ready"),
        StatusAlias::new("in progress", "In progress"),
        StatusAlias::new("in review", "In review"),
        StatusAlias::new("done", "Done"),
    ]
}

fn default_stories_dir() -> String {
    "stories".to_string()
}

impl SyncConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/storysync/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("storysync/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("storysync\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                if let Ok(content) = std::fs::read_to_string(&config_path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }
}
