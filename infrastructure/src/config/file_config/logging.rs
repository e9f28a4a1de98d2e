//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file for session audit events; disabled when unset
    pub audit_log: Option<String>,
    /// Directory for daily-rolling diagnostic logs; stderr only when unset
    pub log_dir: Option<String>,
}
