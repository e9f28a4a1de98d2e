//! Time-accrual checkpoint configuration from TOML (`[checkpoint]` section)
//!
//! ```toml
//! [checkpoint]
//! interval_secs = 300
//! min_accrual_secs = 60
//! key_prefix = "members"
//! field_path = "voice.seconds"
//! store_path = "squad-checkpoints.json"
//! ```

use serde::{Deserialize, Serialize};
use squad_application::CheckpointParams;
use squad_domain::{ConfigIssue, ConfigIssueCode};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCheckpointConfig {
    pub interval_secs: u64,
    /// Trackers with less unflushed time are skipped on a tick
    pub min_accrual_secs: u64,
    pub key_prefix: String,
    /// Dotted path of the counter inside each member's document
    pub field_path: String,
    /// JSON file the checkpoint store writes to
    pub store_path: String,
}

impl Default for FileCheckpointConfig {
    fn default() -> Self {
        let params = CheckpointParams::default();
        Self {
            interval_secs: params.interval.as_secs(),
            min_accrual_secs: params.min_accrual.as_secs(),
            key_prefix: params.key_prefix,
            field_path: params.field_path,
            store_path: "squad-checkpoints.json".to_string(),
        }
    }
}

impl FileCheckpointConfig {
    pub fn to_params(&self) -> CheckpointParams {
        CheckpointParams {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            min_accrual: Duration::from_secs(self.min_accrual_secs),
            key_prefix: self.key_prefix.clone(),
            field_path: self.field_path.clone(),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.interval_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidConstraint {
                    field: "checkpoint.interval_secs".to_string(),
                },
                "checkpoint.interval_secs must be at least 1",
            ));
        }
        if self.field_path.split('.').any(str::is_empty) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "checkpoint.field_path".to_string(),
                },
                format!(
                    "checkpoint.field_path '{}' has an empty segment",
                    self.field_path
                ),
            ));
        }
        if self.key_prefix.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: "checkpoint.key_prefix".to_string(),
                },
                "checkpoint.key_prefix must not be empty",
            ));
        }
        if self.min_accrual_secs > self.interval_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "checkpoint.min_accrual_secs".to_string(),
                },
                "checkpoint.min_accrual_secs is longer than the interval; some ticks will write nothing",
            ));
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_field_segment_is_an_error() {
        let config = FileCheckpointConfig {
            field_path: "voice..seconds".to_string(),
            ..Default::default()
        };
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(FileCheckpointConfig::default().validate().is_empty());
    }
}
