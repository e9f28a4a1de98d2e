//! Idle sweep configuration from TOML (`[sweeper]` section)

use serde::{Deserialize, Serialize};
use squad_application::SweeperParams;
use squad_domain::{ConfigIssue, ConfigIssueCode};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSweeperConfig {
    pub interval_secs: u64,
    /// Continuous emptiness before a Session is torn down
    pub grace_period_secs: u64,
}

impl Default for FileSweeperConfig {
    fn default() -> Self {
        let params = SweeperParams::default();
        Self {
            interval_secs: params.interval.as_secs(),
            grace_period_secs: params.grace_period.as_secs(),
        }
    }
}

impl FileSweeperConfig {
    pub fn to_params(&self) -> SweeperParams {
        SweeperParams {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            grace_period: Duration::from_secs(self.grace_period_secs),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.interval_secs == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidConstraint {
                    field: "sweeper.interval_secs".to_string(),
                },
                "sweeper.interval_secs must be at least 1",
            ));
        }
        if self.grace_period_secs < self.interval_secs {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "sweeper.grace_period_secs".to_string(),
                },
                format!(
                    "sweeper.grace_period_secs ({}) is shorter than the sweep interval ({}); sessions expire on the second empty sweep",
                    self.grace_period_secs, self.interval_secs
                ),
            ));
        }
        issues
    }
}
