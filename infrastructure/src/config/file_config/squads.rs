//! Squad formation configuration from TOML (`[squads]` section)
//!
//! ```toml
//! [squads]
//! default_group_size = 4
//! channel_prefix = "[squad] "
//! quorum_rule = "majority"     # or "unanimous", "atleast:2", "75%"
//! ```

use squad_domain::{ConfigIssue, ConfigIssueCode, QuorumRule};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSquadsConfig {
    /// Squad size when a start request does not give one
    pub default_group_size: usize,
    /// Prefix that marks a channel as managed by the orchestrator
    pub channel_prefix: String,
    /// Replay vote rule: "majority", "unanimous", "atleast:N", "N%"
    pub quorum_rule: String,
}

impl Default for FileSquadsConfig {
    fn default() -> Self {
        Self {
            default_group_size: 4,
            channel_prefix: "[squad] ".to_string(),
            quorum_rule: "majority".to_string(),
        }
    }
}

impl FileSquadsConfig {
    /// Parse the quorum rule, falling back to majority with a warning
    pub fn parse_quorum_rule(&self) -> (QuorumRule, Option<ConfigIssue>) {
        match self.quorum_rule.parse::<QuorumRule>() {
            Ok(rule) => (rule, None),
            Err(e) => (
                QuorumRule::default(),
                Some(ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "squads.quorum_rule".to_string(),
                        value: self.quorum_rule.clone(),
                        valid_values: vec![
                            "majority".to_string(),
                            "unanimous".to_string(),
                            "atleast:N".to_string(),
                            "N%".to_string(),
                        ],
                    },
                    format!("squads.quorum_rule: {}, falling back to 'majority'", e),
                )),
            ),
        }
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.default_group_size == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidConstraint {
                    field: "squads.default_group_size".to_string(),
                },
                "squads.default_group_size must be at least 1",
            ));
        }
        if self.channel_prefix.is_empty() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::EmptyValue {
                    field: "squads.channel_prefix".to_string(),
                },
                "squads.channel_prefix is empty; stale squad channels will not be cleaned up",
            ));
        }
        issues.extend(self.parse_quorum_rule().1);
        issues
    }
}
