//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Durations are whole seconds; string enums are parsed into domain types on
//! conversion, with a warning and a fallback when they do not parse.

mod checkpoint;
mod logging;
mod naming;
mod provisioner;
mod squads;
mod sweeper;

pub use checkpoint::FileCheckpointConfig;
pub use logging::FileLoggingConfig;
pub use naming::FileNamingConfig;
pub use provisioner::FileProvisionerConfig;
pub use squads::FileSquadsConfig;
pub use sweeper::FileSweeperConfig;

use serde::{Deserialize, Serialize};
use squad_application::{OrchestratorConfig, SquadParams};
use squad_domain::{ChannelNaming, ConfigIssue, ConfigIssueCode};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Squad formation and voting
    pub squads: FileSquadsConfig,
    /// Channel provisioning and greetings
    pub provisioner: FileProvisionerConfig,
    /// Idle session sweeping
    pub sweeper: FileSweeperConfig,
    /// Connected-time checkpoints
    pub checkpoint: FileCheckpointConfig,
    /// AI squad naming
    pub naming: FileNamingConfig,
    /// Audit and diagnostic logs
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.squads.validate());
        issues.extend(self.sweeper.validate());
        issues.extend(self.checkpoint.validate());

        if self.naming.is_enabled() && self.naming.timeout_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidConstraint {
                    field: "naming.timeout_secs".to_string(),
                },
                "naming.timeout_secs is 0; every squad will get a fallback name",
            ));
        }

        issues
    }

    /// Whether any issue is fatal
    pub fn has_errors(&self) -> bool {
        self.validate().iter().any(ConfigIssue::is_error)
    }

    /// Convert to the application's parameters, using fallbacks for bad values
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let squads = SquadParams {
            default_group_size: self.squads.default_group_size.max(1),
            naming: ChannelNaming::new(self.squads.channel_prefix.clone()),
            quorum_rule: self.squads.parse_quorum_rule().0,
            naming_timeout: Duration::from_secs(self.naming.timeout_secs),
        };

        OrchestratorConfig::new(
            squads,
            self.provisioner.to_params(),
            self.sweeper.to_params(),
            self.checkpoint.to_params(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squad_domain::QuorumRule;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[squads]
default_group_size = 5
channel_prefix = "🎮 "
quorum_rule = "75%"

[provisioner]
deletion_grace_secs = 10
greeting_enabled = true

[sweeper]
interval_secs = 15
grace_period_secs = 90

[checkpoint]
field_path = "stats.voice_seconds"
store_path = "/var/lib/squad/checkpoints.json"

[naming]
endpoint = "http://localhost:8080/v1/chat/completions"
model = "local-model"

[logging]
audit_log = "sessions.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.squads.default_group_size, 5);
        assert!(config.naming.is_enabled());
        assert_eq!(config.logging.audit_log.as_deref(), Some("sessions.jsonl"));

        let converted = config.to_orchestrator_config();
        assert_eq!(converted.squads.quorum_rule, QuorumRule::Percentage(75));
        assert_eq!(converted.squads.naming.channel_name("Owls"), "🎮 Owls");
        assert_eq!(converted.provisioner.deletion_grace, Duration::from_secs(10));
        assert_eq!(converted.sweeper.grace_period, Duration::from_secs(90));
        assert_eq!(converted.checkpoint.field_path, "stats.voice_seconds");
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[sweeper]
grace_period_secs = 600
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sweeper.grace_period_secs, 600);
        assert_eq!(config.sweeper.interval_secs, 30);
        assert_eq!(config.squads, FileSquadsConfig::default());
        assert!(!config.naming.is_enabled());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
        assert!(!config.has_errors());
    }

    #[test]
    fn test_validate_collects_every_issue() {
        let toml_str = r#"
[squads]
default_group_size = 0
quorum_rule = "most"

[sweeper]
interval_secs = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert!(config.has_errors());
        assert!(issues.iter().any(|i| matches!(
            &i.code,
            ConfigIssueCode::InvalidEnumValue { field, .. } if field == "squads.quorum_rule"
        )));
        assert_eq!(issues.iter().filter(|i| i.is_error()).count(), 2);

        // Conversion still works, with fallbacks.
        let converted = config.to_orchestrator_config();
        assert_eq!(converted.squads.default_group_size, 1);
        assert_eq!(converted.squads.quorum_rule, QuorumRule::Majority);
        assert_eq!(converted.sweeper.interval, Duration::from_secs(1));
    }
}
