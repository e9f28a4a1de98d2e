//! Orchestrator parameters.
//!
//! Static parameters grouped per component. They are set at initialization
//! (usually converted from the TOML file config) and never change while the
//! orchestrator runs.

use serde::{Deserialize, Serialize};
use squad_domain::{ChannelNaming, QuorumRule};
use std::time::Duration;

/// Squad formation and voting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadParams {
    /// Squad size used when a start request does not specify one.
    pub default_group_size: usize,
    /// Naming convention for squad channels.
    pub naming: ChannelNaming,
    /// Rule a squad's replay votes must satisfy.
    pub quorum_rule: QuorumRule,
    /// How long to wait for the squad namer before falling back.
    pub naming_timeout: Duration,
}

impl Default for SquadParams {
    fn default() -> Self {
        Self {
            default_group_size: 4,
            naming: ChannelNaming::default(),
            quorum_rule: QuorumRule::Majority,
            naming_timeout: Duration::from_secs(8),
        }
    }
}

/// Channel provisioning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerParams {
    /// Delay between moving members out and deleting their channels.
    pub deletion_grace: Duration,
    /// Delay before greeting a member moved into a squad; `None` disables greetings.
    pub greeting_delay: Option<Duration>,
    /// Greeting text; `{member}` and `{squad}` are substituted.
    pub greeting_template: String,
}

impl Default for ProvisionerParams {
    fn default() -> Self {
        Self {
            deletion_grace: Duration::from_secs(3),
            greeting_delay: None,
            greeting_template: "Welcome to {squad}, {member}!".to_string(),
        }
    }
}

impl ProvisionerParams {
    pub fn with_deletion_grace(mut self, grace: Duration) -> Self {
        self.deletion_grace = grace;
        self
    }

    pub fn with_greeting(mut self, delay: Duration, template: impl Into<String>) -> Self {
        self.greeting_delay = Some(delay);
        self.greeting_template = template.into();
        self
    }

    pub fn render_greeting(&self, member: &str, squad: &str) -> String {
        self.greeting_template
            .replace("{member}", member)
            .replace("{squad}", squad)
    }
}

/// Idle sweep parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperParams {
    pub interval: Duration,
    /// Continuous emptiness required before a Session is torn down.
    pub grace_period: Duration,
}

impl Default for SweeperParams {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            grace_period: Duration::from_secs(120),
        }
    }
}

/// Time-accrual checkpoint parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointParams {
    pub interval: Duration,
    /// Trackers with less unflushed time than this are skipped on a tick.
    pub min_accrual: Duration,
    /// Store key prefix; the member id is appended after a `/`.
    pub key_prefix: String,
    /// Dotted field path incremented with accrued seconds.
    pub field_path: String,
}

impl Default for CheckpointParams {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            min_accrual: Duration::from_secs(60),
            key_prefix: "members".to_string(),
            field_path: "voice.seconds".to_string(),
        }
    }
}

impl CheckpointParams {
    pub fn key_for(&self, member: &str) -> String {
        format!("{}/{}", self.key_prefix, member)
    }
}
