//! Channel provisioning configuration from TOML (`[provisioner]` section)
//!
//! ```toml
//! [provisioner]
//! deletion_grace_secs = 3
//! greeting_enabled = true
//! greeting_delay_secs = 5
//! greeting_template = "Welcome to {squad}, {member}!"
//! ```

use serde::{Deserialize, Serialize};
use squad_application::ProvisionerParams;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProvisionerConfig {
    /// Delay between moving members out and deleting channels
    pub deletion_grace_secs: u64,
    pub greeting_enabled: bool,
    pub greeting_delay_secs: u64,
    /// `{member}` and `{squad}` are substituted
    pub greeting_template: String,
}

impl Default for FileProvisionerConfig {
    fn default() -> Self {
        let params = ProvisionerParams::default();
        Self {
            deletion_grace_secs: params.deletion_grace.as_secs(),
            greeting_enabled: false,
            greeting_delay_secs: 5,
            greeting_template: params.greeting_template,
        }
    }
}

impl FileProvisionerConfig {
    pub fn to_params(&self) -> ProvisionerParams {
        let params = ProvisionerParams::default()
            .with_deletion_grace(Duration::from_secs(self.deletion_grace_secs));
        if self.greeting_enabled {
            params.with_greeting(
                Duration::from_secs(self.greeting_delay_secs),
                self.greeting_template.clone(),
            )
        } else {
            params
        }
    }
}
