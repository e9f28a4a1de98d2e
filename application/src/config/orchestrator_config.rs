//! Orchestrator configuration container.
//!
//! [`OrchestratorConfig`] groups the per-component parameter types. The
//! orchestrator holds the full container and hands each component only the
//! slice it needs.

use super::params::{CheckpointParams, ProvisionerParams, SquadParams, SweeperParams};

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub squads: SquadParams,
    pub provisioner: ProvisionerParams,
    pub sweeper: SweeperParams,
    pub checkpoint: CheckpointParams,
}

impl OrchestratorConfig {
    pub fn new(
        squads: SquadParams,
        provisioner: ProvisionerParams,
        sweeper: SweeperParams,
        checkpoint: CheckpointParams,
    ) -> Self {
        Self {
            squads,
            provisioner,
            sweeper,
            checkpoint,
        }
    }

    pub fn with_squads(mut self, squads: SquadParams) -> Self {
        self.squads = squads;
        self
    }

    pub fn with_provisioner(mut self, provisioner: ProvisionerParams) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_sweeper(mut self, sweeper: SweeperParams) -> Self {
        self.sweeper = sweeper;
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointParams) -> Self {
        self.checkpoint = checkpoint;
        self
    }
}
