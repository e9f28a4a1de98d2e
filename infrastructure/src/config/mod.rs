//! Configuration file loading for squad-orchestrator
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `SQUAD_`-prefixed environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./squad.toml` or `./.squad.toml`
//! 4. Global: `$XDG_CONFIG_HOME/squad-orchestrator/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileCheckpointConfig, FileConfig, FileLoggingConfig, FileNamingConfig, FileProvisionerConfig,
    FileSquadsConfig, FileSweeperConfig,
};
pub use loader::ConfigLoader;
