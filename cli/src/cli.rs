//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for squad-orchestrator
#[derive(Parser, Debug)]
#[command(name = "squad-orchestrator")]
#[command(author, version, about = "Ephemeral squad sessions for community voice spaces")]
#[command(long_about = r#"
squad-orchestrator splits a voice lobby into squads, gives each squad its own
channel, replays the whole session when a squad votes for it, cleans up
sessions left empty, and checkpoints how long members stay connected.

Configuration files are loaded from (in priority order):
1. SQUAD_* environment variables (e.g. SQUAD_SWEEPER__GRACE_PERIOD_SECS=60)
2. --config <path>     Explicit config file
3. ./squad.toml        Project-level config
4. ~/.config/squad-orchestrator/config.toml   Global config

Example:
  squad-orchestrator run demos/friday-night.jsonl
  cat steps.jsonl | squad-orchestrator -v run --seed 7
  squad-orchestrator --config squad.toml check-config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration sources and the merged configuration, then exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSONL scenario script against the in-memory platform
    Run {
        /// Script file; read from stdin when absent
        script: Option<PathBuf>,

        /// Wait in wall-clock time instead of virtual time
        #[arg(long)]
        realtime: bool,

        /// Maximum channels per parent on the simulated platform
        #[arg(long, value_name = "N")]
        channel_limit: Option<usize>,

        /// Seed for reproducible squad shuffles
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate the configuration and print every issue found
    CheckConfig,
}
