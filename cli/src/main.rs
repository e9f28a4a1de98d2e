//! CLI entrypoint for squad-orchestrator
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod cli;
mod scenario;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use cli::{Cli, Command};
use scenario::{ScenarioRunner, TokioClock, parse_script};
use squad_application::{
    CheckpointStore, Clock, NoSessionLogger, NoSquadNamer, Orchestrator, OrchestratorPorts,
    SessionEventLogger, SquadNamer, SystemClock,
};
use squad_infrastructure::{
    ConfigLoader, FileConfig, HttpSquadNamer, InMemoryChatPlatform, JsonFileCheckpointStore,
    JsonlSessionLogger,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // === Load Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
    };

    if cli.show_config {
        for line in ConfigLoader::describe_sources(cli.config.as_deref()) {
            println!("{}", line);
        }
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _log_guard = init_tracing(cli.verbose, config.logging.log_dir.as_deref());

    match cli.command {
        Some(Command::Run {
            script,
            realtime,
            channel_limit,
            seed,
        }) => run_scenario(&config, script, realtime, channel_limit, seed).await,
        Some(Command::CheckConfig) => check_config(&config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Initialize logging based on verbosity level.
///
/// With a log directory, output goes to a daily-rolling file instead of
/// stderr; the returned guard flushes it on exit.
fn init_tracing(verbose: u8, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "squad-orchestrator.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn check_config(config: &FileConfig) -> Result<()> {
    let issues = config.validate();
    if issues.is_empty() {
        println!("Configuration OK");
        return Ok(());
    }

    for issue in &issues {
        println!("{}", issue);
    }
    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("{} configuration error(s)", errors);
    }
    Ok(())
}

async fn run_scenario(
    config: &FileConfig,
    script: Option<PathBuf>,
    realtime: bool,
    channel_limit: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    if config.has_errors() {
        bail!("Configuration has errors; run `squad-orchestrator check-config` for details");
    }

    let source = match &script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let steps = parse_script(&source)?;

    if !realtime {
        tokio::time::pause();
    }

    // === Dependency Injection ===
    let platform = Arc::new(match channel_limit {
        Some(limit) => InMemoryChatPlatform::new().with_channel_limit(limit),
        None => InMemoryChatPlatform::new(),
    });

    let namer: Arc<dyn SquadNamer> = match &config.naming.endpoint {
        Some(endpoint) if config.naming.is_enabled() => {
            if !realtime {
                warn!("AI squad naming times out immediately in virtual time; use --realtime");
            }
            Arc::new(HttpSquadNamer::new(
                endpoint.clone(),
                config.naming.model.clone(),
                config.naming.api_key(),
            ))
        }
        _ => Arc::new(NoSquadNamer),
    };

    let logger: Arc<dyn SessionEventLogger> = match config
        .logging
        .audit_log
        .as_deref()
        .and_then(JsonlSessionLogger::new)
    {
        Some(logger) => {
            info!("Session audit log: {}", logger.path().display());
            Arc::new(logger)
        }
        None => Arc::new(NoSessionLogger),
    };

    let clock: Arc<dyn Clock> = if realtime {
        Arc::new(SystemClock)
    } else {
        Arc::new(TokioClock::new())
    };

    let store: Arc<dyn CheckpointStore> =
        Arc::new(JsonFileCheckpointStore::new(&config.checkpoint.store_path));

    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorPorts {
            platform: Arc::clone(&platform),
            namer,
            store,
            clock,
            logger,
        },
        config.to_orchestrator_config(),
    ));
    if let Some(seed) = seed {
        orchestrator.reseed(seed);
    }
    orchestrator.init().await?;

    let runner = ScenarioRunner::new(platform, Arc::clone(&orchestrator));
    let mut stdout = std::io::stdout().lock();
    let failed = runner.run(steps, &mut stdout).await?;

    let report = orchestrator.shutdown().await;
    info!(
        "Scenario finished: {} failed steps, {}s flushed on shutdown",
        failed, report.seconds
    );
    Ok(())
}
