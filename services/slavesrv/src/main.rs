//! slavesrv - Modbus gateway slave node

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use serde::Deserialize;
use tracing::{error, info, warn};

use slavesrv::bus::LocalRegistry;
use slavesrv::source::BusSourceManager;
use slavesrv::SlaveManager;

#[derive(Parser, Debug)]
#[command(author, version, about = "Modbus gateway slave node")]
struct Args {
    /// Settings file
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SLAVESRV_CONFIG",
        default_value = "config/slavesrv.toml"
    )]
    config: PathBuf,

    /// Default log level (RUST_LOG overrides)
    #[arg(long, env = "SLAVESRV_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write daily-rolling log files here
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

/// Entry of the `slaves` settings list
#[derive(Debug, Deserialize)]
struct SlaveSeed {
    id: u8,
    #[serde(default)]
    name: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = common::logging::LogConfig {
        console_level: args.log_level.parse().unwrap_or(tracing::Level::INFO),
        log_dir: args.log_dir.clone(),
        ..Default::default()
    };
    if let Err(e) = common::logging::init_with_config(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let registry = Arc::new(LocalRegistry::new());
    let sources = Arc::new(BusSourceManager::new(registry.clone()));
    let manager = SlaveManager::new(registry.clone(), sources);

    if let Err(e) = manager.start(&args.config) {
        error!("Startup failed: {}", e);
        return ExitCode::from(e.exit_code() as u8);
    }

    if let Err(e) = provision(&manager) {
        warn!("Slave provisioning incomplete: {:#}", e);
    }
    info!("Serving {} object(s)", registry.object_count());

    let signal = common::wait_for_shutdown().await;
    info!("Received {}, shutting down", signal);

    for slave in manager.slaves() {
        if let Err(e) = manager.slave_destroy(slave.path()) {
            warn!("Failed to destroy {}: {}", slave.path(), e);
        }
    }
    manager.stop();

    ExitCode::SUCCESS
}

/// Create the slaves listed under `slaves` in the settings
fn provision(manager: &SlaveManager) -> anyhow::Result<()> {
    let Some(settings) = manager.settings() else {
        return Ok(());
    };
    let seeds: Vec<SlaveSeed> = settings
        .get("slaves")
        .context("reading 'slaves' from settings")?
        .unwrap_or_default();

    for seed in seeds {
        manager
            .slave_create(seed.id, &seed.name)
            .with_context(|| format!("creating slave {}", seed.id))?;
    }
    Ok(())
}
