//! scionlab-config Entry Point
//!
//! Fetches and installs this host's SCIONLab configuration. Meant to be
//! run as root, periodically or by hand. Exits 1 on any fatal error.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use scionlab_config::agent::deploy::{Agent, RunOutcome};
use scionlab_config::cli::args::Args;
use scionlab_config::cli::config::{AgentConfig, LoggingConfig};
use scionlab_config::cli::config_info::ConfigInfo;
use scionlab_config::error::AgentError;
use scionlab_config::runtime::systemd::SystemdHost;

#[tokio::main]
async fn main() -> ExitCode {
    let result = match Args::from_env() {
        Ok(args) => run(args).await,
        Err(e) => {
            let _ = init_logging(&LoggingConfig::default(), false);
            Err(e)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AgentConfig::load_or_default(args.agent_config.as_deref());
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(&logging, args.verbose)?;
    let config = config?;

    if !nix::unistd::geteuid().is_root() {
        return Err(AgentError::NotRoot.into());
    }

    let host = Arc::new(SystemdHost::new());
    let agent = Agent::new(&config, host)?;

    if let Some(archive) = &args.tar {
        agent.install_local(archive).await?;
        return Ok(());
    }

    let info = ConfigInfo::resolve(&args.resolve_options(), &config.default_config_info_path())?;
    info!(host_id = %info.host_id, url = %info.url, "Checking for configuration updates");

    match agent.run(&info).await? {
        RunOutcome::Unchanged | RunOutcome::Empty => {}
        RunOutcome::Installed(report) => {
            info!(version = ?report.version, "Host configuration updated");
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        logging.level.parse().unwrap_or(Level::INFO)
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);

    match logging.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish()),
        "compact" => tracing::subscriber::set_global_default(builder.compact().finish()),
        _ => tracing::subscriber::set_global_default(builder.finish()),
    }
    .context("Failed to install logger")
}
