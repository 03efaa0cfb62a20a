use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tug::{
    config::{Config, ConfigOverrides},
    logging::{init_logging, LoggingConfig},
    server::{shutdown_signal, Server},
    version,
};

#[derive(Parser, Debug)]
#[command(name = "tug")]
#[command(about = "Identity bridge that mints per-user slurmrestd credentials")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Path to configuration file (yaml)
    #[arg(long, env = "TUG_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config file)
    #[arg(long)]
    listen_addr: Option<String>,

    /// Slurmrestd URI (overrides config file)
    #[arg(long)]
    slurm_uri: Option<String>,

    /// JWT mode: auto or static (overrides config file)
    #[arg(long)]
    jwt_mode: Option<String>,

    /// Path to JWT signing key (overrides config file)
    #[arg(long)]
    jwt_key: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Show version information and exit
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information and exit
    #[arg(long)]
    version_verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_addr: self.listen_addr.clone(),
            slurm_uri: self.slurm_uri.clone(),
            jwt_mode: self.jwt_mode.clone(),
            jwt_key: self.jwt_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version_verbose {
        println!("{}", version::get_verbose_version_string());
        return Ok(());
    }
    if cli.version {
        println!("{}", version::get_version_string());
        return Ok(());
    }

    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        json_format: cli.log_json,
    })?;

    let config = Config::load(cli.config.as_deref(), cli.overrides())
        .context("failed to load configuration")?;

    info!(
        "Starting Tug daemon (Version: {}, Target: {}, AuthMode: {})",
        version::get_version(),
        config.slurmrestd.uri,
        config.slurmrestd.auth.mode
    );

    let server = Server::new(config).context("failed to initialize server")?;
    server
        .run(shutdown_signal())
        .await
        .context("graceful shutdown failed")?;

    info!("Server stopped successfully");
    Ok(())
}
