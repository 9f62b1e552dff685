use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use robohr_core::RobohrConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod commands;

#[derive(Parser, Debug)]
#[command(name = "robohr", version, about = "RoboHR command pipeline")]
struct Cli {
    /// Configuration file (YAML). Defaults apply when omitted.
    #[arg(long, short = 'c', global = true, env = "ROBOHR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP command server.
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one command through the pipeline and print the answer as JSON.
    Ask {
        /// The command, e.g. "clock me in".
        text: String,

        /// Employee id of the caller.
        #[arg(long)]
        employee_id: Option<i64>,

        /// Caller role: employee, manager or admin.
        #[arg(long, default_value = "employee")]
        role: String,

        #[arg(long, default_value = "en")]
        lang: String,

        /// Use the pattern recognizer and an in-memory demo store.
        #[arg(long, default_value_t = false)]
        offline: bool,
    },

    /// Print the supported commands, languages and features.
    Capabilities,

    /// Load and validate the configuration.
    Check {
        /// Also try to reach the intent service and the database.
        #[arg(long, default_value_t = false)]
        connect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `ask` and `capabilities` keep stdout clean JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { host, port } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve::run(config).await?
        }

        Command::Ask {
            text,
            employee_id,
            role,
            lang,
            offline,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let role = role.parse().map_err(anyhow::Error::msg)?;
            commands::ask::run(config, commands::ask::AskArgs {
                text,
                employee_id,
                role,
                lang,
                offline,
            })
            .await?
        }

        Command::Capabilities => {
            let config = load_config(cli.config.as_deref())?;
            commands::capabilities::run(config)?
        }

        Command::Check { connect } => commands::check::run(cli.config.as_deref(), connect).await?,
    }

    Ok(())
}

/// Read and validate the configuration, or fall back to defaults.
fn load_config(path: Option<&Path>) -> Result<RobohrConfig> {
    let config = match path {
        Some(path) => RobohrConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RobohrConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
