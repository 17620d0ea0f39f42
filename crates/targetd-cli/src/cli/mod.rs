//! CLI for the targetd refresh daemon.

mod commands;
mod event_log;
mod file_source;
mod signals;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use targetd_core::config::{self, TargetdConfig};

use commands::{run_daemon, run_once, show_config};

/// Top-level CLI for targetd.
#[derive(Debug, Parser)]
#[command(name = "targetd")]
#[command(about = "targetd: keeps publishing targets fresh from a discovery source", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the refresh scheduler until SIGINT/SIGTERM. SIGHUP requests a refresh.
    Run {
        /// JSON file listing targets (overrides `targets_path` in config.toml).
        #[arg(long, value_name = "PATH")]
        targets: Option<PathBuf>,
        /// Log to stderr instead of the state-dir log file.
        #[arg(long)]
        foreground: bool,
    },

    /// Run a single refresh cycle and print the resulting status as JSON.
    Once {
        /// JSON file listing targets (overrides `targets_path` in config.toml).
        #[arg(long, value_name = "PATH")]
        targets: Option<PathBuf>,
    },

    /// Show the config file path and effective settings.
    Config,
}

impl Cli {
    /// Only the long-running daemon logs to a file by default.
    pub fn logs_to_stderr(&self) -> bool {
        match &self.command {
            CliCommand::Run { foreground, .. } => *foreground,
            CliCommand::Once { .. } | CliCommand::Config => true,
        }
    }

    pub async fn run(self) -> Result<()> {
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match self.command {
            CliCommand::Run { targets, .. } => {
                let path = targets_path(&cfg, targets.as_deref())?;
                run_daemon(&cfg, &path).await?;
            }
            CliCommand::Once { targets } => {
                let path = targets_path(&cfg, targets.as_deref())?;
                run_once(&cfg, &path).await?;
            }
            CliCommand::Config => show_config(&cfg)?,
        }

        Ok(())
    }
}

/// `--targets` wins over the config file.
fn targets_path(cfg: &TargetdConfig, flag: Option<&Path>) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| cfg.targets_path.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("no targets file: pass --targets or set targets_path in config.toml")
        })
}

#[cfg(test)]
mod tests;
