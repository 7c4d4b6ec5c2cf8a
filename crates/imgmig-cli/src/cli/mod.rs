//! CLI for imgmig.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use imgmig_core::config;
use std::path::PathBuf;

use commands::{run_download, run_migration, run_status, run_upload};

/// Top-level CLI for imgmig.
#[derive(Debug, Parser)]
#[command(name = "imgmig")]
#[command(about = "imgmig: resumable image migration from a source catalog to a media server", long_about = None)]
pub struct Cli {
    /// Staging directory (overrides config.toml and IMGMIG_STAGING_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every catalog record, then upload every staged file.
    Run,

    /// Download phase only: stage every catalog record locally.
    Download,

    /// Upload phase only: send staged, not yet transferred files.
    Upload,

    /// Show staging directory counts.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cfg.apply_process_env();
        if let Some(dir) = cli.staging_dir {
            cfg.staging_dir = dir;
        }
        tracing::debug!(
            staging_dir = %cfg.staging_dir.display(),
            page_size = cfg.page_size,
            "loaded config"
        );

        match cli.command {
            CliCommand::Run => run_migration(&cfg).await?,
            CliCommand::Download => run_download(&cfg).await?,
            CliCommand::Upload => run_upload(&cfg).await?,
            CliCommand::Status => run_status(&cfg).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
