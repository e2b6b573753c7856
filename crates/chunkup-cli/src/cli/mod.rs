//! CLI for chunkup.

mod commands;

use anyhow::Result;
use chunkup_core::config::{self, ChunkupConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use commands::{run_checksum, run_completions, run_man, run_plan, run_upload};

/// Top-level CLI for chunkup.
#[derive(Debug, Parser)]
#[command(name = "chunkup")]
#[command(about = "chunkup: chunked zip upload with server-side patch", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/chunkup/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload a zip file in chunks and ask the server to patch it in.
    Upload {
        /// Path to the .zip file.
        path: PathBuf,
        /// Storage server base URL (overrides server_url from config).
        #[arg(long, value_name = "URL")]
        server: Option<String>,
        /// Upload at most N chunks at once (default: all).
        #[arg(long, value_name = "N")]
        max_concurrent: Option<usize>,
    },

    /// Compute the MD5 digest the server verifies after assembly.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Bytes read per step (default: checksum_chunk_size from config).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Show how a file would be split into upload chunks, without uploading.
    Plan {
        /// Path to the file.
        path: PathBuf,
        /// Chunk size in bytes (default: upload_chunk_size from config).
        #[arg(long, value_name = "BYTES")]
        chunk_size: Option<u64>,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff) to stdout.
    Man,
}

fn load_config(path: Option<&Path>) -> Result<ChunkupConfig> {
    let cfg = match path {
        Some(p) => config::load_or_init_at(p)?,
        None => config::load_or_init()?,
    };
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<ExitCode> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => run_completions(shell),
            CliCommand::Man => run_man()?,
            CliCommand::Upload {
                path,
                server,
                max_concurrent,
            } => {
                let mut cfg = load_config(cli.config.as_deref())?;
                if let Some(url) = server {
                    cfg.server_url = url;
                }
                if max_concurrent.is_some() {
                    cfg.max_concurrent_uploads = max_concurrent;
                }
                cfg.validate()?;
                return run_upload(&cfg, &path).await;
            }
            CliCommand::Checksum { path, chunk_size } => {
                let cfg = load_config(cli.config.as_deref())?;
                run_checksum(&path, chunk_size.unwrap_or(cfg.checksum_chunk_size)).await?;
            }
            CliCommand::Plan { path, chunk_size } => {
                let cfg = load_config(cli.config.as_deref())?;
                run_plan(&path, chunk_size.unwrap_or(cfg.upload_chunk_size)).await?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests;
