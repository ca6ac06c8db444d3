//! Runtime settings.
//!
//! Layered lowest to highest: defaults, optional `tickx.toml` (or `--config`),
//! `TICKX_*` environment variables, then command-line flags.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

pub const DEFAULT_ADDR: &str = "127.0.0.1:20033";
pub const DEFAULT_CONFIG_FILE: &str = "tickx";
pub const ENV_PREFIX: &str = "TICKX";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Address the listener binds.
    pub bind_addr: String,
    /// Address the sender streams to.
    pub target_addr: String,
    /// Directory receiving `<symbol>.csv` artifacts.
    pub output_dir: PathBuf,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .set_default("bind_addr", DEFAULT_ADDR)?
            .set_default("target_addr", DEFAULT_ADDR)?
            .set_default("output_dir", ".")?
            .set_default("log_filter", "info")?
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// Command-line flags win over every other layer.
    pub fn apply_cli(&mut self, command: &Command) {
        match command {
            Command::Listen { bind, out_dir } => {
                if let Some(bind) = bind {
                    self.bind_addr = bind.clone();
                }
                if let Some(dir) = out_dir {
                    self.output_dir = dir.clone();
                }
            }
            Command::Send { target, .. } => {
                if let Some(target) = target {
                    self.target_addr = target.clone();
                }
            }
        }
    }
}

/// tickx: collect price ticks over UDP and export one sorted CSV per symbol
#[derive(Parser, Debug)]
#[command(name = "tickx", version)]
pub struct Cli {
    /// Config file (defaults to ./tickx.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one ingestion session until ENDTRANSMISSION, then export
    Listen {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Stream a tick file line by line, then send ENDTRANSMISSION
    Send {
        file: PathBuf,
        #[arg(long)]
        target: Option<String>,
    },
}
