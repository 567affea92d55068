pub mod chat;
pub mod config;
pub mod copilot;
pub mod dataset;
pub mod render;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// OnThesis client for the analyst agent.
#[derive(Debug, Parser)]
#[command(name = "onthesis", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a single message to the analyst agent and print the answer.
    Run {
        /// The message to send.
        message: String,
        /// Conversation id (a new one is generated when omitted).
        #[arg(long)]
        conversation: Option<String>,
        /// JSON dataset to analyse: an array of records, or
        /// `{"columns": [...], "rows": [[...]]}`.
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Print the final message as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },
    /// Interactive conversation over stdin.
    Chat {
        #[arg(long)]
        conversation: Option<String>,
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Ask the research copilot (non-streaming).
    Copilot {
        message: String,
        /// Research context as a JSON object.
        #[arg(long)]
        context: Option<String>,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `OT_CONFIG` (or `config.toml`
/// by default).  Returns the parsed config and the path that was used.
pub fn load_config() -> anyhow::Result<(ot_domain::config::Config, String)> {
    let config_path = std::env::var("OT_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

/// A missing file yields the defaults.
pub fn load_config_from(config_path: &str) -> anyhow::Result<ot_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(ot_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
