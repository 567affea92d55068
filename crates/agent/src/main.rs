use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use ot_agent::cli::{Cli, Command, ConfigCommand};
use ot_domain::config::LoggingConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            message,
            conversation,
            dataset,
            json,
        } => {
            let (config, _) = ot_agent::cli::load_config()?;
            init_tracing(&config.logging);
            ot_agent::cli::run::run(Arc::new(config), message, conversation, dataset, json).await
        }
        Command::Chat {
            conversation,
            dataset,
        } => {
            let (config, _) = ot_agent::cli::load_config()?;
            init_tracing(&config.logging);
            ot_agent::cli::chat::chat(Arc::new(config), conversation, dataset).await
        }
        Command::Copilot { message, context } => {
            let (config, _) = ot_agent::cli::load_config()?;
            init_tracing(&config.logging);
            ot_agent::cli::copilot::copilot(Arc::new(config), message, context).await
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = ot_agent::cli::load_config()?;
            if !ot_agent::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _) = ot_agent::cli::load_config()?;
            ot_agent::cli::config::show(&config)
        }
        Command::Version => {
            println!("onthesis {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout carries only answers.  `RUST_LOG` wins
/// over the configured filter.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(logging.filter.as_deref().unwrap_or("warn,ot_agent=info"))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
