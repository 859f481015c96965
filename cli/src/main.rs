use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod host;
mod output;
pub mod ux_error;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = host::load_config(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.logging_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let responder = host::build(config).await?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(&responder, args).await,
        Commands::Status(args) => commands::status::run(&responder, args),
        Commands::Connectivity(args) => commands::connectivity::run(&responder, args),
        Commands::Config(cmd) => commands::subject_config::run(&responder, cmd).await,
        Commands::Fallbacks(cmd) => commands::fallbacks::run(&responder, cmd),
        Commands::Sync(args) => commands::sync::run(&responder, args).await,
    }
}
