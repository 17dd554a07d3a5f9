mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use rowgate_core::EngineConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_level);

    let output = match &cli.command {
        Commands::Compile(args) => commands::compile(args, &config)?,
        Commands::Evaluate(args) => commands::evaluate(args, &config)?,
        Commands::Inspect(args) => commands::inspect(args, &config)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the configured level
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
