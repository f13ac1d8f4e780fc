use clap::Parser;

use pairwatch::Settings;
use pairwatch::cli::{Cli, Commands, commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration.");
        Settings::default()
    });

    pairwatch::logging::init_with_config(&config.logging);

    let result = match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&config),
        Commands::Scan { root } => commands::scan::run(&config, root),
        Commands::Watch { root, no_scan } => commands::watch::run(&config, root, no_scan).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
