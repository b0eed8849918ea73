//! Agora CLI
//!
//! Maintenance and load tooling for the Agora mutation layer

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use agora_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "agora")]
#[command(about = "Agora - social content mutation engine", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Database path, overriding the configuration file
    #[arg(long, global = true, env = "AGORA_DB")]
    db: Option<PathBuf>,

    /// Log profile: development, production or test
    #[arg(long, global = true, env = "AGORA_LOG", default_value = "development")]
    log: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Delete every row and restart id sequences
    Reset(commands::reset::ResetArgs),
    /// Drive seeded random traffic through the dispatch pool
    Simulate(commands::simulate::SimulateArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging_facility::init(cli.log);

    let result = match commands::load_config(cli.config.as_deref(), cli.db) {
        Ok(config) => match cli.command {
            Commands::Migrate => commands::migrate::execute(&config),
            Commands::Reset(args) => commands::reset::execute(&config, args).await,
            Commands::Simulate(args) => commands::simulate::execute(&config, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
