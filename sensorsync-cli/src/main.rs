use clap::Parser;
use colored::*;
use env_logger::Env;

mod api;
mod cli;
mod config;
mod source;
mod sync;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sync(args) => cli::commands::sync::handle_sync_command(args).await,
    };

    match result {
        Ok(report) => {
            // Partial failure still exits 0; only an all-failed run is fatal.
            if report.is_hard_failure() {
                eprintln!(
                    "{} every attempted record failed ({} failures)",
                    "error:".red().bold(),
                    report.overall().failed
                );
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}
