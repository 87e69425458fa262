//! Command-line interface definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "sensorsync",
    about = "Sample sensor log workbooks and sync them to ServiceNow",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync a sensor log workbook into the remote record store
    Sync(SyncArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Path to the .xlsx workbook to sync
    #[arg(short, long)]
    pub file: PathBuf,

    /// Optional TOML file overriding the destination field schema
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Update matched records instead of skipping them
    #[arg(long)]
    pub update: bool,

    /// Show the records that would be synced without touching the remote store
    #[arg(long)]
    pub dry_run: bool,
}
