//! Sync command handler

use anyhow::{Context, Result};
use colored::*;

use crate::api::ServiceNowClient;
use crate::cli::SyncArgs;
use crate::config::{FieldSchema, Settings};
use crate::source::load_workbook;
use crate::sync::reconcile::{KindOutcome, SyncReport};
use crate::sync::resolver::SensorTypeResolver;
use crate::sync::{collect_candidates, run_sync};

/// Handle the sync command; returns the report so main can apply the exit contract.
pub async fn handle_sync_command(args: SyncArgs) -> Result<SyncReport> {
    let mut settings = Settings::from_env()?;
    if args.update {
        settings.update_existing = true;
    }

    let schema = match &args.schema {
        Some(path) => FieldSchema::load(path)
            .with_context(|| format!("Failed to load field schema: {}", path.display()))?,
        None => FieldSchema::default(),
    };

    if !args.file.exists() {
        anyhow::bail!("Workbook does not exist: {}", args.file.display());
    }

    let sheets = load_workbook(&args.file)?;
    log::info!(
        "Loaded {} sheet(s) from {}",
        sheets.len(),
        args.file.display()
    );

    if args.dry_run {
        // No remote reads on a dry run; sensor types fall back to the default id.
        let resolver = SensorTypeResolver::with_default(&settings.default_sensor_type);
        let (events, measurements) = collect_candidates(&sheets, &resolver, &settings);
        println!(
            "{} {} event record(s), {} measurement record(s)",
            "dry run:".cyan().bold(),
            events.len(),
            measurements.len()
        );
        for candidate in events.iter().chain(measurements.iter()) {
            println!("  {}", candidate.describe().dimmed());
        }
        return Ok(SyncReport::default());
    }

    let client = ServiceNowClient::new(&settings)?;
    let report = run_sync(&sheets, &client, &settings, &schema).await;

    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &SyncReport) {
    println!();
    println!("{}", "Sync Summary".bold());
    print_kind("events", &report.events);
    print_kind("measurements", &report.measurements);
    let overall = report.overall();
    println!(
        "  {} {} created, {} updated, {} skipped, {} failed ({} total)",
        "overall:".bold(),
        overall.created.to_string().green(),
        overall.updated,
        overall.skipped,
        if overall.failed > 0 {
            overall.failed.to_string().red()
        } else {
            overall.failed.to_string().normal()
        },
        overall.total()
    );
}

fn print_kind(label: &str, outcome: &KindOutcome) {
    println!(
        "  {label}: {} created, {} updated, {} skipped, {} failed",
        outcome.created, outcome.updated, outcome.skipped, outcome.failed
    );
}
