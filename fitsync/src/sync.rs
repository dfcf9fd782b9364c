//! fitsync-sync - CLI tool to normalize downloaded fitness archives
//!
//! This tool finds the day folders that still need processing, checks that
//! each one is fully downloaded, and writes the normalized records to the
//! fitsync database.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/fitsync/data.db (~/.local/share/fitsync/data.db)
//! - Logs: $XDG_STATE_HOME/fitsync/fitsync.log (~/.local/state/fitsync/fitsync.log)
//! - Config: $XDG_CONFIG_HOME/fitsync/config.toml (~/.config/fitsync/config.toml)

mod process_lock;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use fitsync_core::archive::Completeness;
use fitsync_core::ingest::{IngestCoordinator, SyncPlan, SyncResult};
use fitsync_core::{Config, Database};
use indicatif::{ProgressBar, ProgressStyle};
use process_lock::acquire_sync_guard;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fitsync-sync")]
#[command(about = "Normalize downloaded fitness tracker archives into the database")]
#[command(version)]
struct Args {
    /// Config file (defaults to $XDG_CONFIG_HOME/fitsync/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Archive root, overriding `archive.root` from the config
    #[arg(long, value_name = "DIR")]
    archive: Option<PathBuf>,

    /// Dry run - list candidate days and their completeness, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Verbose output (-v per-day detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if let Some(root) = &args.archive {
        let archive = config
            .archive
            .as_mut()
            .context("--archive needs an [archive] section with start_date in the config")?;
        archive.root = root.clone();
    }

    // Initialize logging
    let _log_guard =
        fitsync_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("fitsync-sync starting");

    // Resolve database path and enforce process-level exclusivity for it.
    let db_path = config.resolved_database_path();
    let sync_guard = acquire_sync_guard(&db_path).context("failed to acquire process lock")?;
    tracing::debug!(lock = %sync_guard.lock_path().display(), "Holding sync lock");

    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    println!("Database: {}", db_path.display());

    let coordinator =
        IngestCoordinator::from_config(db, &config).context("invalid archive configuration")?;
    println!("Archive:  {}", coordinator.scheduler().archive_root().display());

    if args.dry_run {
        let plan = coordinator.plan().context("failed to plan sync")?;
        print_plan(&plan);
        println!("\nDry run - no sync performed");
        tracing::info!("Dry run complete");
        return Ok(());
    }

    run_single_sync(&coordinator, &args)
}

/// Run a single sync operation with progress bar
fn run_single_sync(coordinator: &IngestCoordinator<Database>, args: &Args) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let result = coordinator
        .sync_all_with_progress(|current, total, path| {
            if current == 0 {
                pb.set_length(total as u64);
            }
            pb.set_position(current as u64);
            pb.set_message(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("...")
                    .to_string(),
            );
        })
        .context("sync failed")?;

    pb.finish_and_clear();

    print_sync_result(&result, args.verbose);

    tracing::info!(
        days_processed = result.days_processed,
        records_written = result.records_written,
        "fitsync-sync complete"
    );

    Ok(())
}

/// Print candidate days for a dry run
fn print_plan(plan: &SyncPlan) {
    println!("Resume point: {}", plan.resume_point);
    println!("\nCandidate days ({}):", plan.days.len());
    for day in &plan.days {
        match &day.completeness {
            Completeness::Complete => println!("  {}  complete", day.date),
            Completeness::Incomplete { missing } => {
                println!("  {}  incomplete (missing: {})", day.date, missing.join(", "))
            }
        }
    }
}

/// Print sync result summary
fn print_sync_result(result: &SyncResult, verbose: u8) {
    println!("\nSync complete:");
    if let Some(resume_point) = result.resume_point {
        println!("  Resume point:    {}", resume_point);
    }
    println!("  Days processed:  {}", result.days_processed);
    println!("  Days skipped:    {}", result.days_skipped.len());
    println!("  Records written: {}", result.records_written);
    println!("  Commits:         {}", result.commits);

    // -v: per-day details
    if verbose >= 1 && !result.days.is_empty() {
        println!("\nDays synced:");
        for day in &result.days {
            println!(
                "  {}: {} heart rate, {} sleep, {} activities, {} track points ({} records)",
                day.date,
                day.heart_rate_samples,
                day.sleep_samples,
                day.activities,
                day.track_points,
                day.total_records
            );
        }
    }

    if !result.days_skipped.is_empty() {
        println!("\nIncomplete days left for a later run:");
        for skipped in &result.days_skipped {
            println!("  {}: missing {}", skipped.date, skipped.missing.join(", "));
        }
    }
}
