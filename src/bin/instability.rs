//! Instability CLI - Command-line interface for the academic instability engine
//!
//! Commands:
//! - prepare-data: Score the cohort and cache the snapshot
//! - show-student: Show one student's signals, pressures, and outputs
//! - export-snapshot: Export the scored cohort to CSV
//! - simulate: Run a what-if intervention for one student
//! - cohort: Summarize the cohort by early-warning zone

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use academic_instability::cohort::{filter_by_zone, select_record, zone_summary};
use academic_instability::counterfactual::{evaluate_counterfactual, Intervention};
use academic_instability::source::{columns, export_csv};
use academic_instability::{
    InstabilityError, ScoredCohort, ScoredRecord, Settings, SnapshotStore, Zone, ENGINE_VERSION,
    PRODUCER_NAME,
};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Project-specific log filter, checked before RUST_LOG
const LOG_ENV: &str = "INSTABILITY_LOG";

/// Academic Instability Early Warning System
#[derive(Parser)]
#[command(name = "instability")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Academic Instability Early Warning System", long_about = None)]
struct Cli {
    /// Project base directory (defaults to $INSTABILITY_BASE_DIR or the current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Raw cohort CSV (defaults to <base>/data/raw/student_performance_analysis.csv)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute instability outputs and cache the snapshot
    PrepareData {
        /// Delete the cached snapshot and recompute
        #[arg(long)]
        refresh: bool,
    },

    /// Show details for one student
    ShowStudent {
        /// Row index in the cohort
        #[arg(long)]
        index: Option<usize>,

        /// Student identifier (takes precedence over --index)
        #[arg(long)]
        id: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the full scored cohort to CSV
    ExportSnapshot {
        /// Output path (defaults to <base>/reports/metrics/instability_snapshot.csv)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Test a what-if intervention on one student
    Simulate {
        /// Row index in the cohort
        #[arg(long)]
        index: usize,

        /// Change in hours studied
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        hours_delta: f64,

        /// Change in attendance percent
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        attendance_delta: f64,

        /// Change in assignments completed
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        assignments_delta: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize the cohort by early-warning zone
    Cohort {
        /// List students in these zones
        #[arg(long, value_enum)]
        zone: Vec<ZoneArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoneArg {
    Stable,
    Fragile,
    Unstable,
    Critical,
}

impl From<ZoneArg> for Zone {
    fn from(z: ZoneArg) -> Self {
        match z {
            ZoneArg::Stable => Zone::Stable,
            ZoneArg::Fragile => Zone::Fragile,
            ZoneArg::Unstable => Zone::Unstable,
            ZoneArg::Critical => Zone::Critical,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log filter priority: `INSTABILITY_LOG` > `RUST_LOG` > `-v`/`-q` > `warn`
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .without_time()
                .compact(),
        )
        .init();
}

fn resolve_settings(cli: &Cli) -> Settings {
    let settings = match &cli.base_dir {
        Some(dir) => Settings::with_base_dir(dir),
        None => Settings::from_env(),
    };
    match &cli.source {
        Some(path) => settings.with_raw_source(path.clone()),
        None => settings,
    }
}

fn run(cli: Cli) -> Result<(), InstabilityError> {
    let settings = resolve_settings(&cli);
    let store = SnapshotStore::new(&settings);

    match cli.command {
        Commands::PrepareData { refresh } => cmd_prepare_data(&store, refresh),
        Commands::ShowStudent { index, id, json } => {
            cmd_show_student(&store.load_processed()?, index, id.as_deref(), json)
        }
        Commands::ExportSnapshot { out } => {
            let out = out.unwrap_or_else(|| settings.default_export_path());
            export_csv(&store.load_processed()?, &out)?;
            println!("Saved snapshot to: {}", out.display());
            Ok(())
        }
        Commands::Simulate {
            index,
            hours_delta,
            attendance_delta,
            assignments_delta,
            json,
        } => cmd_simulate(
            &store.load_processed()?,
            index,
            Intervention::new(hours_delta, attendance_delta, assignments_delta),
            json,
        ),
        Commands::Cohort { zone, json } => {
            let zones: Vec<Zone> = zone.into_iter().map(Zone::from).collect();
            cmd_cohort(&store.load_processed()?, &zones, json)
        }
    }
}

fn cmd_prepare_data(store: &SnapshotStore, refresh: bool) -> Result<(), InstabilityError> {
    if refresh {
        store.invalidate()?;
    }
    let cohort = store.load_processed()?;

    println!("Prepared processed dataset with {} rows.", cohort.len());
    println!("Columns:");
    println!("{}", columns::EXPORT.join(", "));
    Ok(())
}

fn cmd_show_student(
    cohort: &ScoredCohort,
    index: Option<usize>,
    id: Option<&str>,
    json: bool,
) -> Result<(), InstabilityError> {
    let row = select_record(cohort, index, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(row)?);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    write_student(&mut out, row)?;
    Ok(())
}

/// Text rendering of one scored record, grouped like the export columns
fn write_student<W: Write>(out: &mut W, row: &ScoredRecord) -> std::io::Result<()> {
    writeln!(out, "Student:")?;
    writeln!(out, "- {}: {}", columns::STUDENT_ID, row.display_id())?;
    if let Some(gender) = &row.record.gender {
        writeln!(out, "- {}: {}", columns::GENDER, gender)?;
    }

    writeln!(out, "\nSignals:")?;
    writeln!(out, "- {}: {}", columns::HOURS, row.record.hours_studied)?;
    writeln!(out, "- {}: {}", columns::ATTENDANCE, row.record.attendance_percent)?;
    writeln!(out, "- {}: {}", columns::ASSIGNMENTS, row.record.assignments_completed)?;
    writeln!(out, "- {}: {}", columns::TEST_SCORE, row.record.test_score)?;

    writeln!(out, "\nScales:")?;
    writeln!(out, "- {}: {}", columns::HOURS_NORM, row.scales.hours)?;
    writeln!(out, "- {}: {}", columns::ATTENDANCE_NORM, row.scales.attendance)?;
    writeln!(out, "- {}: {}", columns::ASSIGNMENTS_NORM, row.scales.assignments)?;

    writeln!(out, "\nPressures:")?;
    writeln!(out, "- {}: {:.3}", columns::PRESSURE_LOAD, row.pressures.cognitive_load)?;
    writeln!(out, "- {}: {:.3}", columns::PRESSURE_ATTENDANCE, row.pressures.attendance)?;
    writeln!(out, "- {}: {:.3}", columns::PRESSURE_ENGAGEMENT, row.pressures.engagement)?;

    writeln!(out, "\nOutputs:")?;
    writeln!(out, "- {}: {:.3}", columns::BUFFER, row.buffer_strength)?;
    writeln!(out, "- {}: {:.3}", columns::INSTABILITY, row.instability_index)?;
    writeln!(out, "- {}: {}", columns::ZONE, row.zone)?;
    Ok(())
}

fn cmd_simulate(
    cohort: &ScoredCohort,
    index: usize,
    intervention: Intervention,
    json: bool,
) -> Result<(), InstabilityError> {
    let outcome = evaluate_counterfactual(cohort, index, intervention)?;

    if json {
        let report = SimulationReport {
            producer: PRODUCER_NAME,
            index,
            intervention,
            instability_before: outcome.before.instability_index,
            instability_after: outcome.after.instability_index,
            instability_delta: outcome.instability_delta(),
            zone_before: outcome.before.zone,
            zone_after: outcome.after.zone,
            pressures: outcome.pressure_changes(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Intervention for {}", outcome.before.label());
    println!("=================");
    println!("Instability (before): {:.3}", outcome.before.instability_index);
    println!("Instability (after):  {:.3}", outcome.after.instability_index);
    println!("Δ Instability:        {:+.3}", outcome.instability_delta());
    println!("Zone: {} -> {}", outcome.before.zone, outcome.after.zone);

    println!("\nPressure Comparison:");
    println!("  {:<16} {:>8} {:>8} {:>8}", "Pressure", "Before", "After", "Δ");
    for change in outcome.pressure_changes() {
        println!(
            "  {:<16} {:>8.3} {:>8.3} {:>+8.3}",
            change.pressure,
            change.before,
            change.after,
            change.delta()
        );
    }

    println!("\nA negative Δ means instability decreased.");
    Ok(())
}

fn cmd_cohort(cohort: &ScoredCohort, zones: &[Zone], json: bool) -> Result<(), InstabilityError> {
    let summary = zone_summary(cohort);
    let members: Vec<&ScoredRecord> = if zones.is_empty() {
        Vec::new()
    } else {
        filter_by_zone(cohort, zones)
    };

    if json {
        let report = CohortReport {
            producer: PRODUCER_NAME,
            rows: cohort.len(),
            thresholds: [
                cohort.thresholds.p50,
                cohort.thresholds.p75,
                cohort.thresholds.p90,
            ],
            zones: summary,
            students: members.into_iter().cloned().collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cohort Instability Map ({} students)", cohort.len());
    println!("======================");
    println!(
        "Thresholds: p50={:.3} p75={:.3} p90={:.3}",
        cohort.thresholds.p50, cohort.thresholds.p75, cohort.thresholds.p90
    );
    println!();
    println!("  {:<10} {:>6} {:>12} {:>12}", "Zone", "Count", "Buffer", "Instability");
    for stats in &summary {
        println!(
            "  {:<10} {:>6} {:>12} {:>12}",
            stats.zone.as_str(),
            stats.count,
            fmt_mean(stats.mean_buffer_strength),
            fmt_mean(stats.mean_instability)
        );
    }

    if !members.is_empty() {
        println!("\nStudents:");
        for r in members {
            println!("  {} | instability {:.3}", r.label(), r.instability_index);
        }
    }
    Ok(())
}

fn fmt_mean(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

// Error types

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<InstabilityError> for CliError {
    fn from(e: InstabilityError) -> Self {
        let (code, hint) = match &e {
            InstabilityError::SourceNotFound(_) => (
                "SOURCE_NOT_FOUND",
                Some("Pass --source or place the CSV under data/raw/"),
            ),
            InstabilityError::IndexOutOfRange { .. } => (
                "INDEX_OUT_OF_RANGE",
                Some("Run 'instability cohort' to see the cohort size"),
            ),
            InstabilityError::IdNotFound(_) => {
                ("ID_NOT_FOUND", Some("Check the student_id column"))
            }
            InstabilityError::InvalidSelector => {
                ("INVALID_SELECTOR", Some("Provide --index or --id"))
            }
            InstabilityError::EmptyCohort => {
                ("EMPTY_COHORT", Some("Ensure the source has data rows"))
            }
            InstabilityError::SnapshotCorrupt(_) => (
                "SNAPSHOT_CORRUPT",
                Some("Run 'instability prepare-data --refresh'"),
            ),
            InstabilityError::Csv(_) => ("CSV_ERROR", Some("Check the delimited text syntax")),
            InstabilityError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            InstabilityError::Json(_) => (
                "JSON_ERROR",
                Some("Run 'instability prepare-data --refresh'"),
            ),
        };

        CliError {
            code: code.to_string(),
            message: e.to_string(),
            hint: hint.map(str::to_string),
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct SimulationReport {
    producer: &'static str,
    index: usize,
    intervention: Intervention,
    instability_before: f64,
    instability_after: f64,
    instability_delta: f64,
    zone_before: Zone,
    zone_after: Zone,
    pressures: Vec<academic_instability::counterfactual::PressureChange>,
}

#[derive(serde::Serialize)]
struct CohortReport {
    producer: &'static str,
    rows: usize,
    thresholds: [f64; 3],
    zones: Vec<academic_instability::ZoneStats>,
    students: Vec<ScoredRecord>,
}
