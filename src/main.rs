//! # ADAS Scrub CLI (`scrub`)
//!
//! Match collision-repair estimates against OEM ADAS calibration rules,
//! keep scrubbed reports in SQLite, and gate them for submission.
//!
//! ## Usage
//!
//! ```bash
//! scrub --config ./config/scrub.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scrub init` | Create the SQLite database and run schema migrations |
//! | `scrub scrub --year --make --model <file>` | One-off scrub of an estimate file (JSON output) |
//! | `scrub report add ... <file>` | Store a new draft report |
//! | `scrub report list` | List stored reports |
//! | `scrub rescrub <id> [--overrides <file>]` | Re-scrub a stored report, applying reviewer overrides |
//! | `scrub assess <id>` | Completeness assessment of a stored report |
//! | `scrub status <id> <status>` | Change workflow status (gated for `ready_to_submit`) |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use adas_scrub::app::ScrubApp;
use adas_scrub::config;
use adas_scrub::migrate;
use adas_scrub::sqlite_store::NewReport;
use adas_scrub_core::models::{ReportMetadata, VehicleDescriptor};
use adas_scrub_core::overrides::ManualOverrides;
use adas_scrub_core::workflow::WorkflowStatus;

/// ADAS Scrub CLI: estimate-to-calibration matching.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/scrub.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "scrub",
    about = "ADAS Scrub: match collision-repair estimates against OEM calibration rules",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/scrub.toml")]
    config: PathBuf,

    /// Caller identity used for rate limiting.
    #[arg(long, global = true, default_value = "cli")]
    caller: String,

    #[command(subcommand)]
    command: Commands,
}

/// Vehicle identification shared by `scrub` and `report add`.
#[derive(clap::Args)]
struct VehicleArgs {
    /// Model year.
    #[arg(long)]
    year: i32,

    /// Manufacturer, e.g. `Toyota` or `Mercedes-Benz`.
    #[arg(long)]
    make: String,

    /// Model name.
    #[arg(long)]
    model: String,
}

impl VehicleArgs {
    fn descriptor(&self) -> VehicleDescriptor {
        VehicleDescriptor {
            year: self.year,
            make: self.make.clone(),
            model: self.model.clone(),
        }
    }
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Scrub an estimate file without storing anything.
    ///
    /// Prints matches, grouped calibrations, and detected repairs as JSON.
    Scrub {
        #[command(flatten)]
        vehicle: VehicleArgs,

        /// Estimate text file.
        file: PathBuf,
    },

    /// Manage stored reports.
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Re-scrub a stored report and save the result if it changed.
    Rescrub {
        /// Report ID.
        id: String,

        /// JSON file with `{ "add": [...], "remove": [...] }` overrides.
        #[arg(long)]
        overrides: Option<PathBuf>,
    },

    /// Print the completeness assessment of a stored report.
    Assess {
        /// Report ID.
        id: String,
    },

    /// Change the workflow status of a report.
    ///
    /// Moving to `ready_to_submit` requires a passing assessment.
    Status {
        /// Report ID.
        id: String,

        /// Target status: draft, in_review, ready_to_submit, submitted.
        status: String,
    },
}

/// Report subcommands.
#[derive(Subcommand)]
enum ReportAction {
    /// Store a new draft report and print its ID.
    Add {
        #[command(flatten)]
        vehicle: VehicleArgs,

        /// Estimate text file.
        file: PathBuf,

        #[arg(long)]
        vin: Option<String>,

        /// Repair order or estimate reference number.
        #[arg(long)]
        reference: Option<String>,

        #[arg(long)]
        shop: Option<String>,

        #[arg(long)]
        claim: Option<String>,

        /// Estimate date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// OEM position statement or procedure URL.
        #[arg(long)]
        oem_url: Option<String>,
    },

    /// List stored reports, most recently updated first.
    List,
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let app = ScrubApp::open(cfg).await?;
    let caller = cli.caller.as_str();

    match cli.command {
        Commands::Init => {}
        Commands::Scrub { vehicle, file } => {
            let text = read_text(&file)?;
            let outcome = app.scrub_text(caller, &vehicle.descriptor(), &text).await?;
            print_json(&outcome)?;
        }
        Commands::Report { action } => match action {
            ReportAction::Add {
                vehicle,
                file,
                vin,
                reference,
                shop,
                claim,
                date,
                oem_url,
            } => {
                let report = NewReport {
                    vehicle: vehicle.descriptor(),
                    estimate_text: read_text(&file)?,
                    metadata: ReportMetadata {
                        vin,
                        reference_number: reference,
                        shop_name: shop,
                        claim_number: claim,
                        estimate_date: date,
                    },
                    oem_source_url: oem_url,
                };
                let id = app.create_report(caller, &report).await?;
                println!("{}", id);
            }
            ReportAction::List => {
                let reports = app.list_reports(caller).await?;
                if reports.is_empty() {
                    println!("No reports.");
                }
                for r in reports {
                    println!(
                        "{}  {:<16} {:<8} {}  {}",
                        r.id,
                        r.status,
                        if r.scrubbed { "scrubbed" } else { "-" },
                        r.updated_at,
                        r.vehicle
                    );
                }
            }
        },
        Commands::Rescrub { id, overrides } => {
            let overrides: ManualOverrides = match overrides {
                Some(path) => serde_json::from_str(&read_text(&path)?)
                    .with_context(|| format!("Failed to parse overrides file: {}", path.display()))?,
                None => ManualOverrides::default(),
            };
            let report = app.rescrub_report(caller, &id, &overrides).await?;
            print_json(&report)?;
        }
        Commands::Assess { id } => {
            let assessment = app.assess_report(caller, &id).await?;
            print_json(&assessment)?;
        }
        Commands::Status { id, status } => {
            let target: WorkflowStatus = status.parse()?;
            let assessment = app.transition_status(caller, &id, target).await?;
            println!("Report {} is now {} (score {}).", id, target, assessment.score);
        }
    }

    Ok(())
}
