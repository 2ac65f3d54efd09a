#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the focomap sync simulator.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use foco_map_cli::scenario::Scenario;
use foco_map_cli::{ScenarioReport, run_scenario};
use foco_map_report_models::ReportStatus;
use foco_map_sync::SyncConfig;

#[derive(Parser)]
#[command(name = "foco_map_cli", about = "Breeding-site sync and alert simulator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario against a live sync session
    Simulate {
        /// Path to a scenario TOML file; the built-in demo runs when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Alert radius override in meters (takes precedence over the
        /// scenario file and `FOCOMAP_ALERT_RADIUS_M`)
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Validate a scenario file and list its steps
    Scenario {
        /// Path to a scenario TOML file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Simulate {
        scenario: None,
        radius: None,
    });

    match command {
        Commands::Simulate { scenario, radius } => {
            let scenario = match scenario {
                Some(path) => Scenario::load(&path)?,
                None => Scenario::demo(),
            };

            let mut config = SyncConfig::from_env();
            if let Some(radius_meters) = scenario.radius_meters {
                config.radius_meters = radius_meters;
            }
            if let Some(radius_meters) = radius {
                config.radius_meters = radius_meters;
            }

            let outcome = run_scenario(&scenario, config).await?;
            print_summary(&scenario, &outcome);
        }
        Commands::Scenario { file } => {
            let scenario = Scenario::load(&file)?;
            println!("Scenario: {}", scenario.name);
            if let Some(radius_meters) = scenario.radius_meters {
                println!("Alert radius: {radius_meters} m");
            }
            println!("{} step(s):", scenario.steps.len());
            for (index, step) in scenario.steps.iter().enumerate() {
                println!("{:>3}. {step}", index + 1);
            }
        }
    }

    Ok(())
}

fn print_summary(scenario: &Scenario, outcome: &ScenarioReport) {
    println!();
    println!("Scenario {:?} complete", scenario.name);
    println!(
        "  reports: {} total, {} pending, {} verified, {} resolved",
        outcome.reports.len(),
        outcome.status_count(ReportStatus::Pending),
        outcome.status_count(ReportStatus::Verified),
        outcome.status_count(ReportStatus::Resolved)
    );
    println!("  documents persisted: {}", outcome.documents);
    if let Some(region) = &outcome.region {
        println!(
            "  map region: center ({:.4}, {:.4}), span {:.4} x {:.4}",
            region.center.latitude,
            region.center.longitude,
            region.latitude_delta,
            region.longitude_delta
        );
    }
    println!("  alerts fired: {}", outcome.alerts.len());
    for alert in &outcome.alerts {
        println!("    report {} at {:.1} m", alert.report_id, alert.distance_meters);
    }
}
