use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use client_core::{HttpRemoteStore, RemoteStore};
use schedule_core::{ConsistencyCoordinator, DateWindowManager, ScheduleConfig};
use serde::Serialize;
use shared::protocol::{
    group_availability_rows, AllocationSheetRow, AvailabilitySheetRow, DateSheetRow,
    VolunteerSheetRow,
};

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    remote_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the horizon the window manager would generate from a start date.
    Horizon { start: String },
    /// Reset the remote dates sheet to a fresh horizon.
    Seed { start: String },
    /// Fetch all collections and print the per-date projections.
    Show,
    /// Dump all collections as sheets-style rows (JSON).
    Export,
    /// Resolve an access key to its role.
    ResolveKey { key: String },
}

#[derive(Debug, Serialize)]
struct SheetsExport {
    dates: Vec<DateSheetRow>,
    volunteers: Vec<VolunteerSheetRow>,
    availability: Vec<AvailabilitySheetRow>,
    allocations: Vec<AllocationSheetRow>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ScheduleConfig::default();

    match cli.command {
        Command::Horizon { start } => {
            let start: NaiveDate = start.parse()?;
            let window = DateWindowManager::generate_horizon(&config, start);
            for entry in window.active() {
                println!("{}", entry.date);
            }
        }
        Command::Seed { start } => {
            let start: NaiveDate = start.parse()?;
            let window = DateWindowManager::generate_horizon(&config, start);
            let remote = HttpRemoteStore::new(&cli.remote_url)?;
            remote.update_dates(window.active()).await?;
            println!("seeded {} dates", window.active().len());
        }
        Command::Show => {
            let remote = HttpRemoteStore::new(&cli.remote_url)?;
            let dates = remote.get_dates().await?;
            let volunteers = remote.get_volunteers().await?;
            let availability = remote.get_availability().await?;
            let allocations = remote.get_allocations().await?;

            let coordinator = ConsistencyCoordinator::from_remote(
                config,
                dates,
                &volunteers,
                group_availability_rows(availability),
                allocations,
            );
            for entry in coordinator.window().active() {
                let projection = coordinator.project_date(entry.date);
                println!("{}", entry.date);
                println!("  available: {}", projection.available_unallocated.join(", "));
                for (role, people) in &projection.allocated_by_role {
                    println!("  {role}: {}", people.join(", "));
                }
            }
        }
        Command::Export => {
            let remote = HttpRemoteStore::new(&cli.remote_url)?;
            let exported_at = Utc::now();
            let export = SheetsExport {
                dates: remote
                    .get_dates()
                    .await?
                    .iter()
                    .map(|entry| DateSheetRow::from_event(entry, exported_at))
                    .collect(),
                volunteers: remote
                    .get_volunteers()
                    .await?
                    .iter()
                    .map(|volunteer| VolunteerSheetRow::from_volunteer(volunteer, exported_at))
                    .collect(),
                availability: remote
                    .get_availability()
                    .await?
                    .iter()
                    .map(|row| AvailabilitySheetRow::from_row(row, exported_at))
                    .collect(),
                allocations: remote
                    .get_allocations()
                    .await?
                    .iter()
                    .map(|record| AllocationSheetRow::from_record(record, exported_at))
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&export)?);
        }
        Command::ResolveKey { key } => match config.access_keys.resolve(&key) {
            Some(role) => println!("{role:?}"),
            None => println!("unknown key"),
        },
    }

    Ok(())
}
