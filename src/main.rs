//! Material planner
//!
//! Estimates a player's material inventory from the remote upgrade
//! calculator and exports it in GOOD format.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use mat_planner::client::{CalculatorService, HoyoLabClient};
use mat_planner::config::{DEFAULT_CHUNK_SIZE, DEFAULT_COUNT, Identity, PlannerConfig};
use mat_planner::{db, planner, selector};

#[derive(Parser)]
#[command(name = "mat-planner")]
#[command(about = "Estimate upgrade material inventory and export it as GOOD")]
struct Cli {
    /// Path to the SQLite catalog cache
    #[arg(short, long, default_value = "mat_cache.db")]
    database: PathBuf,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the GOOD export
    Run {
        /// Simulated upgrades per selected entity; roughly your largest stack / 50
        #[arg(short, long, default_value_t = DEFAULT_COUNT)]
        count: usize,

        /// Requests per calculator call
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Where to write the export
        #[arg(short, long, default_value = "good_materials.json")]
        output: PathBuf,

        /// Rebuild the catalog cache even if it looks current
        #[arg(long)]
        refresh: bool,
    },

    /// Build or reuse the catalog cache
    Catalog {
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[arg(long)]
        refresh: bool,
    },

    /// Show the minimum set of entities covering every material
    Select {
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Initialize an empty catalog cache
    Init {
        /// Drop any cached catalog
        #[arg(long)]
        clear: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mat_planner={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let mut conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Run {
            count,
            chunk_size,
            output,
            refresh,
        } => {
            let client = connect()?;
            let config = PlannerConfig { count, chunk_size };

            let outcome = planner::plan(&mut conn, &client, &config, refresh)?;
            outcome
                .export
                .write(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            if let Some(stats) = &outcome.extracted {
                println!("{}", stats);
            }
            println!("Selected entities: {}", outcome.selected.len());
            println!("Consumption records: {}", outcome.records);
            println!("Surplus adjustments: {}", outcome.adjustments.len());
            println!(
                "Wrote {} materials to {}",
                outcome.export.materials.len(),
                output.display()
            );
        }

        Commands::Catalog {
            chunk_size,
            refresh,
        } => {
            let client = connect()?;
            let config = PlannerConfig {
                chunk_size,
                ..Default::default()
            };
            config.validate()?;

            let snapshot = client.catalog()?;
            let (catalog, stats) =
                planner::load_demand_catalog(&mut conn, &client, &snapshot, &config, refresh)?;
            match stats {
                Some(stats) => println!("{}", stats),
                None => println!("Catalog cache is current ({} entities)", catalog.len()),
            }
        }

        Commands::Select { chunk_size } => {
            let client = connect()?;
            let config = PlannerConfig {
                chunk_size,
                ..Default::default()
            };
            config.validate()?;

            let snapshot = client.catalog()?;
            let (catalog, _) =
                planner::load_demand_catalog(&mut conn, &client, &snapshot, &config, false)?;
            let selected = selector::select_minimum_cover(&catalog)?;

            println!("{:<12} {:>10}  {}", "Entity", "Materials", "Name");
            println!("{}", "-".repeat(48));
            for id in selected {
                let name = snapshot
                    .avatars
                    .iter()
                    .find(|a| a.id == id)
                    .map(|a| a.name.as_str())
                    .or_else(|| snapshot.weapons.iter().find(|w| w.id == id).map(|w| w.name.as_str()))
                    .unwrap_or("?");
                let materials = catalog.materials(id).map_or(0, <[_]>::len);
                println!("{:<12} {:>10}  {}", id, materials, name);
            }
        }

        Commands::Init { clear } => {
            if clear {
                println!("Clearing cached catalog...");
                db::clear_catalog(&conn)?;
            }
            println!("Catalog cache initialized at: {}", cli.database.display());
        }
    }

    Ok(())
}

fn connect() -> Result<HoyoLabClient> {
    let identity = Identity::from_env().context("COOKIES and UID must be set in the environment")?;
    Ok(HoyoLabClient::new(identity)?)
}
