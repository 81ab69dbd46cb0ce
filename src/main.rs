// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Reagent Inventory: laboratory chemical-reagent ledger
//!
//! Command-line front end for searching stock, registering entries and
//! withdrawals, checking expiry alerts and exporting reports.

use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use reagent_inventory::config::{AppConfig, BackendKind};
use reagent_inventory::inventory::Inventory;
use reagent_inventory::ledger::{
    parse_date, parse_quantity, DepositRequest, WithdrawRequest, MAX_HORIZON_DAYS,
};
use reagent_inventory::model::{Movement, Reagent, DATE_FORMAT, TIME_FORMAT};
use reagent_inventory::report::{self, StockReport};
use reagent_inventory::store::{self, spreadsheet};
use reagent_inventory::{InventoryError, Result};

/// Reagent Inventory CLI
#[derive(Parser, Debug)]
#[command(name = "reagent-inventory")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Laboratory chemical-reagent inventory ledger", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search reagents by name (lists everything without a term)
    Search {
        /// Case-insensitive substring of the reagent name
        term: Option<String>,
    },

    /// Register a stock entry
    Deposit {
        /// Reagent name
        name: String,

        /// Quantity to add (a decimal comma is accepted)
        quantity: String,

        /// Person registering the entry
        #[arg(short, long)]
        user: String,

        /// Project or course
        #[arg(short, long)]
        project: String,

        /// Unit for a new reagent
        #[arg(long)]
        unit: Option<String>,

        /// Expiration date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<String>,

        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Register a withdrawal
    Withdraw {
        /// Reagent name
        name: String,

        /// Quantity to take (a decimal comma is accepted)
        quantity: String,

        /// Person taking the reagent
        #[arg(short, long)]
        user: String,

        /// Project or course
        #[arg(short, long)]
        project: String,

        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Show recent movements, newest first
    Movements {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show expiry and stock alerts
    Alerts {
        /// Near-expiry horizon in days (overrides config)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=MAX_HORIZON_DAYS))]
        days: Option<u32>,
    },

    /// Generate the stock report
    Report {
        /// Also write the report to a text file
        #[arg(long)]
        export: bool,

        /// Export directory (overrides config)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Import legacy inventory/log workbooks into the configured store
    Import {
        /// Inventory workbook or CSV sheet
        #[arg(long)]
        inventory: PathBuf,

        /// Movement log workbook or CSV sheet
        #[arg(long)]
        log: Option<PathBuf>,

        /// Replace a non-empty store
        #[arg(long)]
        force: bool,
    },

    /// Show storage backend and inventory summary
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Initialize a new inventory directory
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("Reagent Inventory v{}", env!("CARGO_PKG_VERSION"));
    }

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Some(Commands::Search { term }) => run_search(config, term, json).await,
        Some(Commands::Deposit { name, quantity, user, project, unit, expires, notes }) => {
            let request = DepositRequest {
                name,
                quantity: parse_quantity(&quantity)?,
                user,
                project,
                unit,
                expiration_date: match expires {
                    Some(raw) => parse_date(&raw)?,
                    None => None,
                },
                notes,
            };
            run_deposit(config, request).await
        }
        Some(Commands::Withdraw { name, quantity, user, project, notes }) => {
            let request = WithdrawRequest {
                name,
                quantity: parse_quantity(&quantity)?,
                user,
                project,
                notes,
            };
            run_withdraw(config, request).await
        }
        Some(Commands::Movements { limit }) => run_movements(config, limit, json).await,
        Some(Commands::Alerts { days }) => run_alerts(config, days, json).await,
        Some(Commands::Report { export, dir }) => run_report(config, export, dir, json).await,
        Some(Commands::Import { inventory, log, force }) => {
            run_import(config, inventory, log, force).await
        }
        Some(Commands::Status) | None => run_status(config).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Init { dir, force }) => run_init(dir, force).await,
    }
}

/// Open the configured store and run the startup alert check
async fn open_inventory(config: &AppConfig) -> Result<Inventory> {
    let store = store::open_repository(config)?;
    let inventory = Inventory::open(
        store,
        config.ledger_settings(),
        config.storage.seed_sample_data,
    )
    .await?;
    inventory.log_startup_alerts();
    Ok(inventory)
}

async fn run_search(config: AppConfig, term: Option<String>, json: bool) -> Result<()> {
    let inventory = open_inventory(&config).await?;
    let reagents: Vec<&Reagent> = match term.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => inventory.ledger().search(t),
        _ => inventory.ledger().reagents().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reagents)?);
        return Ok(());
    }

    if reagents.is_empty() {
        println!("No reagents found");
        return Ok(());
    }
    print_reagents(&reagents);
    println!("\n{} reagent(s)", reagents.len());
    Ok(())
}

fn print_reagents(reagents: &[&Reagent]) {
    println!(
        "{:<32} {:>10} {:<5} {:<10} {:<10} {}",
        "Reagent", "Quantity", "Unit", "Status", "Expires", "Notes"
    );
    for r in reagents {
        println!(
            "{:<32} {:>10.2} {:<5} {:<10} {:<10} {}",
            r.name,
            r.quantity,
            r.unit,
            r.status.as_str(),
            r.expiration_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string()),
            r.notes
        );
    }
}

async fn run_deposit(config: AppConfig, request: DepositRequest) -> Result<()> {
    let mut inventory = open_inventory(&config).await?;
    let message = inventory.deposit(&request).await?;
    println!("{}", message);
    Ok(())
}

async fn run_withdraw(config: AppConfig, request: WithdrawRequest) -> Result<()> {
    let mut inventory = open_inventory(&config).await?;
    let message = inventory.withdraw(&request).await?;
    println!("{}", message);
    Ok(())
}

async fn run_movements(config: AppConfig, limit: usize, json: bool) -> Result<()> {
    let inventory = open_inventory(&config).await?;
    let movements: Vec<&Movement> = inventory.ledger().recent_movements(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&movements)?);
        return Ok(());
    }

    if movements.is_empty() {
        println!("No movements recorded yet");
        return Ok(());
    }
    for m in movements {
        println!(
            "{} {}  {:<8} {:<32} {:>8.2} {:<5} {} ({})",
            m.date.format(DATE_FORMAT),
            m.time.format(TIME_FORMAT),
            m.kind.as_str(),
            m.name,
            m.quantity,
            m.unit,
            m.user,
            m.project
        );
    }
    Ok(())
}

async fn run_alerts(config: AppConfig, days: Option<u32>, json: bool) -> Result<()> {
    let mut config = config;
    if let Some(days) = days {
        config.alerts.horizon_days = i64::from(days);
    }
    let inventory = open_inventory(&config).await?;
    let now = Local::now().naive_local();

    if json {
        let report = StockReport::build(inventory.ledger(), now);
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({
            "expired": report.expired,
            "near_expiry": report.near_expiry,
            "low_stock": report.low_stock,
            "damaged": report.damaged,
        }))?);
        return Ok(());
    }

    print!("{}", report::render_alerts(inventory.ledger(), now));
    Ok(())
}

async fn run_report(config: AppConfig, export: bool, dir: Option<PathBuf>, json: bool) -> Result<()> {
    let inventory = open_inventory(&config).await?;
    let now = Local::now().naive_local();
    let report = StockReport::build(inventory.ledger(), now);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    if export {
        let dir = dir.unwrap_or_else(|| PathBuf::from(&config.reports.export_dir));
        let path = report::export_report(&dir, &report.render(), now)?;
        println!("\nReport exported to {}", path.display());
    }
    Ok(())
}

async fn run_import(
    config: AppConfig,
    inventory_path: PathBuf,
    log_path: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let reagents = spreadsheet::import_inventory_file(&inventory_path)?;
    let movements = match log_path {
        Some(path) => spreadsheet::import_movement_file(&path)?,
        None => Vec::new(),
    };

    let store = store::open_repository(&config)?;
    let mut inventory = Inventory::open(store, config.ledger_settings(), false).await?;
    let existing = inventory.ledger().reagents().len() + inventory.ledger().movements().len();
    if existing > 0 && !force {
        return Err(InventoryError::Config(format!(
            "{} store at {} is not empty. Use --force to replace it",
            inventory.store_name(),
            inventory.location()
        )));
    }

    let (reagent_count, movement_count) = (reagents.len(), movements.len());
    inventory.replace(reagents, movements).await?;
    println!(
        "Imported {} reagents and {} movements into {} ({})",
        reagent_count,
        movement_count,
        inventory.store_name(),
        inventory.location()
    );
    Ok(())
}

async fn run_status(config: AppConfig) -> Result<()> {
    println!("Reagent Inventory v{} Status", env!("CARGO_PKG_VERSION"));
    println!("==============================");

    match open_inventory(&config).await {
        Ok(inventory) => {
            let ledger = inventory.ledger();
            let report = StockReport::build(ledger, Local::now().naive_local());
            println!("Storage: {} ({})", inventory.store_name(), inventory.location());
            println!("\nInventory:");
            println!("  Reagents: {}", report.summary.total);
            println!("  Available: {}", report.summary.available);
            println!("  In use: {}", report.summary.in_use);
            println!("  Depleted: {}", report.summary.depleted);
            println!("  Movements: {}", ledger.movements().len());

            let alerts = report.startup_alerts();
            if alerts.is_empty() {
                println!("\nNo alerts");
            } else {
                println!("\nAlerts:");
                for alert in alerts {
                    println!("  ⚠ {}", alert);
                }
            }
        }
        Err(e) => println!("Storage: {} - Error: {}", config.storage.backend.as_str(), e),
    }

    println!("\nConfiguration:");
    println!("  Expiry horizon: {} days", config.alerts.horizon_days);
    println!("  Low stock below: {}", config.alerts.low_stock_threshold);
    println!("  Default unit: {}", config.defaults.unit);

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config.redacted())?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            let default_config = AppConfig::default();
            default_config.save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Backend: {}", config.storage.backend.as_str());
            match config.storage.backend {
                BackendKind::Spreadsheet => {
                    println!("  Inventory sheet: {}", config.storage.spreadsheet.inventory_path);
                    println!("  Movement sheet: {}", config.storage.spreadsheet.movements_path);
                }
                BackendKind::Sqlite => println!("  Database: {}", config.storage.sqlite.path),
                BackendKind::TableStore => println!("  URL: {}", config.storage.table_store.url),
                BackendKind::Sheets => {
                    println!("  Spreadsheet: {}", config.storage.sheets.spreadsheet_id)
                }
                BackendKind::Memory => println!("  (volatile, nothing is persisted)"),
            }
            println!("  Expiry horizon: {} days", config.alerts.horizon_days);
        }
    }

    Ok(())
}

/// Initialize a new inventory directory with config and sample data
async fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(InventoryError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    std::fs::create_dir_all(&target)?;

    let mut config = AppConfig::default();
    config.storage.spreadsheet.inventory_path = target.join("inventory.csv").to_string_lossy().to_string();
    config.storage.spreadsheet.movements_path = target.join("movements.csv").to_string_lossy().to_string();
    config.reports.export_dir = target.join("reports").to_string_lossy().to_string();
    config.save(&config_path)?;

    let inventory = open_inventory(&config).await?;
    if inventory.ledger().reagents().is_empty() {
        warn!("Inventory is empty; enable storage.seed_sample_data for demo reagents");
    }

    println!("Reagent inventory initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("  - inventory.csv ({} reagents)", inventory.ledger().reagents().len());
    println!("  - movements.csv");
    println!("\nNext steps:");
    println!("  1. List stock: reagent-inventory search");
    println!("  2. Start dashboard: reagent-web");

    Ok(())
}
