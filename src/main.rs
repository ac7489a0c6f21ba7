use anyhow::{Context, Result};
use audit_reports::config::DEFAULT_CONFIG_FILE;
use audit_reports::{
    build_dashboard, import_csv, plate_lookup, plate_penalty_list, plate_tally, run_report,
    setup_database, verify_count, DataKind, DateRange, ImportKind, RecordSet, ReportKind,
    ReportsConfig, SqliteStore,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Audit Reports - violation, warning and inspection summaries
///
/// Examples:
///   audit-reports init
///   audit-reports import audits ./audits.csv
///   audit-reports dashboard
///   audit-reports users --start-date 2024-01-01 --end-date 2024-01-31
///   audit-reports daily --data-type inspection
///   audit-reports export > records.json
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./audit-reports.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the config file
    #[arg(long, env = "AUDIT_REPORTS_DB", value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct DateArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Last day to include, covered through 23:59:59 (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,
}

impl DateArgs {
    fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,

    /// Load a CSV file of one record kind (audits, inspections, penalties, ...)
    Import { kind: String, csv: PathBuf },

    /// All-time dashboard snapshot
    Dashboard,

    /// Inspections per inspecting user
    Users(DateArgs),

    /// Inspections per plate
    Plates(DateArgs),

    /// Penalties per regulation keyword
    Categories(DateArgs),

    /// Per-day series of violations or inspections
    Daily {
        #[command(flatten)]
        dates: DateArgs,

        /// `violation` or `inspection`
        #[arg(long, default_value = "violation")]
        data_type: String,
    },

    /// Violation, warning and inspection counts for one plate
    PlateTally {
        #[arg(long)]
        plate_id: Option<i64>,

        #[command(flatten)]
        dates: DateArgs,
    },

    /// Plates whose number contains TERM
    Lookup { term: String },

    /// Raw plate/penalty association rows
    PlatePenalties,

    /// Dump every table as one JSON document
    Export,
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let db_path = config.database.path.clone();

    match cli.command {
        Command::Init => {
            let store = SqliteStore::open(&db_path)?;
            setup_database(store.connection())?;
            info!(path = %db_path.display(), "database initialized");
        }
        Command::Import { kind, csv } => {
            let kind: ImportKind = kind.parse()?;
            let store = SqliteStore::open(&db_path)?;
            setup_database(store.connection())?;
            let inserted = import_csv(store.connection(), kind, &csv)?;
            let total = verify_count(store.connection(), kind)?;
            println!("✓ Imported {} {} ({} total)", inserted, kind.table(), total);
        }
        Command::Dashboard => print_json(&build_dashboard(&open_store(&db_path)?)?)?,
        Command::Users(dates) => print_report(&db_path, ReportKind::ByUser, dates)?,
        Command::Plates(dates) => print_report(&db_path, ReportKind::ByPlate, dates)?,
        Command::Categories(dates) => print_report(&db_path, ReportKind::ByCategory, dates)?,
        Command::Daily { dates, data_type } => {
            let kind: DataKind = data_type.parse()?;
            print_report(&db_path, ReportKind::ByDay(kind), dates)?
        }
        Command::PlateTally { plate_id, dates } => {
            print_json(&plate_tally(&open_store(&db_path)?, plate_id, &dates.range())?)?
        }
        Command::Lookup { term } => {
            print_json(&plate_lookup(&open_store(&db_path)?, &term, config.lookup.limit)?)?
        }
        Command::PlatePenalties => print_json(&plate_penalty_list(&open_store(&db_path)?)?)?,
        Command::Export => print_json(&RecordSet::snapshot(&open_store(&db_path)?)?)?,
    }

    Ok(())
}

/// Logs go to stderr so stdout stays valid JSON
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn load_config(cli: &Cli) -> Result<ReportsConfig> {
    let mut config = match &cli.config {
        Some(path) => ReportsConfig::load(path)?,
        None => ReportsConfig::load_or_default(std::path::Path::new(DEFAULT_CONFIG_FILE))?,
    };

    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }

    Ok(config)
}

fn open_store(path: &std::path::Path) -> Result<SqliteStore> {
    SqliteStore::open_read_only(path)
        .with_context(|| format!("Database not found or unreadable: {}", path.display()))
}

fn print_report(db_path: &std::path::Path, kind: ReportKind, dates: DateArgs) -> Result<()> {
    let report = run_report(&open_store(db_path)?, kind, &dates.range())?;
    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
