use anyhow::{Context, Result};
use bodycomp::config::AppConfig;
use bodycomp::database::{Database, MeasurementSource};
use bodycomp::export::{self, ExportFormat};
use bodycomp::import::CsvImporter;
use bodycomp::logging;
use bodycomp::models::{RawMeasurement, ReferenceScan};
use bodycomp::summary::{self, CompositionSummary};
use bodycomp::BodyCompError;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

/// bodycomp - Body Composition Tracker
///
/// Logs bathroom-scale readings locally and shows calibrated fat%, muscle%,
/// fat mass and muscle mass derived from them.
#[derive(Parser)]
#[command(name = "bodycomp")]
#[command(version)]
#[command(about = "Body composition tracker with scale calibration", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a scale reading
    Log {
        /// Raw scale weight (lbs)
        #[arg(short, long, value_parser = parse_weight)]
        weight: f64,

        /// Raw scale fat percentage
        #[arg(short, long, value_parser = parse_fat_percent)]
        fat: Option<f64>,

        /// Reading date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Import historical readings from CSV
    Import {
        /// Input CSV file (date, weight, fat_percent)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show recent calibrated readings
    Show {
        /// Number of recent readings to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only readings on or after this date (YYYY-MM-DD)
        #[arg(short, long)]
        since: Option<NaiveDate>,
    },

    /// Export calibrated readings
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json)
        #[arg(short = 'f', long, default_value = "csv")]
        format: String,

        /// Only readings on or after this date (YYYY-MM-DD)
        #[arg(short, long)]
        since: Option<NaiveDate>,
    },

    /// Calibrate a single reading without storing it
    Calibrate {
        /// Raw scale weight (lbs)
        #[arg(short, long, value_parser = parse_weight)]
        weight: f64,

        /// Raw scale fat percentage
        #[arg(short, long, value_parser = parse_fat_percent)]
        fat: f64,
    },

    /// Record or list reference body-composition scans
    Scan {
        #[command(subcommand)]
        action: ScanAction,
    },

    /// Record or list dated events
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Manage configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Validate the calibration tables
        #[arg(long)]
        check: bool,
    },
}

#[derive(Subcommand)]
enum ScanAction {
    /// Add a scan result
    Add {
        /// Scan date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Weight measured by the scanner (lbs)
        #[arg(short, long, value_parser = parse_weight)]
        weight: Option<f64>,

        /// Body fat percentage
        #[arg(short, long, value_parser = parse_fat_percent)]
        fat: Option<f64>,

        /// Skeletal muscle mass (lbs)
        #[arg(short, long, value_parser = parse_weight)]
        muscle_mass: Option<f64>,
    },

    /// List scans next to the calibrated estimate for the same day
    List,
}

#[derive(Subcommand)]
enum EventAction {
    /// Add an event
    Add {
        /// Event label
        label: String,

        /// Event date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List all events
    List,
}

fn parse_weight(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("weight must be a positive number, got {}", s));
    }
    Ok(value)
}

fn parse_fat_percent(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() {
        return Err(format!("fat percentage must be a finite number, got {}", s));
    }
    Ok(value)
}

fn main() {
    if let Err(err) = run() {
        match err.downcast_ref::<BodyCompError>() {
            Some(app_err) => {
                log_failure(app_err);
                eprintln!("{} {}", "error:".red().bold(), app_err.user_message());
            }
            None => eprintln!("{} {:#}", "error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

fn log_failure(err: &BodyCompError) {
    let severity = err.severity();
    if severity.to_tracing_level() == tracing::Level::WARN {
        tracing::warn!(?severity, "{}", err);
    } else {
        tracing::error!(?severity, "{}", err);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.logging.level = config.logging.level.raised_by(cli.verbose);
    logging::init_logging(&config.logging)?;

    // Calibration tables are validated before any data is touched
    let engine = config.build_engine()?;

    match cli.command {
        Commands::Log { weight, fat, date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let db = open_database(&config)?;
            db.add_measurement(date, weight, fat, "app")
                .map_err(BodyCompError::from)?;

            println!("{}", "✓ Reading saved".green().bold());
            let calibrated = engine.calibrate(&RawMeasurement::new(date, weight, fat));
            println!("{}", summary::render_table(std::slice::from_ref(&calibrated)));
        }

        Commands::Import { file } => {
            println!("{}", "Importing readings...".blue().bold());
            let parsed = CsvImporter::new()
                .import_file(&file)
                .map_err(BodyCompError::from)?;

            let mut db = open_database(&config)?;
            let inserted = db
                .bulk_insert(&parsed.measurements, "csv_import")
                .map_err(BodyCompError::from)?;

            println!("  Parsed:   {}", parsed.measurements.len());
            println!("  Inserted: {}", inserted);
            if parsed.skipped_without_weight > 0 {
                println!("  Skipped (no weight): {}", parsed.skipped_without_weight);
            }
            for (line, reason) in &parsed.errors {
                println!("  {} line {}: {}", "!".yellow(), line, reason);
            }
            println!("{}", "✓ Import completed".blue());
        }

        Commands::Show { limit, since } => {
            let db = open_database(&config)?;
            let mut raw = db.measurements(since).map_err(BodyCompError::from)?;
            let limit = limit.unwrap_or(config.settings.display_limit);
            if raw.len() > limit {
                raw.drain(..raw.len() - limit);
            }

            if raw.is_empty() {
                println!("{}", "No readings logged yet.".dimmed());
                return Ok(());
            }

            let calibrated = engine.calibrate_batch(&raw);
            println!("{}", summary::render_table(&calibrated));
            print_summary(&CompositionSummary::from_series(&calibrated));

            let first = raw[0].date;
            let last = raw[raw.len() - 1].date;
            let events = db.events().map_err(BodyCompError::from)?;
            for event in events.iter().filter(|e| e.date >= first && e.date <= last) {
                println!("  {} {}  {}", "◆".magenta(), event.date, event.label);
            }
        }

        Commands::Export {
            output,
            format,
            since,
        } => {
            let format: ExportFormat = format.parse().map_err(BodyCompError::from)?;
            let db = open_database(&config)?;
            let raw = db.measurements(since).map_err(BodyCompError::from)?;

            let calibrated = engine.calibrate_batch_parallel(&raw);
            export::export_to_file(&calibrated, format, &output).map_err(BodyCompError::from)?;

            println!(
                "{} {} readings to {}",
                "✓ Exported".yellow().bold(),
                calibrated.len(),
                output.display()
            );
        }

        Commands::Calibrate { weight, fat } => {
            let (corrected_weight, composition) = engine.compose(weight, fat);
            println!("{}", "Calibrated reading".cyan().bold());
            println!("  Fat bias:     {:.2} pp", engine.fat_bias_for_weight(weight));
            println!("  Weight:       {:.1} lbs", corrected_weight);
            println!("  Fat:          {:.1}%", composition.fat_percent_calibrated);
            println!("  Muscle:       {:.1}%", composition.muscle_percent);
            println!("  Fat mass:     {:.1} lbs", composition.fat_mass);
            println!("  Muscle mass:  {:.1} lbs", composition.muscle_mass);
        }

        Commands::Scan { action } => {
            let db = open_database(&config)?;
            match action {
                ScanAction::Add {
                    date,
                    weight,
                    fat,
                    muscle_mass,
                } => {
                    let scan = ReferenceScan {
                        date,
                        weight,
                        fat_percent: fat,
                        muscle_mass,
                    };
                    db.add_scan(&scan).map_err(BodyCompError::from)?;
                    println!("{} {}", "✓ Scan saved for".green().bold(), date);
                }
                ScanAction::List => {
                    let scans = db.scans().map_err(BodyCompError::from)?;
                    if scans.is_empty() {
                        println!("{}", "No scans recorded yet.".dimmed());
                        return Ok(());
                    }
                    let raw = db
                        .measurements(Some(scans[0].date))
                        .map_err(BodyCompError::from)?;
                    let calibrated = engine.calibrate_batch(&raw);
                    println!("{}", summary::render_scans(&scans, &calibrated));
                }
            }
        }

        Commands::Event { action } => {
            let db = open_database(&config)?;
            match action {
                EventAction::Add { label, date } => {
                    let label = label.trim();
                    if label.is_empty() {
                        anyhow::bail!("Event label must not be empty");
                    }
                    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
                    db.add_event(date, label).map_err(BodyCompError::from)?;
                    println!("{} {} {}", "✓ Event saved:".green().bold(), date, label);
                }
                EventAction::List => {
                    let events = db.events().map_err(BodyCompError::from)?;
                    if events.is_empty() {
                        println!("{}", "No events recorded yet.".dimmed());
                    }
                    for event in &events {
                        println!("  {} {}  {}", "◆".magenta(), event.date, event.label);
                    }
                }
            }
        }

        Commands::Config { init, show, check } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);

            if init {
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!("{} {}", "✓ Wrote".white().bold(), path.display());
            }
            if show {
                let rendered = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration")?;
                println!("{}", rendered);
            }
            if check || !(init || show) {
                // Tables were already validated above
                println!(
                    "{} {} fat bias anchors, weight bias {:.2} lbs",
                    "✓ Calibration tables valid:".green().bold(),
                    engine.tables().fat_bias_anchors.len(),
                    engine.tables().weight_bias
                );
                println!("  Database: {}", config.database_path().display());
            }
        }
    }

    Ok(())
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database_path();
    Database::new(&path)
        .map_err(BodyCompError::from)
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

fn print_summary(summary: &CompositionSummary) {
    let signed = |v: Option<f64>| v.map_or_else(|| "—".to_string(), |v| format!("{:+.1} lbs", v));

    println!(
        "{} {} readings, {} calibrated",
        "Summary:".bold(),
        summary.total,
        summary.calibrated
    );
    if let (Some(first), Some(latest)) = (summary.first_date, summary.latest_date) {
        println!("  Period:        {} → {}", first, latest);
    }
    println!("  Weight change: {}", signed(summary.weight_change));
    println!("  Fat mass:      {}", signed(summary.fat_mass_change));
    println!("  Muscle mass:   {}", signed(summary.muscle_mass_change));
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_weight_parser_rejects_unusable_values() {
        assert_eq!(parse_weight("170.5"), Ok(170.5));
        assert!(parse_weight("NaN").is_err());
        assert!(parse_weight("inf").is_err());
        assert!(parse_weight("0").is_err());
        assert!(parse_weight("-170").is_err());
        assert!(parse_weight("heavy").is_err());
    }

    #[test]
    fn test_fat_parser_rejects_non_finite_values() {
        assert_eq!(parse_fat_percent("18.2"), Ok(18.2));
        assert!(parse_fat_percent("NaN").is_err());
        assert!(parse_fat_percent("-inf").is_err());
    }

    #[test]
    fn test_log_command_rejects_nan_fat() {
        let parsed = Cli::try_parse_from(["bodycomp", "log", "--weight", "170", "--fat", "NaN"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["bodycomp", "calibrate", "-w", "inf", "-f", "18"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["bodycomp", "calibrate", "-w", "170", "-f", "18"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_scan_and_event_commands_parse() {
        let parsed = Cli::try_parse_from([
            "bodycomp", "scan", "add", "--date", "2025-03-21", "--weight", "171.5", "--fat",
            "12.7", "--muscle-mass", "85.8",
        ]);
        assert!(parsed.is_ok());

        let parsed = Cli::try_parse_from(["bodycomp", "event", "add", "Started CrossFit"]);
        assert!(parsed.is_ok());
    }
}
