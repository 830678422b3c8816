pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pricewise_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(
    name = "pricewise",
    about = "Pricewise grocery price comparison CLI",
    long_about = "Normalize retailer listings, compare offers, and find basket savings from JSON fixtures.",
    after_help = "Examples:\n  pricewise config\n  pricewise compare --products listings.json --sort price_per_unit_asc\n  pricewise savings --basket basket.json --catalog catalog.json --preference health_first"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Normalize raw retailer listings, mark cheapest offers and sort them")]
    Compare {
        #[arg(long, help = "JSON file holding an array of raw retailer records")]
        products: PathBuf,
        #[arg(long, help = "Sort mode (price_asc, price_desc, price_per_unit_asc, ...)")]
        sort: Option<String>,
    },
    #[command(about = "Find cheaper and healthier alternatives for a basket")]
    Savings {
        #[arg(long, help = "JSON file holding an array of basket items")]
        basket: PathBuf,
        #[arg(long, help = "JSON file holding the raw catalog searched for alternatives")]
        catalog: PathBuf,
        #[arg(long, help = "Ranking preference: balanced, health_first or budget_first")]
        preference: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Compare { products, sort } => commands::compare::run(&products, sort.as_deref()),
        Command::Savings { basket, catalog, preference } => {
            commands::savings::run(&basket, &catalog, preference.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global subscriber. Logs go to stderr so stdout stays a
/// single JSON document.
pub fn init_logging(logging: &LoggingConfig) {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_writer(std::io::stderr).with_target(false).with_max_level(log_level);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging already initialized: {error}");
    }
}
