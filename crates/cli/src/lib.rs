pub mod commands;

use clap::{Parser, Subcommand};
use leadscout_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig, PlannerKind};
use std::process::ExitCode;

use crate::commands::search::SearchArgs;

#[derive(Debug, Parser)]
#[command(
    name = "leadscout",
    about = "Leadscout contact search CLI",
    long_about = "Run iterative contact searches against the people directory, store the results, and inspect runtime readiness.",
    after_help = "Examples:\n  leadscout search \"CTOs at fintech startups in Berlin\"\n  leadscout search \"sales leaders\" --title \"VP Sales\" --max-contacts 20\n  leadscout contacts --limit 10\n  leadscout doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Plan and run an iterative contact search, then store the unique contacts")]
    Search {
        #[arg(help = "Free-text description of the people to find")]
        query: String,
        #[arg(long = "title", help = "Job title hint (repeatable)")]
        titles: Vec<String>,
        #[arg(long = "location", help = "Location hint (repeatable)")]
        locations: Vec<String>,
        #[arg(long = "industry", help = "Industry hint (repeatable)")]
        industries: Vec<String>,
        #[arg(long, help = "Description of the product being sold")]
        product: Option<String>,
        #[arg(
            long,
            help = "Derive iteration bounds from a contact budget instead of search settings"
        )]
        max_contacts: Option<u32>,
        #[arg(long, value_parser = parse_planner, help = "Query planner: keyword or llm")]
        planner: Option<PlannerKind>,
        #[arg(long, help = "Maximum planning iterations")]
        max_iterations: Option<u32>,
        #[arg(long, help = "Unique contacts that satisfy the run")]
        min_results: Option<usize>,
        #[arg(long, help = "Page size requested per directory query")]
        per_query_limit: Option<u32>,
        #[arg(long, help = "Wall-clock budget in seconds (0 disables)")]
        deadline_secs: Option<u64>,
        #[arg(long, help = "Skip writing contacts to the database")]
        no_persist: bool,
    },
    #[command(about = "List stored contacts, most recent first")]
    Contacts {
        #[arg(long, default_value_t = 20, help = "Maximum contacts to return")]
        limit: u32,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, directory key readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    if let Err(error) = init_logging(&logging) {
        eprintln!("logging disabled: {error}");
    }

    let result = match cli.command {
        Command::Search {
            query,
            titles,
            locations,
            industries,
            product,
            max_contacts,
            planner,
            max_iterations,
            min_results,
            per_query_limit,
            deadline_secs,
            no_persist,
        } => commands::search::run(SearchArgs {
            query,
            titles,
            locations,
            industries,
            product,
            max_contacts,
            planner,
            max_iterations,
            min_results,
            per_query_limit,
            deadline_secs,
            persist: !no_persist,
        }),
        Command::Contacts { limit } => commands::contacts::run(limit),
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn parse_planner(raw: &str) -> Result<PlannerKind, String> {
    raw.parse::<PlannerKind>().map_err(|error| error.to_string())
}

/// Logs go to stderr so stdout stays a single JSON payload.
fn init_logging(logging: &LoggingConfig) -> anyhow::Result<()> {
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow::anyhow!("{error}"))
}
