use leadscout_agent::SearchRuntime;
use leadscout_core::config::{AppConfig, ConfigOverrides, LoadOptions, PlannerKind, SearchConfig};
use leadscout_core::domain::SearchIntent;
use leadscout_core::errors::{ApplicationError, DomainError, InterfaceError};
use leadscout_core::search::{persist_run, PersistSummary, RunResult};
use leadscout_db::SqlContactRepository;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::migrate::{open_migrated_pool, StepFailure};
use crate::commands::{command_runtime, CommandResult};

#[derive(Clone, Debug, Default)]
pub struct SearchArgs {
    pub query: String,
    pub titles: Vec<String>,
    pub locations: Vec<String>,
    pub industries: Vec<String>,
    pub product: Option<String>,
    pub max_contacts: Option<u32>,
    pub planner: Option<PlannerKind>,
    pub max_iterations: Option<u32>,
    pub min_results: Option<usize>,
    pub per_query_limit: Option<u32>,
    pub deadline_secs: Option<u64>,
    pub persist: bool,
}

#[derive(Debug, Serialize)]
struct SearchReport<'a> {
    #[serde(flatten)]
    run: &'a RunResult,
    persisted: Option<PersistSummary>,
}

pub fn run(args: SearchArgs) -> CommandResult {
    let overrides = ConfigOverrides {
        planner: args.planner,
        max_iterations: args.max_iterations,
        min_results: args.min_results,
        per_query_limit: args.per_query_limit,
        deadline_secs: args.deadline_secs,
        ..ConfigOverrides::default()
    };
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let intent = match build_intent(&args, &config.search) {
        Ok(intent) => intent,
        Err(error) => return CommandResult::failure("search", "invalid_intent", describe(error, None), 2),
    };

    let runtime = match command_runtime("search") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(execute(&config, &intent, args.persist));

    match result {
        Ok((run, persisted)) => render_success(&run, persisted),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("search", error_class, message, exit_code)
        }
    }
}

async fn execute(
    config: &AppConfig,
    intent: &SearchIntent,
    persist: bool,
) -> Result<(RunResult, Option<PersistSummary>), StepFailure> {
    // Fail on the database before spending directory credits.
    let pool = if persist { Some(open_migrated_pool(&config.database).await?) } else { None };

    let search = SearchRuntime::from_config(config)
        .map_err(|error| ("dependency_config", error.to_string(), 2u8))?;

    let cancellation = CancellationToken::new();
    let watcher = cancellation.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(event_name = "cli.search.interrupted", "interrupt received, stopping search");
            watcher.cancel();
        }
    });

    let outcome = search.run_with(intent, search.control().with_cancellation(cancellation)).await;
    interrupt.abort();
    let run = outcome.map_err(|error| ("planning", describe(error, None), 6u8))?;

    let persisted = match pool {
        Some(pool) => {
            let repository = SqlContactRepository::new(pool.clone());
            let summary = persist_run(&repository, &run, intent.query()).await;
            pool.close().await;
            let run_id = run.run_id.to_string();
            Some(summary.map_err(|error| ("persistence", describe(error, Some(run_id)), 7u8))?)
        }
        None => None,
    };

    info!(
        event_name = "cli.search.completed",
        run_id = %run.run_id,
        stop_reason = run.stop_reason.as_str(),
        contacts = run.contacts.len(),
        persisted = persisted.is_some(),
        "search command completed"
    );

    Ok((run, persisted))
}

/// Operator-facing text followed by the underlying cause. Failures after a
/// run has finished name its id so they can be matched to the run's logs.
fn describe(error: impl Into<ApplicationError>, run_id: Option<String>) -> String {
    let error = error.into();
    let detail = error.to_string();
    match run_id {
        Some(run_id) => {
            let error = error.into_interface(run_id);
            format!("{} (run {}: {detail})", error.user_message(), error.correlation_id())
        }
        None => format!("{} ({detail})", InterfaceError::from(error).user_message()),
    }
}

/// Explicit iteration flags win over bounds derived from `--max-contacts`.
fn build_intent(args: &SearchArgs, search: &SearchConfig) -> Result<SearchIntent, DomainError> {
    let (max_iterations, min_results, per_query_limit) = match args.max_contacts {
        Some(max_contacts) => {
            let budget = SearchIntent::for_contact_budget(args.query.clone(), None, max_contacts)?;
            (
                args.max_iterations.unwrap_or(budget.max_iterations()),
                args.min_results.unwrap_or(budget.min_results()),
                args.per_query_limit.unwrap_or(budget.per_query_limit()),
            )
        }
        None => (search.max_iterations, search.min_results, search.per_query_limit),
    };

    let mut builder = SearchIntent::builder(args.query.clone())
        .max_iterations(max_iterations)
        .min_results(min_results)
        .per_query_limit(per_query_limit);
    if let Some(product) = &args.product {
        builder = builder.product_description(product.clone());
    }
    for title in &args.titles {
        builder = builder.title(title.clone());
    }
    for location in &args.locations {
        builder = builder.location(location.clone());
    }
    for industry in &args.industries {
        builder = builder.industry(industry.clone());
    }
    builder.build()
}

fn render_success(run: &RunResult, persisted: Option<PersistSummary>) -> CommandResult {
    let message = format!(
        "found {} unique contacts at {} companies in {} iterations (stop: {})",
        run.contacts.len(),
        run.companies.len(),
        run.iterations,
        run.stop_reason.as_str()
    );

    match serde_json::to_value(SearchReport { run, persisted }) {
        Ok(data) => CommandResult::success_with_data("search", message, data),
        Err(error) => CommandResult::failure(
            "search",
            "serialization",
            format!("failed to serialize search report: {error}"),
            3,
        ),
    }
}
