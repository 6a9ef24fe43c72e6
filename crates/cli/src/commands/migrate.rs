use crate::commands::{command_runtime, CommandResult};
use leadscout_core::config::{AppConfig, DatabaseConfig, LoadOptions};
use leadscout_db::{connect_with_settings, migrations, DbPool};

pub(crate) type StepFailure = (&'static str, String, u8);

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config.database).await?;
        pool.close().await;
        Ok::<(), StepFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_migrated_pool(database: &DatabaseConfig) -> Result<DbPool, StepFailure> {
    let pool = connect_with_settings(&database.url, database.max_connections, database.timeout_secs)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}
