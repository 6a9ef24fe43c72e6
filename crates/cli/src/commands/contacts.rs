use leadscout_core::config::{AppConfig, LoadOptions};
use leadscout_core::domain::StoredContact;
use leadscout_db::{ContactRepository, SqlContactRepository};
use serde::Serialize;

use crate::commands::migrate::{open_migrated_pool, StepFailure};
use crate::commands::{command_runtime, CommandResult};

#[derive(Debug, Serialize)]
struct ContactListing {
    total: u64,
    companies: usize,
    contacts: Vec<StoredContact>,
}

pub fn run(limit: u32) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "contacts",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match command_runtime("contacts") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result: Result<ContactListing, StepFailure> = runtime.block_on(async {
        let pool = open_migrated_pool(&config.database).await?;
        let repository = SqlContactRepository::new(pool.clone());
        let listing = async {
            Ok::<ContactListing, leadscout_db::RepositoryError>(ContactListing {
                total: repository.count_contacts().await?,
                companies: repository.list_companies().await?.len(),
                contacts: repository.list_contacts(limit).await?,
            })
        }
        .await;
        pool.close().await;
        listing.map_err(|error| ("db_query", error.to_string(), 4u8))
    });

    match result {
        Ok(listing) => {
            let message = format!(
                "showing {} of {} stored contacts",
                listing.contacts.len(),
                listing.total
            );
            match serde_json::to_value(&listing) {
                Ok(data) => CommandResult::success_with_data("contacts", message, data),
                Err(error) => CommandResult::failure(
                    "contacts",
                    "serialization",
                    format!("failed to serialize contact listing: {error}"),
                    3,
                ),
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("contacts", error_class, message, exit_code)
        }
    }
}
