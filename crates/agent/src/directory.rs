use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use leadscout_core::config::DirectoryConfig;
use leadscout_core::domain::{CandidateRecord, StructuredQuery};
use leadscout_core::errors::ProviderFailure;
use leadscout_core::search::{SearchPage, SearchProvider};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const PEOPLE_SEARCH_PATH: &str = "/api/v1/mixed_people/search";

/// People-directory search over HTTP.
pub struct HttpDirectoryProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    page_maximum: u32,
}

impl HttpDirectoryProvider {
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| anyhow!("directory.api_key is required to run searches"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build directory http client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            page_maximum: config.page_maximum,
        })
    }
}

#[async_trait]
impl SearchProvider for HttpDirectoryProvider {
    async fn search(
        &self,
        query: &StructuredQuery,
        limit: u32,
    ) -> Result<SearchPage, ProviderFailure> {
        if limit == 0 || limit > self.page_maximum {
            return Err(ProviderFailure::InvalidLimit {
                requested: limit,
                maximum: self.page_maximum,
            });
        }

        let response = self
            .client
            .post(format!("{}{PEOPLE_SEARCH_PATH}", self.base_url))
            .header("X-Api-Key", self.api_key.expose_secret())
            .header("Cache-Control", "no-cache")
            .json(&request_body(query, limit))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            return Err(ProviderFailure::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::Status { status: status.as_u16(), message });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|error| ProviderFailure::MalformedResponse(error.to_string()))?;
        let page = parse_people_page(payload)?;

        debug!(
            event_name = "directory.search.completed",
            records = page.records.len(),
            estimated_total = page.estimated_total,
            "directory page received"
        );
        Ok(page)
    }

    fn page_maximum(&self) -> u32 {
        self.page_maximum
    }
}

fn transport_failure(error: reqwest::Error) -> ProviderFailure {
    if error.is_timeout() {
        ProviderFailure::TimedOut
    } else {
        ProviderFailure::Transport(error.to_string())
    }
}

fn request_body(query: &StructuredQuery, limit: u32) -> Value {
    let mut body = json!({
        "page": 1,
        "per_page": limit,
    });
    if !query.titles.is_empty() {
        body["person_titles"] = json!(query.titles);
    }
    if !query.locations.is_empty() {
        body["person_locations"] = json!(query.locations);
    }
    if !query.industries.is_empty() {
        body["q_organization_keyword_tags"] = json!(query.industries);
    }
    if let Some(keywords) = &query.keywords {
        body["q_keywords"] = json!(keywords);
    }
    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PeopleResponse {
    people: Vec<Person>,
    contacts: Vec<Person>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Pagination {
    total_entries: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Person {
    id: Option<String>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    email: Option<String>,
    linkedin_url: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    organization_name: Option<String>,
    organization: Option<Organization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Organization {
    name: Option<String>,
}

impl Person {
    fn into_record(self) -> CandidateRecord {
        let name = self.name.filter(|name| !name.trim().is_empty()).unwrap_or_else(|| {
            [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        });
        let location = [self.city, self.state, self.country]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>();

        CandidateRecord {
            email: self.email,
            profile_url: self.linkedin_url,
            provider_id: self.id,
            name,
            title: self.title,
            company_name: self
                .organization
                .and_then(|organization| organization.name)
                .or(self.organization_name),
            location: (!location.is_empty()).then(|| location.join(", ")),
            ..CandidateRecord::default()
        }
    }
}

fn parse_people_page(payload: Value) -> Result<SearchPage, ProviderFailure> {
    let response: PeopleResponse = serde_json::from_value(payload)
        .map_err(|error| ProviderFailure::MalformedResponse(error.to_string()))?;

    let records = response
        .people
        .into_iter()
        .chain(response.contacts)
        .map(Person::into_record)
        .collect::<Vec<_>>();
    let estimated_total = response
        .pagination
        .map(|pagination| pagination.total_entries)
        .unwrap_or(records.len() as u64);

    Ok(SearchPage::new(records, estimated_total))
}
