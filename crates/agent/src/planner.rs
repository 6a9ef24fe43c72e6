use async_trait::async_trait;
use leadscout_core::domain::{SearchIntent, StructuredQuery, Tag, TagSet};
use leadscout_core::errors::PlanningFailure;
use leadscout_core::search::{PlanningHistory, QueryPlanner};
use serde::Deserialize;
use tracing::debug;

use crate::llm::LlmClient;

const SYSTEM_PROMPT: &str = "You turn contact-search requests into people-directory filters. \
Reply with one JSON object and nothing else, shaped as \
{\"titles\": [string], \"locations\": [string], \"industries\": [string], \
\"keywords\": string or null, \"categories\": [string]}. \
Titles are job titles, locations are cities, regions or countries, industries are company \
industries. Categories are short labels describing the kind of contact. \
When earlier attempts are listed, propose different or broader filters than those already tried.";

const REPEATED_FILTERS_NOTE: &str = "Your previous reply only repeated filters that were already \
tried. Propose at least one title, location, industry or keyword that is not in the tried list.\n";

/// Planner that delegates facet selection to a language model.
pub struct LlmQueryPlanner<C> {
    client: C,
}

impl<C> LlmQueryPlanner<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }

    async fn ask(&self, prompt: &str, limit: u32) -> Result<StructuredQuery, PlanningFailure> {
        let raw = self
            .client
            .complete(SYSTEM_PROMPT, prompt)
            .await
            .map_err(|error| PlanningFailure::Unavailable(error.to_string()))?;
        parse_planned_query(&raw, limit)
    }
}

#[async_trait]
impl<C> QueryPlanner for LlmQueryPlanner<C>
where
    C: LlmClient,
{
    async fn plan(
        &self,
        intent: &SearchIntent,
        history: Option<&PlanningHistory>,
    ) -> Result<StructuredQuery, PlanningFailure> {
        let prompt = user_prompt(intent, history);
        let query = self.ask(&prompt, intent.per_query_limit()).await?;

        // One corrective round; a second repeat is accepted as is.
        match history {
            Some(history) if history.tried.covers(&query) => {
                debug!(
                    event_name = "planner.llm.repeated_facets",
                    iteration = history.iteration,
                    "model proposed no facet values beyond those already tried; asking again"
                );
                self.ask(&format!("{prompt}{REPEATED_FILTERS_NOTE}"), intent.per_query_limit()).await
            }
            _ => Ok(query),
        }
    }
}

fn user_prompt(intent: &SearchIntent, history: Option<&PlanningHistory>) -> String {
    let mut prompt = format!("Request: {}\n", intent.query());
    if let Some(description) = intent.product_description() {
        prompt.push_str(&format!("Product being sold: {description}\n"));
    }
    let hints = [
        ("Requested titles", intent.titles()),
        ("Requested locations", intent.locations()),
        ("Requested industries", intent.industries()),
    ];
    for (label, values) in hints {
        if !values.is_empty() {
            prompt.push_str(&format!("{label}: {}\n", values.join(", ")));
        }
    }

    if let Some(history) = history {
        prompt.push_str(&format!(
            "This is attempt {}. Found {} unique contacts so far and still need {}.\n",
            history.iteration, history.unique_so_far, history.deficit
        ));
        if let Some(last_yield) = history.last_yield {
            prompt.push_str(&format!("The previous attempt found {last_yield} new contacts.\n"));
        }
        if !history.tried.is_empty() {
            prompt.push_str(&format!("Already tried: {}\n", history.tried.summary()));
        }
    }

    prompt
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlannedQuery {
    titles: Vec<String>,
    locations: Vec<String>,
    industries: Vec<String>,
    keywords: Option<String>,
    categories: Vec<String>,
}

fn parse_planned_query(raw: &str, limit: u32) -> Result<StructuredQuery, PlanningFailure> {
    let body = json_body(raw).ok_or_else(|| {
        PlanningFailure::MalformedResponse("model reply contained no JSON object".to_string())
    })?;
    let planned: PlannedQuery = serde_json::from_str(body)
        .map_err(|error| PlanningFailure::MalformedResponse(error.to_string()))?;

    let tag_hints: TagSet =
        planned.categories.iter().filter_map(|category| Tag::category(category)).collect();
    let mut query = StructuredQuery::new(limit)
        .with_titles(&planned.titles)
        .with_locations(&planned.locations)
        .with_industries(&planned.industries)
        .with_tag_hints(tag_hints);
    if let Some(keywords) = planned.keywords {
        query = query.with_keywords(keywords);
    }
    Ok(query)
}

fn json_body(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}
