use serde::Serialize;

use crate::errors::DomainError;

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_MIN_RESULTS: usize = 5;
pub const DEFAULT_PER_QUERY_LIMIT: u32 = 10;

const MAX_CONTACT_BUDGET: u32 = 100;
const MAX_BUDGET_MIN_RESULTS: u32 = 10;
const MAX_BUDGET_PER_QUERY: u32 = 25;

/// The caller's request for one orchestration run. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchIntent {
    query: String,
    product_description: Option<String>,
    titles: Vec<String>,
    locations: Vec<String>,
    industries: Vec<String>,
    max_iterations: u32,
    min_results: usize,
    per_query_limit: u32,
}

impl SearchIntent {
    pub fn builder(query: impl Into<String>) -> SearchIntentBuilder {
        SearchIntentBuilder::new(query)
    }

    /// Derives run parameters from a "give me up to N contacts" request.
    pub fn for_contact_budget(
        query: impl Into<String>,
        product_description: Option<String>,
        max_contacts: u32,
    ) -> Result<Self, DomainError> {
        let max_contacts = max_contacts.clamp(1, MAX_CONTACT_BUDGET);
        let min_results = (max_contacts / 2).min(MAX_BUDGET_MIN_RESULTS);
        let per_query_limit = max_contacts.min(MAX_BUDGET_PER_QUERY);

        let mut builder = Self::builder(query)
            .max_iterations(DEFAULT_MAX_ITERATIONS)
            .min_results(min_results as usize)
            .per_query_limit(per_query_limit);
        if let Some(product_description) = product_description {
            builder = builder.product_description(product_description);
        }
        builder.build()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn product_description(&self) -> Option<&str> {
        self.product_description.as_deref()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn industries(&self) -> &[String] {
        &self.industries
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn min_results(&self) -> usize {
        self.min_results
    }

    pub fn per_query_limit(&self) -> u32 {
        self.per_query_limit
    }

    pub fn has_hints(&self) -> bool {
        !self.titles.is_empty() || !self.locations.is_empty() || !self.industries.is_empty()
    }

    /// False when there is neither free text nor any explicit hint to plan from.
    pub fn has_signal(&self) -> bool {
        !self.query.trim().is_empty() || self.has_hints()
    }
}

#[derive(Clone, Debug)]
pub struct SearchIntentBuilder {
    query: String,
    product_description: Option<String>,
    titles: Vec<String>,
    locations: Vec<String>,
    industries: Vec<String>,
    max_iterations: u32,
    min_results: usize,
    per_query_limit: u32,
}

impl SearchIntentBuilder {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            product_description: None,
            titles: Vec::new(),
            locations: Vec::new(),
            industries: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_results: DEFAULT_MIN_RESULTS,
            per_query_limit: DEFAULT_PER_QUERY_LIMIT,
        }
    }

    pub fn product_description(mut self, description: impl Into<String>) -> Self {
        self.product_description = Some(description.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.titles.push(title.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.locations.push(location.into());
        self
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industries.push(industry.into());
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn min_results(mut self, min_results: usize) -> Self {
        self.min_results = min_results;
        self
    }

    pub fn per_query_limit(mut self, per_query_limit: u32) -> Self {
        self.per_query_limit = per_query_limit;
        self
    }

    pub fn build(self) -> Result<SearchIntent, DomainError> {
        if self.max_iterations == 0 {
            return Err(DomainError::InvalidIntent(
                "max_iterations must be greater than zero".to_string(),
            ));
        }
        if self.per_query_limit == 0 || self.per_query_limit > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidIntent(format!(
                "per_query_limit must be in range 1..={MAX_PAGE_SIZE}"
            )));
        }

        Ok(SearchIntent {
            query: self.query.trim().to_string(),
            product_description: self
                .product_description
                .map(|description| description.trim().to_string())
                .filter(|description| !description.is_empty()),
            titles: clean_hints(self.titles),
            locations: clean_hints(self.locations),
            industries: clean_hints(self.industries),
            max_iterations: self.max_iterations,
            min_results: self.min_results,
            per_query_limit: self.per_query_limit,
        })
    }
}

fn clean_hints(hints: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(hints.len());
    for hint in hints {
        let hint = hint.trim();
        if !hint.is_empty() && !cleaned.iter().any(|existing| existing == hint) {
            cleaned.push(hint.to_string());
        }
    }
    cleaned
}
