use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{SearchIntent, StructuredQuery};
use crate::search::accumulator::ResultAccumulator;

/// Every facet value already sent to the directory during a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TriedFacets {
    pub titles: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub keywords: BTreeSet<String>,
}

impl TriedFacets {
    pub fn record(&mut self, query: &StructuredQuery) {
        self.titles.extend(query.titles.iter().cloned());
        self.locations.extend(query.locations.iter().cloned());
        self.industries.extend(query.industries.iter().cloned());
        self.keywords.extend(query.keywords.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
            && self.locations.is_empty()
            && self.industries.is_empty()
            && self.keywords.is_empty()
    }

    /// True when the query brings no facet value that has not been tried.
    pub fn covers(&self, query: &StructuredQuery) -> bool {
        query.titles.is_subset(&self.titles)
            && query.locations.is_subset(&self.locations)
            && query.industries.is_subset(&self.industries)
            && query.keywords.as_ref().map_or(true, |keywords| self.keywords.contains(keywords))
    }

    pub fn summary(&self) -> String {
        let join = |values: &BTreeSet<String>| {
            if values.is_empty() {
                "none".to_string()
            } else {
                values.iter().cloned().collect::<Vec<_>>().join(", ")
            }
        };
        format!(
            "titles: {}; locations: {}; industries: {}; keywords: {}",
            join(&self.titles),
            join(&self.locations),
            join(&self.industries),
            join(&self.keywords)
        )
    }
}

/// What a planner sees on refinement calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanningHistory {
    /// 1-based number of the iteration about to be planned.
    pub iteration: u32,
    pub unique_so_far: usize,
    pub deficit: usize,
    pub last_yield: Option<usize>,
    pub tried: TriedFacets,
}

impl PlanningHistory {
    pub fn from_accumulator(
        intent: &SearchIntent,
        accumulator: &ResultAccumulator,
        iteration: u32,
    ) -> Self {
        let mut tried = TriedFacets::default();
        for record in accumulator.iterations() {
            tried.record(&record.query);
        }

        let unique_so_far = accumulator.len();
        Self {
            iteration,
            unique_so_far,
            deficit: intent.min_results().saturating_sub(unique_so_far),
            last_yield: accumulator.iterations().last().map(|record| record.new_unique),
            tried,
        }
    }
}
