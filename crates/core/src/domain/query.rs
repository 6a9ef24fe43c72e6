use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::tag::TagSet;

/// Provider-ready search produced by a planner for one iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredQuery {
    pub titles: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub industries: BTreeSet<String>,
    pub keywords: Option<String>,
    #[serde(default)]
    pub tag_hints: TagSet,
    pub limit: u32,
}

impl StructuredQuery {
    pub fn new(limit: u32) -> Self {
        Self { limit, ..Self::default() }
    }

    pub fn with_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_trimmed(&mut self.titles, titles);
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_trimmed(&mut self.locations, locations);
        self
    }

    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extend_trimmed(&mut self.industries, industries);
        self
    }

    pub fn with_keywords(mut self, keywords: impl AsRef<str>) -> Self {
        let keywords = keywords.as_ref().trim();
        self.keywords = (!keywords.is_empty()).then(|| keywords.to_string());
        self
    }

    pub fn with_tag_hints(mut self, tag_hints: TagSet) -> Self {
        self.tag_hints = tag_hints;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.facet_count() == 0 && self.keywords.is_none()
    }

    pub fn facet_count(&self) -> usize {
        self.titles.len() + self.locations.len() + self.industries.len()
    }

    /// Compact one-line rendering for logs and prompts.
    pub fn summary(&self) -> String {
        let join = |values: &BTreeSet<String>| values.iter().cloned().collect::<Vec<_>>().join("|");
        format!(
            "titles=[{}] locations=[{}] industries=[{}] keywords={:?} limit={}",
            join(&self.titles),
            join(&self.locations),
            join(&self.industries),
            self.keywords.as_deref().unwrap_or(""),
            self.limit
        )
    }
}

fn extend_trimmed<I, S>(target: &mut BTreeSet<String>, values: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    target.extend(
        values
            .into_iter()
            .map(|value| value.as_ref().trim().to_string())
            .filter(|value| !value.is_empty()),
    );
}
