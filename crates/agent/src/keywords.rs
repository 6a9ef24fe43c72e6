use std::collections::BTreeSet;

use async_trait::async_trait;
use leadscout_core::domain::{SearchIntent, StructuredQuery, Tag, TagSet};
use leadscout_core::errors::PlanningFailure;
use leadscout_core::search::{PlanningHistory, QueryPlanner};

const TITLE_PATTERNS: &[(&[&str], &str)] = &[
    (&["ceo", "ceos", "chief executive"], "CEO"),
    (&["cto", "ctos", "chief technology"], "CTO"),
    (&["cfo", "cfos", "chief financial"], "CFO"),
    (&["coo", "coos", "chief operating"], "COO"),
    (&["cmo", "cmos", "chief marketing"], "CMO"),
    (&["founder", "founders", "co-founder", "cofounder"], "Founder"),
    (&["vp sales", "vp of sales", "head of sales"], "VP Sales"),
    (&["vp engineering", "vp of engineering", "head of engineering"], "VP Engineering"),
    (&["marketing director", "director of marketing", "head of marketing"], "Marketing Director"),
    (&["product manager", "product managers"], "Product Manager"),
    (&["engineering manager", "engineering managers"], "Engineering Manager"),
    (&["recruiter", "recruiters", "talent acquisition"], "Recruiter"),
    (&["partner", "partners", "investor", "investors"], "Partner"),
];

const TITLE_EXPANSIONS: &[(&str, &[&str])] = &[
    ("CEO", &["Founder", "Co-Founder", "President"]),
    ("CTO", &["VP Engineering", "Head of Engineering"]),
    ("CFO", &["VP Finance", "Head of Finance"]),
    ("COO", &["VP Operations", "Head of Operations"]),
    ("CMO", &["VP Marketing", "Head of Marketing"]),
    ("Founder", &["Co-Founder", "CEO"]),
    ("VP Sales", &["Head of Sales", "Sales Director"]),
    ("VP Engineering", &["Head of Engineering", "Engineering Director"]),
    ("Marketing Director", &["Head of Marketing", "VP Marketing"]),
    ("Product Manager", &["Senior Product Manager", "Head of Product"]),
    ("Engineering Manager", &["Engineering Lead", "Head of Engineering"]),
    ("Recruiter", &["Talent Acquisition", "Head of Talent"]),
    ("Partner", &["General Partner", "Managing Partner", "Principal"]),
];

const INDUSTRY_PATTERNS: &[(&[&str], &str)] = &[
    (&["saas", "software"], "SaaS"),
    (&["fintech", "financial technology"], "Fintech"),
    (&["healthcare", "health tech", "healthtech"], "Healthcare"),
    (&["ecommerce", "e-commerce", "retail"], "E-commerce"),
    (&["ai ", "artificial intelligence", "machine learning"], "Artificial Intelligence"),
    (&["venture capital", "vc firm", "vc firms"], "Venture Capital"),
    (&["real estate", "proptech"], "Real Estate"),
    (&["cybersecurity", "security"], "Cybersecurity"),
    (&["edtech", "education"], "Education"),
    (&["logistics", "supply chain"], "Logistics"),
];

const LOCATION_MARKERS: &[&str] = &[" in ", " based in ", " located in ", " around "];
const LOCATION_STOPWORDS: &[&str] = &["who", "that", "with", "at", "for", "and", "working"];

/// Deterministic planner that reads facets out of the intent text.
///
/// Refinement walks a fixed ladder: related titles first, then the same titles
/// without a location restriction, then a plain keyword query. Once the ladder
/// is used up it reports `PlanningFailure::Exhausted`.
#[derive(Clone, Debug, Default)]
pub struct KeywordQueryPlanner;

impl KeywordQueryPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn ladder(&self, intent: &SearchIntent) -> Vec<StructuredQuery> {
        let limit = intent.per_query_limit();
        let text = normalize_text(intent.query());

        let mut titles = extract_titles(&text);
        titles.extend(intent.titles().iter().cloned());
        let mut locations = extract_locations(intent.query());
        locations.extend(intent.locations().iter().cloned());
        let mut industries = extract_industries(&text);
        industries.extend(intent.industries().iter().cloned());
        let tag_hints = category_tags(&industries);

        let mut base = StructuredQuery::new(limit)
            .with_titles(&titles)
            .with_locations(&locations)
            .with_industries(&industries)
            .with_tag_hints(tag_hints.clone());
        if base.facet_count() == 0 {
            base = base.with_keywords(intent.query());
        }

        let mut ladder = vec![base.clone()];

        let expanded = base.clone().with_titles(expand_titles(&titles));
        push_distinct(&mut ladder, expanded.clone());

        if !expanded.locations.is_empty() {
            let mut broadened = expanded;
            broadened.locations.clear();
            push_distinct(&mut ladder, broadened);
        }

        let keyword_only = StructuredQuery::new(limit)
            .with_keywords(intent.query())
            .with_industries(&industries)
            .with_tag_hints(tag_hints);
        if keyword_only.keywords.is_some() {
            push_distinct(&mut ladder, keyword_only);
        }

        ladder
    }
}

#[async_trait]
impl QueryPlanner for KeywordQueryPlanner {
    async fn plan(
        &self,
        intent: &SearchIntent,
        history: Option<&PlanningHistory>,
    ) -> Result<StructuredQuery, PlanningFailure> {
        let step = history.map_or(0, |history| history.iteration.saturating_sub(1) as usize);
        self.ladder(intent).into_iter().nth(step).ok_or(PlanningFailure::Exhausted)
    }
}

fn push_distinct(ladder: &mut Vec<StructuredQuery>, query: StructuredQuery) {
    if !query.is_empty() && !ladder.contains(&query) {
        ladder.push(query);
    }
}

fn normalize_text(text: &str) -> String {
    format!(" {} ", text.to_lowercase())
}

fn extract_titles(normalized_text: &str) -> BTreeSet<String> {
    matched_labels(normalized_text, TITLE_PATTERNS)
}

fn extract_industries(normalized_text: &str) -> BTreeSet<String> {
    matched_labels(normalized_text, INDUSTRY_PATTERNS)
}

fn matched_labels(normalized_text: &str, patterns: &[(&[&str], &str)]) -> BTreeSet<String> {
    let padded = normalized_text
        .chars()
        .map(|character| if character.is_alphanumeric() || character == '-' { character } else { ' ' })
        .collect::<String>();

    patterns
        .iter()
        .filter(|(needles, _)| {
            needles.iter().any(|needle| padded.contains(&format!(" {} ", needle.trim())))
        })
        .map(|(_, label)| (*label).to_string())
        .collect()
}

fn extract_locations(text: &str) -> BTreeSet<String> {
    let lowered = format!(" {} ", text.to_ascii_lowercase());
    let original = format!(" {text} ");
    let mut locations = BTreeSet::new();

    for marker in LOCATION_MARKERS {
        let Some(start) = lowered.find(marker) else {
            continue;
        };
        let tail = &original[start + marker.len()..];
        let phrase = tail
            .split(|character: char| matches!(character, ',' | '.' | ';' | '!' | '?'))
            .next()
            .unwrap_or_default();

        let words = phrase
            .split_whitespace()
            .take_while(|word| !LOCATION_STOPWORDS.contains(&word.to_lowercase().as_str()))
            .collect::<Vec<_>>();
        let starts_capitalized =
            words.first().and_then(|word| word.chars().next()).is_some_and(char::is_uppercase);
        if starts_capitalized {
            locations.insert(words.join(" "));
        }
    }

    locations
}

fn expand_titles(titles: &BTreeSet<String>) -> BTreeSet<String> {
    TITLE_EXPANSIONS
        .iter()
        .filter(|(title, _)| titles.contains(*title))
        .flat_map(|(_, related)| related.iter().map(|value| (*value).to_string()))
        .collect()
}

fn category_tags(industries: &BTreeSet<String>) -> TagSet {
    industries.iter().filter_map(|industry| Tag::category(industry)).collect()
}

#[cfg(test)]
mod tests {
    use leadscout_core::domain::{SearchIntent, Tag};
    use leadscout_core::errors::PlanningFailure;
    use leadscout_core::search::{PlanningHistory, QueryPlanner, TriedFacets};

    use super::{extract_locations, KeywordQueryPlanner};

    fn history(iteration: u32) -> PlanningHistory {
        PlanningHistory {
            iteration,
            unique_so_far: 2,
            deficit: 3,
            last_yield: Some(2),
            tried: TriedFacets::default(),
        }
    }

    #[test]
    fn extracts_capitalized_location_phrase() {
        let locations = extract_locations("Find CEOs at SaaS companies in Austin, Texas");
        assert!(locations.contains("Austin"));

        let locations = extract_locations("Find CTOs based in New York who use Rust");
        assert!(locations.contains("New York"));

        assert!(extract_locations("Find people in sales").is_empty());
    }

    #[tokio::test]
    async fn first_query_reads_facets_from_text() {
        let intent = SearchIntent::builder("Find CEOs at SaaS companies in Austin")
            .build()
            .expect("intent");

        let query = KeywordQueryPlanner::new().plan(&intent, None).await.expect("query");

        assert!(query.titles.contains("CEO"));
        assert!(query.industries.contains("SaaS"));
        assert!(query.locations.contains("Austin"));
        assert!(query.keywords.is_none());
        assert!(query.tag_hints.contains(&Tag::Category("saas".to_string())));
    }

    #[tokio::test]
    async fn refinement_broadens_titles_then_location() {
        let intent = SearchIntent::builder("Find CEOs in Austin").build().expect("intent");
        let planner = KeywordQueryPlanner::new();

        let second = planner.plan(&intent, Some(&history(2))).await.expect("second");
        assert!(second.titles.contains("President"));
        assert!(second.locations.contains("Austin"));

        let third = planner.plan(&intent, Some(&history(3))).await.expect("third");
        assert!(third.titles.contains("President"));
        assert!(third.locations.is_empty());
    }

    #[tokio::test]
    async fn ladder_runs_out_with_exhausted() {
        let intent = SearchIntent::builder("Find CEOs").build().expect("intent");

        let outcome = KeywordQueryPlanner::new().plan(&intent, Some(&history(20))).await;

        assert_eq!(outcome, Err(PlanningFailure::Exhausted));
    }

    #[tokio::test]
    async fn text_without_known_facets_falls_back_to_keywords() {
        let intent = SearchIntent::builder("people who build compilers").build().expect("intent");

        let query = KeywordQueryPlanner::new().plan(&intent, None).await.expect("query");

        assert_eq!(query.keywords.as_deref(), Some("people who build compilers"));
        assert_eq!(query.facet_count(), 0);
    }

    #[tokio::test]
    async fn explicit_hints_are_merged_with_text() {
        let intent = SearchIntent::builder("Find CEOs")
            .location("Berlin")
            .industry("Fintech")
            .build()
            .expect("intent");

        let query = KeywordQueryPlanner::new().plan(&intent, None).await.expect("query");

        assert!(query.locations.contains("Berlin"));
        assert!(query.industries.contains("Fintech"));
        assert!(query.titles.contains("CEO"));
    }
}
