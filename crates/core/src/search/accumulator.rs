use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::{CandidateRecord, DedupKey, StructuredQuery};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum IterationOutcome {
    Completed,
    ProviderFailed(String),
    TimedOut,
}

/// One line of the per-run iteration log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub query: StructuredQuery,
    pub raw_count: usize,
    pub new_unique: usize,
    pub duplicates: usize,
    pub unkeyable: usize,
    pub estimated_total: Option<u64>,
    pub outcome: IterationOutcome,
}

impl IterationRecord {
    pub fn completed(
        iteration: u32,
        query: StructuredQuery,
        raw_count: usize,
        estimated_total: Option<u64>,
        report: IngestReport,
    ) -> Self {
        Self {
            iteration,
            query,
            raw_count,
            new_unique: report.new_unique,
            duplicates: report.duplicates,
            unkeyable: report.unkeyable,
            estimated_total,
            outcome: IterationOutcome::Completed,
        }
    }

    /// Zero-yield entry for an iteration whose search call did not return.
    pub fn failed(iteration: u32, query: StructuredQuery, outcome: IterationOutcome) -> Self {
        Self {
            iteration,
            query,
            raw_count: 0,
            new_unique: 0,
            duplicates: 0,
            unkeyable: 0,
            estimated_total: None,
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self.outcome, IterationOutcome::Completed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub new_unique: usize,
    pub duplicates: usize,
    pub unkeyable: usize,
}

/// Read-only view of an accumulator at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatorSnapshot {
    pub contacts: Vec<CandidateRecord>,
    pub companies: Vec<String>,
    pub iterations: Vec<IterationRecord>,
    pub dropped_unkeyable: usize,
    pub discarded_duplicates: usize,
}

/// Unique contacts gathered by one run, in first-seen order.
///
/// Invariants: every dedup key appears once, and `companies` is exactly the set
/// of non-empty company names across the stored contacts.
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    contacts: Vec<CandidateRecord>,
    index: HashMap<DedupKey, usize>,
    companies: Vec<String>,
    company_index: HashSet<String>,
    iterations: Vec<IterationRecord>,
    dropped_unkeyable: usize,
    discarded_duplicates: usize,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records that were new to this run.
    pub fn ingest<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = CandidateRecord>,
    {
        self.ingest_detailed(records).new_unique
    }

    pub fn ingest_detailed<I>(&mut self, records: I) -> IngestReport
    where
        I: IntoIterator<Item = CandidateRecord>,
    {
        let mut report = IngestReport::default();

        for record in records {
            let Some(key) = record.dedup_key() else {
                debug!(
                    event_name = "search.accumulator.unkeyable_dropped",
                    name = %record.name,
                    "dropping candidate without email or profile url"
                );
                report.unkeyable += 1;
                continue;
            };

            if self.index.contains_key(&key) {
                report.duplicates += 1;
                continue;
            }

            if let Some(company) = record.company() {
                if self.company_index.insert(company.to_string()) {
                    self.companies.push(company.to_string());
                }
            }
            self.index.insert(key, self.contacts.len());
            self.contacts.push(record);
            report.new_unique += 1;
        }

        self.dropped_unkeyable += report.unkeyable;
        self.discarded_duplicates += report.duplicates;
        report
    }

    pub fn record_iteration(&mut self, record: IterationRecord) {
        self.iterations.push(record);
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn contacts(&self) -> &[CandidateRecord] {
        &self.contacts
    }

    pub fn companies(&self) -> &[String] {
        &self.companies
    }

    pub fn iterations(&self) -> &[IterationRecord] {
        &self.iterations
    }

    pub fn dropped_unkeyable(&self) -> usize {
        self.dropped_unkeyable
    }

    pub fn snapshot(&self) -> AccumulatorSnapshot {
        AccumulatorSnapshot {
            contacts: self.contacts.clone(),
            companies: self.companies.clone(),
            iterations: self.iterations.clone(),
            dropped_unkeyable: self.dropped_unkeyable,
            discarded_duplicates: self.discarded_duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{IterationOutcome, IterationRecord, ResultAccumulator};
    use crate::domain::{CandidateRecord, StructuredQuery};

    fn contact(name: &str, email: &str, company: &str) -> CandidateRecord {
        CandidateRecord::named(name).with_email(email).with_company(company)
    }

    #[test]
    fn duplicate_ingest_counts_once_and_keeps_first_seen_fields() {
        let mut accumulator = ResultAccumulator::new();
        let first = contact("Ada Lovelace", "ada@example.com", "Analytical Engines")
            .with_title("CEO");
        let second = contact("Ada L.", "ADA@example.com", "Other Co")
            .with_title("Chief Executive Officer")
            .with_location("London");

        assert_eq!(accumulator.ingest(vec![first.clone()]), 1);
        assert_eq!(accumulator.ingest(vec![second]), 0);

        assert_eq!(accumulator.len(), 1);
        assert_eq!(accumulator.contacts(), [first]);
        assert_eq!(accumulator.companies(), ["Analytical Engines".to_string()]);
    }

    #[test]
    fn unkeyable_records_never_enter_the_result_set() {
        let mut accumulator = ResultAccumulator::new();
        let report = accumulator.ingest_detailed(vec![
            CandidateRecord::named("Ghost").with_company("Phantom Inc"),
            CandidateRecord::named("Locked").with_email("email_not_unlocked@domain.com"),
        ]);

        assert_eq!(report.new_unique, 0);
        assert_eq!(report.unkeyable, 2);
        assert_eq!(report.duplicates, 0);
        assert!(accumulator.is_empty());
        assert!(accumulator.companies().is_empty());
        assert_eq!(accumulator.dropped_unkeyable(), 2);
    }

    #[test]
    fn duplicates_within_one_batch_are_collapsed() {
        let mut accumulator = ResultAccumulator::new();
        let report = accumulator.ingest_detailed(vec![
            CandidateRecord::named("Jane").with_profile_url("https://www.linkedin.com/in/jane/"),
            CandidateRecord::named("Jane D").with_profile_url("linkedin.com/in/jane"),
            contact("Bob", "bob@example.com", ""),
        ]);

        assert_eq!(report.new_unique, 2);
        assert_eq!(report.duplicates, 1);
        assert!(accumulator.companies().is_empty());
    }

    #[test]
    fn company_set_matches_stored_contacts() {
        let mut accumulator = ResultAccumulator::new();
        accumulator.ingest(vec![
            contact("A", "a@acme.io", "Acme"),
            contact("B", "b@acme.io", " Acme "),
            contact("C", "c@globex.io", "Globex"),
            contact("D", "d@none.io", ""),
            contact("A again", "a@acme.io", "Initech"),
        ]);

        let expected: BTreeSet<String> =
            accumulator.contacts().iter().filter_map(|record| record.company()).map(str::to_string).collect();
        let actual: BTreeSet<String> = accumulator.companies().iter().cloned().collect();

        assert_eq!(actual, expected);
        assert_eq!(accumulator.companies(), ["Acme".to_string(), "Globex".to_string()]);
    }

    #[test]
    fn snapshot_is_a_detached_read() {
        let mut accumulator = ResultAccumulator::new();
        accumulator.ingest(vec![contact("A", "a@acme.io", "Acme")]);
        accumulator.record_iteration(IterationRecord::failed(
            1,
            StructuredQuery::new(10).with_titles(["CEO"]),
            IterationOutcome::ProviderFailed("boom".into()),
        ));

        let snapshot = accumulator.snapshot();
        accumulator.ingest(vec![contact("B", "b@acme.io", "Acme")]);

        assert_eq!(snapshot.contacts.len(), 1);
        assert_eq!(snapshot.iterations.len(), 1);
        assert!(snapshot.iterations[0].is_failure());
        assert_eq!(accumulator.len(), 2);
    }
}
