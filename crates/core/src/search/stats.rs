use serde::Serialize;

use crate::search::accumulator::{AccumulatorSnapshot, IterationRecord};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationStat {
    pub iteration: u32,
    pub query: String,
    pub raw_count: usize,
    pub new_unique: usize,
    pub duplicates: usize,
    pub unkeyable: usize,
    pub estimated_total: Option<u64>,
    pub failed: bool,
}

impl From<&IterationRecord> for IterationStat {
    fn from(record: &IterationRecord) -> Self {
        Self {
            iteration: record.iteration,
            query: record.query.summary(),
            raw_count: record.raw_count,
            new_unique: record.new_unique,
            duplicates: record.duplicates,
            unkeyable: record.unkeyable,
            estimated_total: record.estimated_total,
            failed: record.is_failure(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub queries_executed: usize,
    pub total_unique_contacts: usize,
    pub total_companies: usize,
    pub avg_yield_per_query: f64,
    pub failed_iterations: usize,
    pub dropped_unkeyable: usize,
    pub iterations: Vec<IterationStat>,
}

pub struct StatsReporter;

impl StatsReporter {
    pub fn summarize(snapshot: &AccumulatorSnapshot) -> RunStats {
        let queries_executed = snapshot.iterations.len();
        let total_unique_contacts = snapshot.contacts.len();

        RunStats {
            queries_executed,
            total_unique_contacts,
            total_companies: snapshot.companies.len(),
            avg_yield_per_query: total_unique_contacts as f64 / queries_executed.max(1) as f64,
            failed_iterations: snapshot.iterations.iter().filter(|record| record.is_failure()).count(),
            dropped_unkeyable: snapshot.dropped_unkeyable,
            iterations: snapshot.iterations.iter().map(IterationStat::from).collect(),
        }
    }
}
