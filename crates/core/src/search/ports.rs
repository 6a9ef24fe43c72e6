use async_trait::async_trait;
use serde::Serialize;

use crate::domain::contact::{CompanyId, ContactId, Provenance};
use crate::domain::intent::MAX_PAGE_SIZE;
use crate::domain::{CandidateRecord, SearchIntent, StructuredQuery};
use crate::errors::{PlanningFailure, ProviderFailure, StoreError};
use crate::search::history::PlanningHistory;

/// One page returned by the directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub records: Vec<CandidateRecord>,
    pub estimated_total: u64,
}

impl SearchPage {
    pub fn new(records: Vec<CandidateRecord>, estimated_total: u64) -> Self {
        Self { records, estimated_total }
    }
}

#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// `history` is `None` on the first call of a run.
    async fn plan(
        &self,
        intent: &SearchIntent,
        history: Option<&PlanningHistory>,
    ) -> Result<StructuredQuery, PlanningFailure>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &StructuredQuery,
        limit: u32,
    ) -> Result<SearchPage, ProviderFailure>;

    fn page_maximum(&self) -> u32 {
        MAX_PAGE_SIZE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome<I> {
    pub id: I,
    pub created: bool,
}

/// Idempotent by dedup key; a second upsert never alters stored fields.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn upsert_contact(
        &self,
        record: &CandidateRecord,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome<ContactId>, StoreError>;

    async fn upsert_company(&self, name: &str) -> Result<UpsertOutcome<CompanyId>, StoreError>;
}

#[async_trait]
impl<T> QueryPlanner for Box<T>
where
    T: QueryPlanner + ?Sized,
{
    async fn plan(
        &self,
        intent: &SearchIntent,
        history: Option<&PlanningHistory>,
    ) -> Result<StructuredQuery, PlanningFailure> {
        (**self).plan(intent, history).await
    }
}

#[async_trait]
impl<T> SearchProvider for Box<T>
where
    T: SearchProvider + ?Sized,
{
    async fn search(
        &self,
        query: &StructuredQuery,
        limit: u32,
    ) -> Result<SearchPage, ProviderFailure> {
        (**self).search(query, limit).await
    }

    fn page_maximum(&self) -> u32 {
        (**self).page_maximum()
    }
}
