use serde::Serialize;
use tracing::{debug, info};

use crate::domain::contact::Provenance;
use crate::errors::StoreError;
use crate::search::controller::RunResult;
use crate::search::ports::PersistenceStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub contacts_created: usize,
    pub contacts_skipped: usize,
    pub companies_created: usize,
    pub companies_skipped: usize,
}

/// Writes a finished run to the store. Records already known to the store are
/// counted as skipped and left untouched.
pub async fn persist_run<S>(
    store: &S,
    result: &RunResult,
    search_query: &str,
) -> Result<PersistSummary, StoreError>
where
    S: PersistenceStore + ?Sized,
{
    let mut summary = PersistSummary::default();

    for record in &result.contacts {
        let provenance = Provenance::for_search(search_query, &record.tags);
        let outcome = store.upsert_contact(record, &provenance).await?;
        if outcome.created {
            summary.contacts_created += 1;
        } else {
            debug!(
                event_name = "search.persist.duplicate_skipped",
                run_id = %result.run_id,
                name = %record.name,
                "contact already stored"
            );
            summary.contacts_skipped += 1;
        }
    }

    for company in &result.companies {
        if store.upsert_company(company).await?.created {
            summary.companies_created += 1;
        } else {
            summary.companies_skipped += 1;
        }
    }

    info!(
        event_name = "search.persist.completed",
        run_id = %result.run_id,
        contacts_created = summary.contacts_created,
        contacts_skipped = summary.contacts_skipped,
        companies_created = summary.companies_created,
        "run persisted"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::persist_run;
    use crate::domain::contact::{CompanyId, ContactId, Provenance};
    use crate::domain::{CandidateRecord, Tag};
    use crate::errors::StoreError;
    use crate::search::controller::RunResult;
    use crate::search::ports::{PersistenceStore, UpsertOutcome};
    use crate::search::states::StopReason;
    use crate::search::stats::RunStats;

    #[derive(Default)]
    struct RecordingStore {
        contacts: Mutex<HashMap<String, (ContactId, Provenance)>>,
        companies: Mutex<HashMap<String, CompanyId>>,
    }

    #[async_trait]
    impl PersistenceStore for RecordingStore {
        async fn upsert_contact(
            &self,
            record: &CandidateRecord,
            provenance: &Provenance,
        ) -> Result<UpsertOutcome<ContactId>, StoreError> {
            let key = record
                .dedup_key()
                .ok_or_else(|| StoreError::Backend("unkeyable".into()))?
                .storage_key();
            let mut contacts = self.contacts.lock().map_err(|_| StoreError::Backend("poisoned".into()))?;
            if let Some((id, _)) = contacts.get(&key) {
                return Ok(UpsertOutcome { id: *id, created: false });
            }
            let id = ContactId::new();
            contacts.insert(key, (id, provenance.clone()));
            Ok(UpsertOutcome { id, created: true })
        }

        async fn upsert_company(&self, name: &str) -> Result<UpsertOutcome<CompanyId>, StoreError> {
            let mut companies = self.companies.lock().map_err(|_| StoreError::Backend("poisoned".into()))?;
            if let Some(id) = companies.get(name) {
                return Ok(UpsertOutcome { id: *id, created: false });
            }
            let id = CompanyId::new();
            companies.insert(name.to_string(), id);
            Ok(UpsertOutcome { id, created: true })
        }
    }

    fn run_result(contacts: Vec<CandidateRecord>, companies: Vec<&str>) -> RunResult {
        RunResult {
            run_id: Uuid::new_v4(),
            contacts,
            companies: companies.into_iter().map(str::to_string).collect(),
            iterations: 1,
            stop_reason: StopReason::TargetReached,
            stats: RunStats::default(),
        }
    }

    #[tokio::test]
    async fn second_persist_of_same_run_creates_nothing() {
        let store = RecordingStore::default();
        let mut contact = CandidateRecord::named("Ada").with_email("ada@example.com").with_company("Acme");
        contact.tags.insert(Tag::Iteration(1));
        let result = run_result(vec![contact], vec!["Acme"]);

        let first = persist_run(&store, &result, "Find CEOs").await.expect("first persist");
        let second = persist_run(&store, &result, "Find CEOs").await.expect("second persist");

        assert_eq!(first.contacts_created, 1);
        assert_eq!(first.companies_created, 1);
        assert_eq!(second.contacts_created, 0);
        assert_eq!(second.contacts_skipped, 1);
        assert_eq!(second.companies_skipped, 1);

        let contacts = store.contacts.lock().expect("lock");
        let (_, provenance) = contacts.get("email:ada@example.com").expect("stored");
        assert_eq!(provenance.source_reason, "Found via AI search. Tags: iteration:1");
        assert_eq!(provenance.search_query, "Find CEOs");
    }
}
