use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use leadscout_core::domain::{
    CandidateRecord, CompanyId, ContactId, DedupKey, Provenance, StoredCompany, StoredContact,
};
use leadscout_core::errors::StoreError;
use leadscout_core::search::{PersistenceStore, UpsertOutcome};

use super::{ContactRepository, RepositoryError};

#[derive(Default)]
struct ContactState {
    by_key: HashMap<String, StoredContact>,
    order: Vec<String>,
}

/// Process-local store with the same upsert semantics as the sqlite repository.
#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<ContactState>,
    companies: RwLock<HashMap<String, StoredCompany>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersistenceStore for InMemoryContactRepository {
    async fn upsert_contact(
        &self,
        record: &CandidateRecord,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome<ContactId>, StoreError> {
        let dedup_key = record.dedup_key().ok_or_else(|| {
            StoreError::Decode(format!("contact `{}` has no email or profile url", record.name))
        })?;
        let storage_key = dedup_key.storage_key();

        let mut contacts = self.contacts.write().await;
        if let Some(existing) = contacts.by_key.get(&storage_key) {
            return Ok(UpsertOutcome { id: existing.id, created: false });
        }

        let id = ContactId::new();
        let mut stored_record = record.clone();
        stored_record.email = record.usable_email();
        stored_record.company_name = record.company().map(str::to_string);
        contacts.by_key.insert(
            storage_key.clone(),
            StoredContact {
                id,
                dedup_key,
                record: stored_record,
                provenance: provenance.clone(),
                created_at: Utc::now(),
            },
        );
        contacts.order.push(storage_key);
        Ok(UpsertOutcome { id, created: true })
    }

    async fn upsert_company(&self, name: &str) -> Result<UpsertOutcome<CompanyId>, StoreError> {
        let name = name.trim();
        let mut companies = self.companies.write().await;
        if let Some(existing) = companies.get(name) {
            return Ok(UpsertOutcome { id: existing.id, created: false });
        }

        let id = CompanyId::new();
        companies.insert(
            name.to_string(),
            StoredCompany { id, name: name.to_string(), created_at: Utc::now() },
        );
        Ok(UpsertOutcome { id, created: true })
    }
}

#[async_trait::async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<StoredContact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.by_key.get(&key.storage_key()).cloned())
    }

    async fn list_contacts(&self, limit: u32) -> Result<Vec<StoredContact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts
            .order
            .iter()
            .rev()
            .take(limit as usize)
            .filter_map(|key| contacts.by_key.get(key).cloned())
            .collect())
    }

    async fn count_contacts(&self) -> Result<u64, RepositoryError> {
        Ok(self.contacts.read().await.by_key.len() as u64)
    }

    async fn list_companies(&self) -> Result<Vec<StoredCompany>, RepositoryError> {
        let mut companies =
            self.companies.read().await.values().cloned().collect::<Vec<StoredCompany>>();
        companies.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(companies)
    }
}
