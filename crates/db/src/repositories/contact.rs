use chrono::{DateTime, Utc};
use leadscout_core::domain::{
    CandidateRecord, CompanyId, ContactId, DedupKey, Provenance, StoredCompany, StoredContact,
    TagSet,
};
use leadscout_core::errors::StoreError;
use leadscout_core::search::{PersistenceStore, UpsertOutcome};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{ContactRepository, RepositoryError};
use crate::DbPool;

const CONTACT_COLUMNS: &str = "id, dedup_key, name, email, profile_url, provider_id, title,
    company_name, location, tags_json, source, source_reason, search_query, workflow_stage,
    next_action, created_at";

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_contact(
        &self,
        record: &CandidateRecord,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome<ContactId>, RepositoryError> {
        let key = record.dedup_key().ok_or_else(|| {
            RepositoryError::Decode(format!("contact `{}` has no email or profile url", record.name))
        })?;
        let storage_key = key.storage_key();
        let id = ContactId::new();
        let tags_json = serde_json::to_string(&record.tags)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        let inserted = sqlx::query(
            "INSERT INTO contact (
                id, dedup_key, name, email, profile_url, provider_id, title,
                company_name, location, tags_json, source, source_reason, search_query,
                workflow_stage, next_action, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(dedup_key) DO NOTHING",
        )
        .bind(id.0.to_string())
        .bind(&storage_key)
        .bind(&record.name)
        .bind(record.usable_email())
        .bind(record.profile_url.as_deref())
        .bind(record.provider_id.as_deref())
        .bind(record.title.as_deref())
        .bind(record.company())
        .bind(record.location.as_deref())
        .bind(tags_json)
        .bind(&provenance.source)
        .bind(&provenance.source_reason)
        .bind(&provenance.search_query)
        .bind(&provenance.workflow_stage)
        .bind(&provenance.next_action)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok(UpsertOutcome { id, created: true });
        }

        let existing: String = sqlx::query("SELECT id FROM contact WHERE dedup_key = ?")
            .bind(&storage_key)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")?;
        Ok(UpsertOutcome { id: ContactId(parse_uuid("contact.id", &existing)?), created: false })
    }

    async fn insert_company(&self, name: &str) -> Result<UpsertOutcome<CompanyId>, RepositoryError> {
        let name = name.trim();
        let id = CompanyId::new();
        let inserted = sqlx::query(
            "INSERT INTO company (id, name, created_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(id.0.to_string())
        .bind(name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok(UpsertOutcome { id, created: true });
        }

        let existing: String = sqlx::query("SELECT id FROM company WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")?;
        Ok(UpsertOutcome { id: CompanyId(parse_uuid("company.id", &existing)?), created: false })
    }
}

#[async_trait::async_trait]
impl PersistenceStore for SqlContactRepository {
    async fn upsert_contact(
        &self,
        record: &CandidateRecord,
        provenance: &Provenance,
    ) -> Result<UpsertOutcome<ContactId>, StoreError> {
        Ok(self.insert_contact(record, provenance).await?)
    }

    async fn upsert_company(&self, name: &str) -> Result<UpsertOutcome<CompanyId>, StoreError> {
        Ok(self.insert_company(name).await?)
    }
}

#[async_trait::async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_by_key(&self, key: &DedupKey) -> Result<Option<StoredContact>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CONTACT_COLUMNS} FROM contact WHERE dedup_key = ?"))
            .bind(key.storage_key())
            .fetch_optional(&self.pool)
            .await?;

        row.map(contact_from_row).transpose()
    }

    async fn list_contacts(&self, limit: u32) -> Result<Vec<StoredContact>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact ORDER BY created_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }

    async fn count_contacts(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) AS count FROM contact").fetch_one(&self.pool).await?.try_get("count")?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::Decode(format!("negative contact count: {count}")))
    }

    async fn list_companies(&self) -> Result<Vec<StoredCompany>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM company ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(company_from_row).collect()
    }
}

fn company_from_row(row: SqliteRow) -> Result<StoredCompany, RepositoryError> {
    Ok(StoredCompany {
        id: CompanyId(parse_uuid("company.id", &row.try_get::<String, _>("id")?)?),
        name: row.try_get("name")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn contact_from_row(row: SqliteRow) -> Result<StoredContact, RepositoryError> {
    let key_raw = row.try_get::<String, _>("dedup_key")?;
    let dedup_key = DedupKey::from_storage_key(&key_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown dedup key `{key_raw}`")))?;
    let tags_raw = row.try_get::<String, _>("tags_json")?;
    let tags: TagSet = serde_json::from_str(&tags_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid tags `{tags_raw}` ({error})")))?;

    Ok(StoredContact {
        id: ContactId(parse_uuid("contact.id", &row.try_get::<String, _>("id")?)?),
        dedup_key,
        record: CandidateRecord {
            email: row.try_get("email")?,
            profile_url: row.try_get("profile_url")?,
            provider_id: row.try_get("provider_id")?,
            name: row.try_get("name")?,
            title: row.try_get("title")?,
            company_name: row.try_get("company_name")?,
            location: row.try_get("location")?,
            tags,
        },
        provenance: Provenance {
            source: row.try_get("source")?,
            source_reason: row.try_get("source_reason")?,
            search_query: row.try_get("search_query")?,
            workflow_stage: row.try_get("workflow_stage")?,
            next_action: row.try_get("next_action")?,
        },
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_uuid(column: &str, value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value)
        .map_err(|error| RepositoryError::Decode(format!("invalid uuid in `{column}`: `{value}` ({error})")))
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use leadscout_core::domain::{CandidateRecord, DedupKey, Provenance, Tag, TagSet};
    use leadscout_core::search::PersistenceStore;

    use super::SqlContactRepository;
    use crate::repositories::ContactRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlContactRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlContactRepository::new(pool)
    }

    fn tagged(iteration: u32) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(Tag::Iteration(iteration));
        tags
    }

    #[tokio::test]
    async fn upsert_contact_is_idempotent_on_dedup_key() {
        let repository = repository().await;
        let mut record = CandidateRecord::named("Ada Lovelace")
            .with_email("Ada@Example.com")
            .with_company("Analytical Engines");
        record.tags = tagged(1);
        let provenance = Provenance::for_search("Find CEOs", &record.tags);

        let first = repository.upsert_contact(&record, &provenance).await.expect("first");
        let second = repository
            .upsert_contact(&record.clone().with_email("ada@example.com"), &provenance)
            .await
            .expect("second");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(repository.count_contacts().await.expect("count"), 1);

        let stored = repository
            .find_by_key(&DedupKey::Email("ada@example.com".to_string()))
            .await
            .expect("find")
            .expect("stored contact");
        assert_eq!(stored.record.tags, tagged(1));
        assert_eq!(stored.provenance.workflow_stage, "new");
        assert_eq!(stored.record.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn profile_only_contact_round_trips_through_listing() {
        let repository = repository().await;
        let record =
            CandidateRecord::named("Grace").with_profile_url("https://www.linkedin.com/in/grace/");
        let provenance = Provenance::for_search("Find admirals", &TagSet::new());

        repository.upsert_contact(&record, &provenance).await.expect("upsert");
        let listed = repository.list_contacts(10).await.expect("list");

        assert_eq!(listed.len(), 1);
        assert!(matches!(listed[0].dedup_key, DedupKey::ProfileUrl(ref url) if url == "linkedin.com/in/grace"));
        assert!(listed[0].record.email.is_none());
    }

    #[tokio::test]
    async fn unkeyable_contact_is_rejected() {
        let repository = repository().await;
        let record = CandidateRecord::named("Nobody");
        let provenance = Provenance::for_search("q", &TagSet::new());

        assert!(repository.upsert_contact(&record, &provenance).await.is_err());
    }

    #[tokio::test]
    async fn companies_are_unique_by_name() {
        let repository = repository().await;

        let first = repository.upsert_company("Acme").await.expect("first");
        let second = repository.upsert_company(" Acme ").await.expect("second");
        repository.upsert_company("Globex").await.expect("third");

        assert!(first.created);
        assert!(!second.created);
        let names = repository
            .list_companies()
            .await
            .expect("companies")
            .into_iter()
            .map(|company| company.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Acme".to_string(), "Globex".to_string()]);
    }
}
