use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::candidate::{CandidateRecord, DedupKey};
use crate::domain::tag::{render_tags, TagSet};

pub const SEARCH_QUERY_MAX_CHARS: usize = 500;
pub const DEFAULT_SOURCE: &str = "directory";
pub const DEFAULT_WORKFLOW_STAGE: &str = "new";
pub const DEFAULT_NEXT_ACTION: &str = "Send connection request";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub Uuid);

impl ContactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl CompanyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CompanyId {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a stored contact came from and what to do with it next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub source_reason: String,
    pub search_query: String,
    pub workflow_stage: String,
    pub next_action: String,
}

impl Provenance {
    pub fn for_search(search_query: &str, tags: &TagSet) -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            source_reason: format!("Found via AI search. Tags: {}", render_tags(tags)),
            search_query: search_query.chars().take(SEARCH_QUERY_MAX_CHARS).collect(),
            workflow_stage: DEFAULT_WORKFLOW_STAGE.to_string(),
            next_action: DEFAULT_NEXT_ACTION.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContact {
    pub id: ContactId,
    pub dedup_key: DedupKey,
    pub record: CandidateRecord,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCompany {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
