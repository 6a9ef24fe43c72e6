pub mod candidate;
pub mod contact;
pub mod intent;
pub mod query;
pub mod tag;

pub use candidate::{CandidateRecord, DedupKey};
pub use contact::{CompanyId, ContactId, Provenance, StoredCompany, StoredContact};
pub use intent::{SearchIntent, SearchIntentBuilder, MAX_PAGE_SIZE};
pub use query::StructuredQuery;
pub use tag::{Tag, TagSet};
