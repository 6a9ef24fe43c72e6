pub mod config;
pub mod domain;
pub mod errors;
pub mod search;

pub use config::{AppConfig, ConfigError, LoadOptions, PlannerKind};
pub use domain::{CandidateRecord, DedupKey, SearchIntent, StructuredQuery, Tag, TagSet};
pub use errors::{
    ApplicationError, DomainError, InterfaceError, PlanningFailure, ProviderFailure, RunError,
    StoreError,
};
pub use search::{
    persist_run, PersistSummary, PersistenceStore, PlanningHistory, QueryPlanner, RunControl,
    RunResult, RunStats, SearchOrchestrator, SearchPage, SearchProvider, StopReason,
};
