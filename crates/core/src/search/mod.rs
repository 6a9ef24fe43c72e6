pub mod accumulator;
pub mod controller;
pub mod history;
pub mod persist;
pub mod ports;
pub mod states;
pub mod stats;

pub use accumulator::{
    AccumulatorSnapshot, IngestReport, IterationOutcome, IterationRecord, ResultAccumulator,
};
pub use controller::{RunControl, RunResult, SearchOrchestrator};
pub use history::{PlanningHistory, TriedFacets};
pub use persist::{persist_run, PersistSummary};
pub use ports::{PersistenceStore, QueryPlanner, SearchPage, SearchProvider, UpsertOutcome};
pub use states::{
    evaluate_stop, transition, PhaseTransition, PhaseTransitionError, RunEvent, RunPhase,
    StopReason,
};
pub use stats::{IterationStat, RunStats, StatsReporter};
