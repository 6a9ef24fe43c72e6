use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SearchIntent;
use crate::search::accumulator::IterationRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Planning,
    Searching,
    Accumulating,
    Evaluating,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    QueryPlanned,
    PlanningFailed,
    SearchCompleted,
    SearchFailed,
    RecordsIngested,
    Continue,
    Stop,
    Interrupted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: RunPhase,
    pub to: RunPhase,
    pub event: RunEvent,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PhaseTransitionError {
    #[error("invalid run transition from {phase:?} using event {event:?}")]
    InvalidTransition { phase: RunPhase, event: RunEvent },
    #[error("run already finished; rejected event {event:?}")]
    AlreadyDone { event: RunEvent },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    TargetReached,
    IterationCapReached,
    Exhausted,
    PlannerFailed(String),
    DeadlineExceeded,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::IterationCapReached => "iteration_cap_reached",
            Self::Exhausted => "exhausted",
            Self::PlannerFailed(_) => "planner_failed",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Cancelled => "cancelled",
        }
    }

    /// True only when the run stopped because it found enough contacts.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::TargetReached)
    }

    /// True when an upstream service or the caller cut the run short.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::PlannerFailed(_) | Self::DeadlineExceeded | Self::Cancelled)
    }
}

pub fn transition(
    current: RunPhase,
    event: RunEvent,
) -> Result<PhaseTransition, PhaseTransitionError> {
    use RunEvent::{
        Continue, Interrupted, PlanningFailed, QueryPlanned, RecordsIngested, SearchCompleted,
        SearchFailed, Stop,
    };
    use RunPhase::{Accumulating, Done, Evaluating, Planning, Searching};

    let to = match (current, event) {
        (Done, _) => return Err(PhaseTransitionError::AlreadyDone { event }),
        (Planning, QueryPlanned) => Searching,
        (Planning, PlanningFailed) => Done,
        (Searching, SearchCompleted) => Accumulating,
        (Searching, SearchFailed) => Evaluating,
        (Accumulating, RecordsIngested) => Evaluating,
        (Evaluating, Continue) => Planning,
        (Evaluating, Stop) => Done,
        // Ingestion always runs to completion once a page is in hand.
        (Accumulating, Interrupted) => {
            return Err(PhaseTransitionError::InvalidTransition { phase: current, event });
        }
        (_, Interrupted) => Done,
        _ => return Err(PhaseTransitionError::InvalidTransition { phase: current, event }),
    };

    Ok(PhaseTransition { from: current, to, event })
}

/// Stop rules checked after each iteration, in priority order.
pub fn evaluate_stop(
    intent: &SearchIntent,
    completed_iterations: u32,
    unique_total: usize,
    last: Option<&IterationRecord>,
) -> Option<StopReason> {
    if completed_iterations >= 1 && unique_total >= intent.min_results() {
        return Some(StopReason::TargetReached);
    }
    if completed_iterations >= intent.max_iterations() {
        return Some(StopReason::IterationCapReached);
    }
    // A failed search says nothing about the query space, so it never counts as exhaustion.
    let exhausted = last.is_some_and(|record| !record.is_failure() && record.new_unique == 0);
    if exhausted && completed_iterations > 1 {
        return Some(StopReason::Exhausted);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{evaluate_stop, transition, PhaseTransitionError, RunEvent, RunPhase, StopReason};
    use crate::domain::{SearchIntent, StructuredQuery};
    use crate::search::accumulator::{IngestReport, IterationOutcome, IterationRecord};

    fn intent(min_results: usize, max_iterations: u32) -> SearchIntent {
        SearchIntent::builder("Find CEOs at SaaS companies")
            .min_results(min_results)
            .max_iterations(max_iterations)
            .build()
            .expect("intent")
    }

    fn completed(iteration: u32, new_unique: usize) -> IterationRecord {
        IterationRecord::completed(
            iteration,
            StructuredQuery::new(10).with_titles(["CEO"]),
            new_unique,
            None,
            IngestReport { new_unique, ..IngestReport::default() },
        )
    }

    #[test]
    fn happy_path_cycles_back_to_planning() {
        let mut phase = RunPhase::Planning;
        for event in [RunEvent::QueryPlanned, RunEvent::SearchCompleted, RunEvent::RecordsIngested, RunEvent::Continue] {
            phase = transition(phase, event).expect("valid transition").to;
        }
        assert_eq!(phase, RunPhase::Planning);
    }

    #[test]
    fn failed_search_skips_accumulation() {
        let outcome = transition(RunPhase::Searching, RunEvent::SearchFailed).expect("valid");
        assert_eq!(outcome.to, RunPhase::Evaluating);
    }

    #[test]
    fn interruption_is_rejected_mid_accumulation() {
        let error = transition(RunPhase::Accumulating, RunEvent::Interrupted)
            .expect_err("ingest cannot be abandoned");
        assert!(matches!(error, PhaseTransitionError::InvalidTransition { .. }));
        assert_eq!(
            transition(RunPhase::Searching, RunEvent::Interrupted).expect("valid").to,
            RunPhase::Done
        );
    }

    #[test]
    fn done_is_terminal() {
        let error = transition(RunPhase::Done, RunEvent::Continue).expect_err("terminal");
        assert_eq!(error, PhaseTransitionError::AlreadyDone { event: RunEvent::Continue });
    }

    #[test]
    fn invalid_pairs_are_rejected() {
        assert!(transition(RunPhase::Planning, RunEvent::RecordsIngested).is_err());
        assert!(transition(RunPhase::Evaluating, RunEvent::QueryPlanned).is_err());
    }

    #[test]
    fn target_rule_wins_over_cap() {
        let intent = intent(5, 1);
        let last = completed(1, 5);
        assert_eq!(evaluate_stop(&intent, 1, 5, Some(&last)), Some(StopReason::TargetReached));
    }

    #[test]
    fn zero_yield_on_first_iteration_is_not_exhaustion() {
        let intent = intent(5, 10);
        assert_eq!(evaluate_stop(&intent, 1, 0, Some(&completed(1, 0))), None);
        assert_eq!(evaluate_stop(&intent, 2, 3, Some(&completed(2, 0))), Some(StopReason::Exhausted));
    }

    #[test]
    fn failed_iteration_is_not_exhaustion() {
        let intent = intent(10, 3);
        let failed = IterationRecord::failed(
            2,
            StructuredQuery::new(10),
            IterationOutcome::ProviderFailed("503".into()),
        );
        assert_eq!(evaluate_stop(&intent, 2, 4, Some(&failed)), None);
        assert_eq!(evaluate_stop(&intent, 3, 4, Some(&failed)), Some(StopReason::IterationCapReached));
    }

    #[test]
    fn zero_minimum_is_satisfied_after_first_iteration() {
        let intent = intent(0, 3);
        assert_eq!(evaluate_stop(&intent, 0, 0, None), None);
        assert_eq!(evaluate_stop(&intent, 1, 0, Some(&completed(1, 0))), Some(StopReason::TargetReached));
    }

    #[test]
    fn stop_reason_classification() {
        assert!(StopReason::TargetReached.is_satisfied());
        assert!(!StopReason::Exhausted.is_degraded());
        assert!(StopReason::PlannerFailed("down".into()).is_degraded());
        assert_eq!(StopReason::IterationCapReached.as_str(), "iteration_cap_reached");
    }
}
