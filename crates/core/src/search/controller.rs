use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CandidateRecord, SearchIntent, StructuredQuery, Tag};
use crate::errors::{PlanningFailure, ProviderFailure, RunError};
use crate::search::accumulator::{IterationOutcome, IterationRecord, ResultAccumulator};
use crate::search::history::PlanningHistory;
use crate::search::ports::{QueryPlanner, SearchPage, SearchProvider};
use crate::search::states::{evaluate_stop, transition, RunEvent, RunPhase, StopReason};
use crate::search::stats::{RunStats, StatsReporter};

/// Caller-supplied bounds for one run.
#[derive(Clone, Debug, Default)]
pub struct RunControl {
    pub deadline: Option<Instant>,
    pub cancellation: CancellationToken,
}

impl RunControl {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Some(Instant::now() + timeout), ..Self::default() }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn interruption(&self) -> Option<StopReason> {
        if self.cancellation.is_cancelled() {
            Some(StopReason::Cancelled)
        } else if self.deadline_passed() {
            Some(StopReason::DeadlineExceeded)
        } else {
            None
        }
    }

    async fn bounded<F, T>(&self, call: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match self.remaining() {
            Some(remaining) => tokio::time::timeout(remaining, call).await.ok(),
            None => Some(call.await),
        }
    }
}

/// Terminal output of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub contacts: Vec<CandidateRecord>,
    pub companies: Vec<String>,
    pub iterations: u32,
    pub stop_reason: StopReason,
    pub stats: RunStats,
}

/// Drives the plan → search → accumulate → evaluate loop for one intent.
///
/// Iterations run strictly in sequence: every planning step sees the state
/// accumulated by all earlier iterations.
pub struct SearchOrchestrator<P, S> {
    planner: P,
    provider: S,
}

impl<P, S> SearchOrchestrator<P, S>
where
    P: QueryPlanner,
    S: SearchProvider,
{
    pub fn new(planner: P, provider: S) -> Self {
        Self { planner, provider }
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn provider(&self) -> &S {
        &self.provider
    }

    pub async fn run(&self, intent: &SearchIntent) -> Result<RunResult, RunError> {
        self.run_with(intent, RunControl::default()).await
    }

    pub async fn run_with(
        &self,
        intent: &SearchIntent,
        control: RunControl,
    ) -> Result<RunResult, RunError> {
        let run_id = Uuid::new_v4();
        let limit = intent.per_query_limit().min(self.provider.page_maximum()).max(1);
        let mut accumulator = ResultAccumulator::new();
        let mut phase = RunPhase::Planning;
        let mut completed: u32 = 0;
        let mut query = StructuredQuery::default();
        let mut page = SearchPage::default();
        let mut stop_reason = StopReason::IterationCapReached;

        info!(
            event_name = "search.run.started",
            run_id = %run_id,
            query = intent.query(),
            max_iterations = intent.max_iterations(),
            min_results = intent.min_results(),
            per_query_limit = limit,
            "starting directory search run"
        );

        while phase != RunPhase::Done {
            if phase != RunPhase::Accumulating {
                if let Some(reason) = control.interruption() {
                    warn!(
                        event_name = "search.run.interrupted",
                        run_id = %run_id,
                        phase = ?phase,
                        reason = reason.as_str(),
                        "run interrupted before completion"
                    );
                    stop_reason = reason;
                    phase = transition(phase, RunEvent::Interrupted)?.to;
                    continue;
                }
            }

            let event = match phase {
                RunPhase::Planning => {
                    let history = (completed > 0)
                        .then(|| PlanningHistory::from_accumulator(intent, &accumulator, completed + 1));
                    match self.plan(intent, history.as_ref(), limit, &control).await {
                        Ok(planned) => {
                            info!(
                                event_name = "search.query.planned",
                                run_id = %run_id,
                                iteration = completed + 1,
                                query = %planned.summary(),
                                "planned directory query"
                            );
                            query = planned;
                            RunEvent::QueryPlanned
                        }
                        Err(failure) if completed == 0 => {
                            warn!(
                                event_name = "search.planning.failed",
                                run_id = %run_id,
                                error = %failure,
                                "initial planning failed; nothing gathered"
                            );
                            return Err(RunError::Planning(failure));
                        }
                        Err(failure) => {
                            warn!(
                                event_name = "search.planning.failed",
                                run_id = %run_id,
                                iteration = completed + 1,
                                error = %failure,
                                "planning failed; stopping with partial results"
                            );
                            stop_reason = match failure {
                                PlanningFailure::Exhausted => StopReason::Exhausted,
                                PlanningFailure::TimedOut if control.deadline_passed() => {
                                    StopReason::DeadlineExceeded
                                }
                                other => StopReason::PlannerFailed(other.to_string()),
                            };
                            RunEvent::PlanningFailed
                        }
                    }
                }
                RunPhase::Searching => {
                    completed += 1;
                    match self.search(&query, limit, &control).await {
                        Ok(mut fetched) => {
                            fetched.records.truncate(limit as usize);
                            page = fetched;
                            RunEvent::SearchCompleted
                        }
                        Err(failure) => {
                            warn!(
                                event_name = "search.provider.failed",
                                run_id = %run_id,
                                iteration = completed,
                                error = %failure,
                                "directory search failed; recording zero yield"
                            );
                            let outcome = match failure {
                                ProviderFailure::TimedOut => IterationOutcome::TimedOut,
                                other => IterationOutcome::ProviderFailed(other.to_string()),
                            };
                            accumulator.record_iteration(IterationRecord::failed(
                                completed,
                                std::mem::take(&mut query),
                                outcome,
                            ));
                            RunEvent::SearchFailed
                        }
                    }
                }
                RunPhase::Accumulating => {
                    let fetched = std::mem::take(&mut page);
                    let current = std::mem::take(&mut query);
                    let raw_count = fetched.records.len();

                    let mut stamp = current.tag_hints.clone();
                    stamp.insert(Tag::iteration(completed));
                    let records = fetched.records.into_iter().map(|mut record| {
                        record.add_tags(&stamp);
                        record
                    });
                    let report = accumulator.ingest_detailed(records);
                    accumulator.record_iteration(IterationRecord::completed(
                        completed,
                        current,
                        raw_count,
                        Some(fetched.estimated_total),
                        report,
                    ));

                    info!(
                        event_name = "search.iteration.completed",
                        run_id = %run_id,
                        iteration = completed,
                        raw_count,
                        new_unique = report.new_unique,
                        duplicates = report.duplicates,
                        unkeyable = report.unkeyable,
                        unique_total = accumulator.len(),
                        "iteration ingested"
                    );
                    RunEvent::RecordsIngested
                }
                RunPhase::Evaluating => {
                    match evaluate_stop(
                        intent,
                        completed,
                        accumulator.len(),
                        accumulator.iterations().last(),
                    ) {
                        Some(reason) => {
                            stop_reason = reason;
                            RunEvent::Stop
                        }
                        None => RunEvent::Continue,
                    }
                }
                RunPhase::Done => break,
            };

            phase = transition(phase, event)?.to;
        }

        let snapshot = accumulator.snapshot();
        let stats = StatsReporter::summarize(&snapshot);

        info!(
            event_name = "search.run.finished",
            run_id = %run_id,
            stop_reason = stop_reason.as_str(),
            iterations = completed,
            unique_total = stats.total_unique_contacts,
            companies = stats.total_companies,
            failed_iterations = stats.failed_iterations,
            "directory search run finished"
        );

        Ok(RunResult {
            run_id,
            contacts: snapshot.contacts,
            companies: snapshot.companies,
            iterations: completed,
            stop_reason,
            stats,
        })
    }

    async fn plan(
        &self,
        intent: &SearchIntent,
        history: Option<&PlanningHistory>,
        limit: u32,
        control: &RunControl,
    ) -> Result<StructuredQuery, PlanningFailure> {
        if !intent.has_signal() {
            return Err(PlanningFailure::MalformedIntent(
                "intent has neither free text nor title/location/industry hints".to_string(),
            ));
        }

        let mut planned = control
            .bounded(self.planner.plan(intent, history))
            .await
            .ok_or(PlanningFailure::TimedOut)??;
        if planned.is_empty() {
            return Err(PlanningFailure::MalformedResponse(
                "planner produced a query without facets or keywords".to_string(),
            ));
        }
        planned.limit = limit;
        Ok(planned)
    }

    async fn search(
        &self,
        query: &StructuredQuery,
        limit: u32,
        control: &RunControl,
    ) -> Result<SearchPage, ProviderFailure> {
        control.bounded(self.provider.search(query, limit)).await.ok_or(ProviderFailure::TimedOut)?
    }
}
