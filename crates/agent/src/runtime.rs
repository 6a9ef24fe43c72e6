use std::time::Duration;

use leadscout_core::config::{AppConfig, PlannerKind};
use leadscout_core::domain::SearchIntent;
use leadscout_core::errors::RunError;
use leadscout_core::search::{
    QueryPlanner, RunControl, RunResult, SearchOrchestrator, SearchProvider,
};
use thiserror::Error;
use tracing::info;

use crate::directory::HttpDirectoryProvider;
use crate::keywords::KeywordQueryPlanner;
use crate::llm::HttpLlmClient;
use crate::planner::LlmQueryPlanner;

pub type DynPlanner = Box<dyn QueryPlanner>;
pub type DynProvider = Box<dyn SearchProvider>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("query planner could not be initialised: {0}")]
    Planner(String),
    #[error("directory provider could not be initialised: {0}")]
    Provider(String),
}

/// A configured orchestrator plus the run bounds taken from `AppConfig`.
pub struct SearchRuntime {
    orchestrator: SearchOrchestrator<DynPlanner, DynProvider>,
    planner_kind: PlannerKind,
    deadline: Option<Duration>,
}

impl SearchRuntime {
    pub fn from_config(config: &AppConfig) -> Result<Self, RuntimeError> {
        let planner: DynPlanner = match config.search.planner {
            PlannerKind::Keyword => Box::new(KeywordQueryPlanner::new()),
            PlannerKind::Llm => {
                let client = HttpLlmClient::from_config(&config.llm)
                    .map_err(|error| RuntimeError::Planner(error.to_string()))?;
                Box::new(LlmQueryPlanner::new(client))
            }
        };
        let provider: DynProvider = Box::new(
            HttpDirectoryProvider::from_config(&config.directory)
                .map_err(|error| RuntimeError::Provider(error.to_string()))?,
        );

        Ok(Self::new(planner, provider, config))
    }

    pub fn new(planner: DynPlanner, provider: DynProvider, config: &AppConfig) -> Self {
        Self {
            orchestrator: SearchOrchestrator::new(planner, provider),
            planner_kind: config.search.planner,
            deadline: config.search.deadline(),
        }
    }

    pub fn planner_kind(&self) -> PlannerKind {
        self.planner_kind
    }

    /// Fresh bounds for one run. The deadline clock starts on this call and
    /// the cancellation token is never shared with another run.
    pub fn control(&self) -> RunControl {
        match self.deadline {
            Some(timeout) => RunControl::with_timeout(timeout),
            None => RunControl::default(),
        }
    }

    pub async fn run(&self, intent: &SearchIntent) -> Result<RunResult, RunError> {
        self.run_with(intent, self.control()).await
    }

    pub async fn run_with(
        &self,
        intent: &SearchIntent,
        control: RunControl,
    ) -> Result<RunResult, RunError> {
        info!(
            event_name = "runtime.search.dispatch",
            planner = ?self.planner_kind,
            "dispatching search run"
        );
        self.orchestrator.run_with(intent, control).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use leadscout_core::config::{AppConfig, PlannerKind};
    use leadscout_core::domain::{CandidateRecord, SearchIntent, StructuredQuery};
    use leadscout_core::errors::ProviderFailure;
    use leadscout_core::search::{SearchPage, SearchProvider, StopReason};

    use super::{RuntimeError, SearchRuntime};
    use crate::keywords::KeywordQueryPlanner;

    struct FixedProvider;

    #[async_trait]
    impl SearchProvider for FixedProvider {
        async fn search(
            &self,
            query: &StructuredQuery,
            _limit: u32,
        ) -> Result<SearchPage, ProviderFailure> {
            let records = query
                .titles
                .iter()
                .map(|title| {
                    CandidateRecord::named(format!("{title} person"))
                        .with_email(format!("{}@example.com", title.to_lowercase().replace(' ', ".")))
                })
                .collect::<Vec<_>>();
            let total = records.len() as u64;
            Ok(SearchPage::new(records, total))
        }
    }

    #[test]
    fn missing_directory_key_fails_construction() {
        let config = AppConfig::default();

        let outcome = SearchRuntime::from_config(&config);

        assert!(matches!(outcome, Err(RuntimeError::Provider(_))));
    }

    #[tokio::test]
    async fn keyword_runtime_runs_against_provider() {
        let mut config = AppConfig::default();
        config.search.deadline_secs = 0;
        let runtime = SearchRuntime::new(
            Box::new(KeywordQueryPlanner::new()),
            Box::new(FixedProvider),
            &config,
        );
        let intent = SearchIntent::builder("Find CEOs in Austin")
            .min_results(3)
            .max_iterations(3)
            .build()
            .expect("intent");

        let result = runtime.run(&intent).await.expect("run");

        assert_eq!(runtime.planner_kind(), PlannerKind::Keyword);
        assert_eq!(result.stop_reason, StopReason::TargetReached);
        assert_eq!(result.iterations, 2);
        assert!(result.contacts.len() >= 3);
    }

    fn single_pass_intent() -> SearchIntent {
        SearchIntent::builder("Find CEOs in Austin")
            .min_results(1)
            .max_iterations(1)
            .build()
            .expect("intent")
    }

    #[tokio::test]
    async fn each_run_gets_its_own_deadline() {
        let mut config = AppConfig::default();
        config.search.deadline_secs = 1;
        let runtime = SearchRuntime::new(
            Box::new(KeywordQueryPlanner::new()),
            Box::new(FixedProvider),
            &config,
        );

        let first = runtime.run(&single_pass_intent()).await.expect("first run");
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second = runtime.run(&single_pass_intent()).await.expect("second run");

        assert_eq!(first.stop_reason, StopReason::TargetReached);
        assert_eq!(second.stop_reason, StopReason::TargetReached);
        assert_eq!(second.iterations, 1);
        assert!(!second.contacts.is_empty());
    }

    #[tokio::test]
    async fn cancelling_one_run_leaves_the_next_untouched() {
        let mut config = AppConfig::default();
        config.search.deadline_secs = 0;
        let runtime = SearchRuntime::new(
            Box::new(KeywordQueryPlanner::new()),
            Box::new(FixedProvider),
            &config,
        );

        let cancelled = runtime.control();
        cancelled.cancellation.cancel();
        let aborted = runtime.run_with(&single_pass_intent(), cancelled).await.expect("cancelled run");
        let next = runtime.run(&single_pass_intent()).await.expect("next run");

        assert_eq!(aborted.stop_reason, StopReason::Cancelled);
        assert!(!runtime.control().cancellation.is_cancelled());
        assert!(runtime.control().deadline.is_none());
        assert_eq!(next.stop_reason, StopReason::TargetReached);
    }
}
