use thiserror::Error;

use crate::search::states::PhaseTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid search intent: {0}")]
    InvalidIntent(String),
}

/// The planner could not produce a structured query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanningFailure {
    #[error("query planner unavailable: {0}")]
    Unavailable(String),
    #[error("intent cannot be planned: {0}")]
    MalformedIntent(String),
    #[error("query planner returned an unusable query: {0}")]
    MalformedResponse(String),
    #[error("query planner has no unexplored facets left")]
    Exhausted,
    #[error("query planner timed out")]
    TimedOut,
}

/// A single directory search call failed. Recovered per iteration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderFailure {
    #[error("directory transport failure: {0}")]
    Transport(String),
    #[error("directory rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("directory returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("directory returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("page limit {requested} outside 1..={maximum}")]
    InvalidLimit { requested: u32, maximum: u32 },
    #[error("directory search timed out")]
    TimedOut,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("persistence backend failure: {0}")]
    Backend(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

/// The only error a run surfaces to its caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("initial query planning failed: {0}")]
    Planning(#[from] PlanningFailure),
    #[error(transparent)]
    Transition(#[from] PhaseTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<RunError> for ApplicationError {
    fn from(value: RunError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The search request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "A search dependency is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{
        ApplicationError, DomainError, InterfaceError, PlanningFailure, RunError, StoreError,
    };

    #[test]
    fn invalid_intent_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvalidIntent(
            "max_iterations must be greater than zero".to_owned(),
        ))
        .into_interface("run-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "run-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The search request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn planning_failure_maps_to_service_unavailable() {
        let interface =
            ApplicationError::from(RunError::Planning(PlanningFailure::TimedOut)).into_interface("run-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "run-2");
        assert_eq!(
            interface.user_message(),
            "A search dependency is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn store_error_maps_to_service_unavailable() {
        let interface = ApplicationError::from(StoreError::Backend("database lock timeout".to_owned()))
            .into_interface("run-3");

        assert!(matches!(
            interface,
            InterfaceError::ServiceUnavailable { ref message, .. } if message.contains("lock timeout")
        ));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("invalid directory url".to_owned())
            .into_interface("run-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
