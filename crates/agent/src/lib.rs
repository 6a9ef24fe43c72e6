//! Search adapters - planners and directory providers behind the core ports
//!
//! This crate wires the orchestration loop in `leadscout-core` to the outside
//! world:
//! - `keywords` - deterministic planner that maps intent text onto directory facets
//! - `planner` - LLM-backed planner that asks a model for the next structured query
//! - `directory` - HTTP people-directory provider
//! - `runtime` - assembles planner and provider from `AppConfig`
//!
//! # Safety Principle
//!
//! The LLM only translates intent into facets. It never decides which contacts
//! are kept; deduplication and stop rules stay deterministic in the core.

pub mod directory;
pub mod keywords;
pub mod llm;
pub mod planner;
pub mod runtime;

pub use directory::HttpDirectoryProvider;
pub use keywords::KeywordQueryPlanner;
pub use llm::{HttpLlmClient, LlmClient};
pub use planner::LlmQueryPlanner;
pub use runtime::{RuntimeError, SearchRuntime};
