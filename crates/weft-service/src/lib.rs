//! Weft Service
//!
//! The caller-facing boundary: definition management on top of a
//! [`DefinitionStore`], and the parse → bind → execute sequence for ad-hoc
//! graphs ([`WorkflowService::test`]) and stored definitions
//! ([`WorkflowService::run_definition`]).
//!
//! Pipelines are compiled on demand and never cached, so a changed definition
//! or credential takes effect on the next run.
//!
//! [`DefinitionStore`]: weft_store::DefinitionStore

mod error;
mod service;

pub use error::ServiceError;
pub use service::WorkflowService;
