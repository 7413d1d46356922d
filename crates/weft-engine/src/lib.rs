//! Weft Workflow Engine
//!
//! This crate executes compiled pipelines. Each execution owns a private
//! [`VariableScope`] seeded from the caller's inputs; nodes run level by
//! level in the pipeline's topological order and write their results into
//! the scope for downstream nodes to read.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEngine                         │
//! │  - execute(pipeline, inputs, cancel) → ExecutionResult      │
//! │  - level scheduling, fail-fast, cancellation                │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     node behaviors                          │
//! │  - InternalNode: built-in transforms                        │
//! │  - LLMNode: prompt rendering via minijinja + bound invoker  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use weft_engine::{EngineConfig, WorkflowEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = WorkflowEngine::new(EngineConfig::default());
//! let result = engine.execute(&pipeline, inputs, CancellationToken::new()).await?;
//! println!("{}", result.output);
//! ```

mod config;
mod engine;
mod error;
mod events;
mod model;
mod result;
mod scope;
mod template;
mod transform;

pub use config::EngineConfig;
pub use engine::WorkflowEngine;
pub use error::{ExecutionError, NodeError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use result::{ExecutionResult, NodeResult};
pub use scope::VariableScope;
