//! Weft Workflow
//!
//! This crate provides the compiled form of a workflow graph. A [`Pipeline`]
//! is produced by the binder once every external resource a node needs has
//! been resolved; it is immutable and can be executed any number of times,
//! concurrently, with different inputs.
//!
//! Key differences from `weft-config`:
//! - Graph structure is validated (acyclic, single result node)
//! - Model nodes carry an invoker bound to a concrete credential
//! - Nodes are stored in topological order, grouped into levels of
//!   mutually independent nodes

mod error;
mod graph;
mod node;
mod pipeline;

pub use error::WorkflowError;
pub use graph::Graph;
pub use node::{Behavior, CompiledNode, ModelBinding};
pub use pipeline::Pipeline;
