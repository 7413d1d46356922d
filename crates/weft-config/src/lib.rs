//! Weft Config
//!
//! This crate contains the graph document types for weft and the parser that
//! turns raw graph text into a [`GraphDef`]. A graph definition is the
//! form a workflow takes before its external resources are bound. Node data
//! is decoded into typed configuration separately, with [`NodeDef::decode`].
//!
//! Documents are JSON with a `nodes` collection, optional explicit `edges`
//! and an optional `terminal` node id. Dependencies are also discovered
//! implicitly: any node that reads a variable produced by another node gets
//! an edge from that producer.

mod decode;
mod edge;
mod error;
mod graph;
mod node;
mod parser;

pub use edge::Edge;
pub use error::{NodeDataError, ParseError};
pub use graph::GraphDef;
pub use node::{InternalConfig, InternalOp, LlmConfig, NodeDef, NodeKind, Operand};
pub use parser::parse;
