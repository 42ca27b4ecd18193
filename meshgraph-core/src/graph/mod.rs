//! Dependency Graph
//!
//! This module implements the graph of lazily recomputed values that every
//! mesh factory is built on.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes hold typed values (counts, flags, attribute arrays, ...)
//! - Edges are ingredient relations: if A reads B, B is an ingredient of A and
//!   A is a dependent of B
//!
//! Assigning a value outdates the node and everything downstream of it.
//! Nothing is recomputed until somebody asks for a value; `resolve` then
//! brings exactly the out-of-date ingredients up to date, depth first.
//!
//! # Design Decisions
//!
//! 1. Nodes live in one arena owned by the graph and are addressed by
//!    `NodeId`. Dependents are plain indices, so nothing keeps a node alive.
//!
//! 2. Both edge directions are stored, in insertion order, so invalidation
//!    walks dependents and resolution walks ingredients without searching.
//!
//! 3. Recompute functions receive a `Resolver` rather than the graph, which
//!    gives them read access to other nodes and to a context value owned by
//!    the caller (for factories, the explicit attribute data).

mod dependency_graph;
mod node;
mod value;

pub use dependency_graph::{DependencyGraph, Resolver, UpdateFn};
pub use node::{Node, NodeId, Traversal};
pub use value::{reuse_rows, Metric, Value, ValueType};
