//! Graph Nodes
//!
//! This module defines the nodes that live in the dependency graph.

use std::fmt;

use indexmap::IndexSet;

use super::dependency_graph::UpdateFn;
use super::value::{Value, ValueType};

/// Handle of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the raw arena index.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The traversal a node was re-entered in when a cycle was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Ingredient-first recomputation.
    Resolve,
    /// Downstream invalidation.
    Outdate,
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traversal::Resolve => f.write_str("resolve"),
            Traversal::Outdate => f.write_str("outdate"),
        }
    }
}

/// A node in the dependency graph.
///
/// `C` is the context type recompute functions may read besides other nodes.
pub struct Node<C> {
    /// Diagnostic name.
    name: String,

    /// Declared payload type.
    value_type: ValueType,

    /// Cached value. `None` means "not available".
    pub(crate) value: Option<Value>,

    /// Whether the cached value must be recomputed before it is read.
    pub(crate) out_of_date: bool,

    /// Graph clock value at the last resolution.
    pub(crate) last_updated: u64,

    /// Set while this node is being resolved.
    pub(crate) updating: bool,

    /// Set while this node is being outdated.
    pub(crate) outdating: bool,

    /// Nodes this node reads from, in insertion order.
    ingredients: IndexSet<NodeId>,

    /// Nodes that read from this node.
    dependents: IndexSet<NodeId>,

    /// Recompute function. Nodes without one keep whatever was assigned.
    pub(crate) update_fn: Option<UpdateFn<C>>,
}

impl<C> Node<C> {
    /// Create an out-of-date node without a value.
    pub(crate) fn new(name: String, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            value: None,
            out_of_date: true,
            last_updated: 0,
            updating: false,
            outdating: false,
            ingredients: IndexSet::new(),
            dependents: IndexSet::new(),
            update_fn: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The cached value, without resolving.
    pub fn cached(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date
    }

    /// Graph clock value at the last resolution (0 if never resolved).
    pub fn last_updated(&self) -> u64 {
        self.last_updated
    }

    pub fn has_update_method(&self) -> bool {
        self.update_fn.is_some()
    }

    pub(crate) fn add_ingredient(&mut self, id: NodeId) {
        self.ingredients.insert(id);
    }

    pub(crate) fn remove_ingredient(&mut self, id: NodeId) {
        self.ingredients.shift_remove(&id);
    }

    pub fn ingredients(&self) -> &IndexSet<NodeId> {
        &self.ingredients
    }

    pub(crate) fn add_dependent(&mut self, id: NodeId) {
        self.dependents.insert(id);
    }

    pub(crate) fn remove_dependent(&mut self, id: NodeId) {
        self.dependents.shift_remove(&id);
    }

    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("out_of_date", &self.out_of_date)
            .field("last_updated", &self.last_updated)
            .field("ingredients", &self.ingredients)
            .field("dependents", &self.dependents)
            .finish()
    }
}
