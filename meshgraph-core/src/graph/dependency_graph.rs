//! Dependency Graph
//!
//! The graph owns every node of a factory in one arena and implements the
//! two traversals the factories rely on:
//!
//! - `outdate` walks *down* the dependent edges and marks every reachable node
//!   out of date. It runs whenever a value is assigned.
//! - `resolve` walks *up* the ingredient edges. An out-of-date node first
//!   resolves all of its ingredients (depth first, insertion order), then runs
//!   its recompute function and stamps itself with the graph clock.
//!
//! Both traversals set a per-node flag while they are inside a node. Entering
//! a flagged node again means the wiring contains a cycle; the graph panics
//! instead of recursing forever.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use super::node::{Node, NodeId, Traversal};
use super::value::{Metric, Value, ValueType};
use crate::error::{GeometryError, Result};
use crate::factory::Immersion;

/// A recompute function.
///
/// It receives a [`Resolver`] to read other nodes and the node's previous
/// value as a hint whose buffers may be reused. Returning `None` means the
/// value is not available (for example because a prerequisite is missing).
pub type UpdateFn<C> =
    Arc<dyn Fn(&mut Resolver<'_, C>, Option<Value>) -> Option<Value> + Send + Sync>;

/// Arena of nodes plus the clock nodes stamp themselves with.
pub struct DependencyGraph<C> {
    nodes: Vec<Node<C>>,
    clock: u64,
}

impl<C> DependencyGraph<C> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            clock: 0,
        }
    }

    /// Add an out-of-date node without a value.
    pub fn add_node(&mut self, name: impl Into<String>, value_type: ValueType) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(name.into(), value_type));
        id
    }

    /// Add a node holding an initial value.
    ///
    /// Panics if `value_type` does not accept `value`.
    pub fn add_node_with(
        &mut self,
        name: impl Into<String>,
        value_type: ValueType,
        value: Value,
    ) -> NodeId {
        let id = self.add_node(name, value_type);
        if let Err(err) = self.set_value(id, Some(value)) {
            panic!("{err}");
        }
        id
    }

    /// Get a node. Panics if the handle belongs to another graph.
    pub fn node(&self, id: NodeId) -> &Node<C> {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<C> {
        &mut self.nodes[id.index()]
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Current clock value: the stamp of the most recent resolution.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Make `ingredient` an ingredient of `node` (and `node` a dependent of it).
    ///
    /// If the ingredient is out of date, `node` is outdated right away.
    pub fn add_ingredient(&mut self, node: NodeId, ingredient: NodeId) {
        if node == ingredient {
            panic!(
                "{}",
                GeometryError::SelfDependency {
                    node: self.node(node).name().to_string()
                }
            );
        }
        self.node_mut(node).add_ingredient(ingredient);
        self.node_mut(ingredient).add_dependent(node);
        if self.node(ingredient).is_out_of_date() {
            self.outdate(node);
        }
    }

    /// Remove an ingredient edge in both directions.
    pub fn remove_ingredient(&mut self, node: NodeId, ingredient: NodeId) {
        self.node_mut(node).remove_ingredient(ingredient);
        self.node_mut(ingredient).remove_dependent(node);
    }

    /// Make `dependent` a dependent of `node`.
    pub fn add_dependent(&mut self, node: NodeId, dependent: NodeId) {
        self.add_ingredient(dependent, node);
    }

    /// Remove a dependent edge in both directions.
    pub fn remove_dependent(&mut self, node: NodeId, dependent: NodeId) {
        self.remove_ingredient(dependent, node);
    }

    /// Assign a value.
    ///
    /// Assigning the value the node already holds does nothing. Otherwise the
    /// node and all of its transitive dependents are outdated.
    pub fn set_value(&mut self, id: NodeId, value: Option<Value>) -> Result<()> {
        let node = self.node_mut(id);
        if let Some(v) = &value {
            if !node.value_type().accepts(v) {
                return Err(GeometryError::TypeMismatch {
                    node: node.name().to_string(),
                    expected: node.value_type(),
                    found: v.value_type(),
                });
            }
        }
        let unchanged = match (&node.value, &value) {
            (Some(old), Some(new)) => old.same(new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }
        node.value = value;
        self.outdate(id);
        Ok(())
    }

    /// The cached value, without resolving.
    pub fn peek(&self, id: NodeId) -> Option<&Value> {
        self.node(id).cached()
    }

    /// Resolve a node and return its value.
    pub fn get(&mut self, id: NodeId, context: &C) -> Option<Value> {
        self.resolve(id, context);
        self.node(id).cached().cloned()
    }

    /// Bring a node up to date, resolving its ingredients first.
    pub fn resolve(&mut self, id: NodeId, context: &C) {
        let node = self.node_mut(id);
        if !node.out_of_date {
            return;
        }
        if node.updating {
            panic!(
                "{}",
                GeometryError::CycleDetected {
                    node: node.name().to_string(),
                    phase: Traversal::Resolve,
                }
            );
        }
        node.updating = true;

        let ingredients: SmallVec<[NodeId; 8]> = node.ingredients().iter().copied().collect();
        for ingredient in ingredients {
            self.resolve(ingredient, context);
        }

        let node = self.node_mut(id);
        if let Some(method) = node.update_fn.clone() {
            let hint = node.value.take();
            let value = method(&mut Resolver::new(self, context), hint);
            let node = self.node_mut(id);
            if let Some(v) = &value {
                if !node.value_type().accepts(v) {
                    panic!(
                        "{}",
                        GeometryError::TypeMismatch {
                            node: node.name().to_string(),
                            expected: node.value_type(),
                            found: v.value_type(),
                        }
                    );
                }
            }
            node.value = value;
        }

        self.clock += 1;
        let stamp = self.clock;
        let node = self.node_mut(id);
        node.out_of_date = false;
        node.updating = false;
        node.last_updated = stamp;
        trace!(node = node.name(), stamp, "resolved");
    }

    /// Mark a node and everything downstream of it out of date.
    pub fn outdate(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if node.outdating {
            panic!(
                "{}",
                GeometryError::CycleDetected {
                    node: node.name().to_string(),
                    phase: Traversal::Outdate,
                }
            );
        }
        node.outdating = true;
        node.out_of_date = true;
        trace!(node = node.name(), "outdated");

        let dependents: SmallVec<[NodeId; 8]> = node.dependents().iter().copied().collect();
        for dependent in dependents {
            self.outdate(dependent);
        }
        self.node_mut(id).outdating = false;
    }

    /// Replace the recompute function. Always outdates the node.
    pub fn set_update_method<F>(&mut self, id: NodeId, method: F)
    where
        F: Fn(&mut Resolver<'_, C>, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.set_update_fn(id, Some(Arc::new(method)));
    }

    /// Replace the recompute function with a shared one (or remove it).
    pub fn set_update_fn(&mut self, id: NodeId, method: Option<UpdateFn<C>>) {
        self.node_mut(id).update_fn = method;
        self.outdate(id);
    }

    /// The current recompute function, for wrapping.
    pub fn update_fn(&self, id: NodeId) -> Option<UpdateFn<C>> {
        self.node(id).update_fn.clone()
    }
}

impl<C> Default for DependencyGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read access to the graph and the context from inside a recompute function.
///
/// Every read resolves the node first, so values seen here are never stale.
pub struct Resolver<'a, C> {
    graph: &'a mut DependencyGraph<C>,
    context: &'a C,
}

impl<'a, C> Resolver<'a, C> {
    pub(crate) fn new(graph: &'a mut DependencyGraph<C>, context: &'a C) -> Self {
        Self { graph, context }
    }

    pub fn context(&self) -> &'a C {
        self.context
    }

    /// Resolve a node and return its value.
    pub fn get(&mut self, id: NodeId) -> Option<Value> {
        self.graph.get(id, self.context)
    }

    /// A count node's value; absent counts read as zero.
    pub fn count(&mut self, id: NodeId) -> usize {
        self.get(id).and_then(|v| v.as_count()).unwrap_or(0)
    }

    /// A boolean node's value; absent flags read as false.
    pub fn flag(&mut self, id: NodeId) -> bool {
        self.get(id).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn metric(&mut self, id: NodeId) -> Metric {
        self.get(id).and_then(|v| v.as_metric()).unwrap_or_default()
    }

    pub fn ints(&mut self, id: NodeId) -> Option<Arc<Vec<usize>>> {
        self.get(id).and_then(|v| v.as_ints().cloned())
    }

    pub fn doubles(&mut self, id: NodeId) -> Option<Arc<Vec<f64>>> {
        self.get(id).and_then(|v| v.as_doubles().cloned())
    }

    pub fn int_arrays(&mut self, id: NodeId) -> Option<Arc<Vec<Vec<usize>>>> {
        self.get(id).and_then(|v| v.as_int_arrays().cloned())
    }

    pub fn double_arrays(&mut self, id: NodeId) -> Option<Arc<Vec<Vec<f64>>>> {
        self.get(id).and_then(|v| v.as_double_arrays().cloned())
    }

    pub fn immersion(&mut self, id: NodeId) -> Option<Arc<dyn Immersion>> {
        self.get(id).and_then(|v| v.as_immersion().cloned())
    }
}
