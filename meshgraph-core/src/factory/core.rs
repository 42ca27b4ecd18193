//! Factory Core
//!
//! `FactoryCore` is the state every layer of a factory shares: the dependency
//! graph, the explicit attribute data (which is also the context recompute
//! functions read), the output geometry and the bookkeeping of which node
//! values have already been written to it.
//!
//! # Attribute slots
//!
//! An `AttributeSlot` is a graph node bound to a `(Category, Attribute)` key.
//! While the key is generated the slot runs the method its layer registered;
//! otherwise it yields the explicit list for the key, coerced to the slot's
//! type. The explicit list is represented in the graph by its own node, which
//! is an ingredient of the slot, so explicit writes outdate the slot.
//!
//! # Materialization
//!
//! Every resolution stamps a node with the graph clock. The core remembers the
//! stamp it last wrote for each node; a node is *fresh* when its stamp is newer.
//! Only fresh values are written, so an `update()` with nothing out of date
//! leaves the geometry untouched.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, debug_span};

use super::input::{AttributeMap, DoubleData};
use crate::data::geometry::METRIC;
use crate::data::{Attribute, AttributeStore, Category, Geometry, GeometryKind};
use crate::error::{GeometryError, Result};
use crate::graph::{DependencyGraph, Metric, NodeId, Resolver, UpdateFn, Value, ValueType};

/// The graph type of a factory: recompute functions read the explicit data.
pub type FactoryGraph = DependencyGraph<AttributeStore>;

/// The resolver handed to factory recompute functions.
pub type FactoryResolver<'a> = Resolver<'a, AttributeStore>;

/// A node standing for one attribute list of the output geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSlot {
    node: NodeId,
    category: Category,
    attribute: Attribute,
    value_type: ValueType,
}

impl AttributeSlot {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// One level of a factory: a fixed set of nodes wired into the shared graph.
pub trait Layer {
    /// Resolve this layer's top-level nodes, in a fixed order.
    fn recompute(&self, core: &mut FactoryCore);

    /// Write this layer's fresh values into the geometry.
    fn materialize(&self, core: &mut FactoryCore) -> Result<()>;
}

/// What every factory offers regardless of its level.
pub trait MeshFactory {
    fn core(&self) -> &FactoryCore;

    fn core_mut(&mut self) -> &mut FactoryCore;

    /// Recompute what is out of date and write it into the geometry.
    fn update(&mut self) -> Result<()>;

    /// The geometry as of the last `update()`.
    fn geometry(&self) -> &Geometry {
        self.core().geometry()
    }

    fn metric(&self) -> Metric {
        self.core().metric()
    }

    fn set_metric(&mut self, metric: Metric) -> Result<()> {
        self.core_mut().set_metric(metric)
    }

    fn update_count(&self) -> u64 {
        self.core().update_count()
    }
}

fn category_index(category: Category) -> usize {
    match category {
        Category::Vertex => 0,
        Category::Edge => 1,
        Category::Face => 2,
    }
}

pub struct FactoryCore {
    graph: FactoryGraph,
    store: AttributeStore,
    mesh: Geometry,
    counts: [NodeId; 3],
    metric: NodeId,
    slots: Vec<AttributeSlot>,
    materialized: HashMap<NodeId, u64>,
    update_count: u64,
}

impl FactoryCore {
    pub fn new(kind: GeometryKind) -> Self {
        let mut graph = FactoryGraph::new();
        let counts = Category::ALL.map(|category| {
            let id = graph.add_node(format!("{category}Count"), ValueType::Count);
            graph.set_update_method(id, move |r, _| {
                Some(Value::Count(r.context().category(category).count()))
            });
            id
        });
        let metric = graph.add_node_with("metric", ValueType::Metric, Value::Metric(Metric::Euclidean));
        Self {
            graph,
            store: AttributeStore::new(),
            mesh: Geometry::new(kind),
            counts,
            metric,
            slots: Vec::new(),
            materialized: HashMap::new(),
            update_count: 0,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.mesh
    }

    pub fn graph(&self) -> &FactoryGraph {
        &self.graph
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    /// Number of `update()` passes run so far.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// The node holding the element count of `category`.
    pub fn count_node(&self, category: Category) -> NodeId {
        self.counts[category_index(category)]
    }

    pub fn metric_node(&self) -> NodeId {
        self.metric
    }

    // ----- graph plumbing -----

    pub fn node(&mut self, name: impl Into<String>, value_type: ValueType) -> NodeId {
        self.graph.add_node(name, value_type)
    }

    pub fn node_with(&mut self, name: impl Into<String>, value_type: ValueType, value: Value) -> NodeId {
        self.graph.add_node_with(name, value_type, value)
    }

    pub fn add_ingredient(&mut self, node: NodeId, ingredient: NodeId) {
        self.graph.add_ingredient(node, ingredient);
    }

    pub fn remove_ingredient(&mut self, node: NodeId, ingredient: NodeId) {
        self.graph.remove_ingredient(node, ingredient);
    }

    pub fn set_method<F>(&mut self, id: NodeId, method: F)
    where
        F: Fn(&mut FactoryResolver<'_>, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        self.graph.set_update_method(id, method);
    }

    pub fn set_value(&mut self, id: NodeId, value: Option<Value>) -> Result<()> {
        self.graph.set_value(id, value)
    }

    pub fn outdate(&mut self, id: NodeId) {
        self.graph.outdate(id);
    }

    /// Resolve a node and return its value.
    pub fn resolve(&mut self, id: NodeId) -> Option<Value> {
        self.graph.get(id, &self.store)
    }

    pub fn peek(&self, id: NodeId) -> Option<&Value> {
        self.graph.peek(id)
    }

    pub fn flag(&mut self, id: NodeId) -> bool {
        self.resolve(id).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// The element count of `category` as the graph currently derives it.
    pub fn resolved_count(&mut self, category: Category) -> usize {
        let id = self.count_node(category);
        self.resolve(id).and_then(|v| v.as_count()).unwrap_or(0)
    }

    // ----- attribute slots -----

    /// The node standing for the explicit list of a key, created on first use.
    fn explicit_node(&mut self, category: Category, attribute: &Attribute) -> NodeId {
        if let Some(id) = self.store.category(category).node(attribute) {
            return id;
        }
        let id = self.graph.add_node(format!("{category}.{attribute}.explicit"), ValueType::Any);
        self.store
            .category_mut(category)
            .register_node(attribute.clone(), id);
        id
    }

    /// Declare a slot for `(category, attribute)`. The slot starts out not
    /// generating and without a method.
    pub fn slot(&mut self, category: Category, attribute: Attribute, value_type: ValueType) -> AttributeSlot {
        let node = self.graph.add_node(format!("{category}.{attribute}"), value_type);
        let explicit = self.explicit_node(category, &attribute);
        self.graph.add_ingredient(node, explicit);
        let slot = AttributeSlot {
            node,
            category,
            attribute,
            value_type,
        };
        self.graph.set_update_fn(node, Some(Self::slot_fn(&slot, None)));
        self.slots.push(slot.clone());
        slot
    }

    /// Register the method a slot runs while its key is generated.
    pub fn set_slot_method<F>(&mut self, slot: &AttributeSlot, method: F)
    where
        F: Fn(&mut FactoryResolver<'_>, Option<Value>) -> Option<Value> + Send + Sync + 'static,
    {
        let wrapped = Self::slot_fn(slot, Some(Arc::new(method)));
        self.graph.set_update_fn(slot.node, Some(wrapped));
    }

    fn slot_fn(slot: &AttributeSlot, method: Option<UpdateFn<AttributeStore>>) -> UpdateFn<AttributeStore> {
        let category = slot.category;
        let attribute = slot.attribute.clone();
        let value_type = slot.value_type;
        Arc::new(move |r: &mut FactoryResolver<'_>, hint: Option<Value>| {
            let set = r.context().category(category);
            if set.is_generated(&attribute) {
                if let Some(method) = &method {
                    return method(r, hint);
                }
            }
            set.list(&attribute)
                .cloned()
                .and_then(|value| value.coerce(value_type))
        })
    }

    pub fn is_generated(&self, slot: &AttributeSlot) -> bool {
        self.store
            .category(slot.category)
            .is_generated(&slot.attribute)
    }

    /// Switch generation of a slot on or off.
    ///
    /// Fails with `ExplicitAttributePresent`, leaving everything unchanged,
    /// when turning generation on while explicit data is stored for the key.
    pub fn set_generate(&mut self, slot: &AttributeSlot, generate: bool) -> Result<()> {
        let set = self.store.category(slot.category);
        if set.is_generated(&slot.attribute) == generate {
            return Ok(());
        }
        if generate && set.contains(&slot.attribute) {
            return Err(GeometryError::ExplicitAttributePresent {
                category: slot.category,
                attribute: slot.attribute.clone(),
            });
        }
        self.store
            .category_mut(slot.category)
            .set_generated(&slot.attribute, generate);
        self.graph.outdate(slot.node);
        debug!(category = %slot.category, attribute = %slot.attribute, generate, "generate toggled");
        Ok(())
    }

    /// Generate a slot from construction on. Any explicit data for the key
    /// is dropped.
    pub(crate) fn generate_from_start(&mut self, slot: &AttributeSlot) {
        let set = self.store.category_mut(slot.category);
        set.remove(&slot.attribute);
        set.set_generated(&slot.attribute, true);
        self.graph.outdate(slot.node);
    }

    // ----- explicit data -----

    fn check_attribute(
        &self,
        category: Category,
        attribute: &Attribute,
        value: Option<&Value>,
        expected: usize,
    ) -> Result<()> {
        if self.store.category(category).is_generated(attribute) {
            return Err(GeometryError::AttributeGenerated {
                category,
                attribute: attribute.clone(),
            });
        }
        if let Some(value) = value {
            let Some(found) = value.len() else {
                return Err(GeometryError::InvalidArgument(format!(
                    "{category} {attribute} must be an array, got {}",
                    value.value_type()
                )));
            };
            if found != expected {
                return Err(GeometryError::WrongLength {
                    category,
                    attribute: attribute.clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }

    fn store_attribute(&mut self, category: Category, attribute: Attribute, value: Option<Value>) {
        let set = self.store.category_mut(category);
        let node = set.node(&attribute);
        match value {
            Some(value) => set.insert(attribute, value),
            None => {
                set.remove(&attribute);
            }
        }
        if let Some(node) = node {
            self.graph.outdate(node);
        }
    }

    /// Set or clear one explicit list, checked against the current count.
    pub fn set_attribute(&mut self, category: Category, attribute: Attribute, value: Option<Value>) -> Result<()> {
        let expected = self.resolved_count(category);
        self.check_attribute(category, &attribute, value.as_ref(), expected)?;
        self.store_attribute(category, attribute, value);
        Ok(())
    }

    /// Set or clear a floating point list given flat or nested.
    pub fn set_double_data(&mut self, category: Category, attribute: Attribute, data: Option<DoubleData>) -> Result<()> {
        let value = match data {
            Some(data) => {
                let expected = self.resolved_count(category);
                Some(Value::from(data.into_rows(category, &attribute, expected)?))
            }
            None => None,
        };
        self.set_attribute(category, attribute, value)
    }

    /// Set several lists at once. Nothing is stored unless every list passes.
    pub fn set_attributes(&mut self, category: Category, attributes: AttributeMap) -> Result<()> {
        let expected = self.resolved_count(category);
        for (attribute, value) in &attributes {
            self.check_attribute(category, attribute, Some(value), expected)?;
        }
        for (attribute, value) in attributes {
            self.store_attribute(category, attribute, Some(value));
        }
        Ok(())
    }

    /// Set the explicit element count of a category.
    ///
    /// A different count drops all explicit lists of the category.
    pub fn set_count(&mut self, category: Category, count: usize) -> Result<()> {
        let set = self.store.category_mut(category);
        if set.is_count_blocked() {
            return Err(GeometryError::Unsupported(
                "element count is derived while the category is generated",
            ));
        }
        self.reset_count(category, count);
        Ok(())
    }

    /// Set a count without the blocked check. For layers that own the count.
    pub(crate) fn reset_count(&mut self, category: Category, count: usize) {
        let set = self.store.category_mut(category);
        if !set.set_count(count) {
            return;
        }
        let nodes: SmallVec<[NodeId; 8]> = set.nodes().collect();
        for node in nodes {
            self.graph.outdate(node);
        }
        let count_node = self.count_node(category);
        self.graph.outdate(count_node);
        debug!(%category, count, "count set");
    }

    /// Drop all explicit lists of a category.
    pub fn clear_attributes(&mut self, category: Category) {
        let set = self.store.category_mut(category);
        set.clear();
        let nodes: SmallVec<[NodeId; 8]> = set.nodes().collect();
        for node in nodes {
            self.graph.outdate(node);
        }
    }

    pub(crate) fn set_count_blocked(&mut self, category: Category, blocked: bool) {
        self.store
            .category_mut(category)
            .set_count_blocked(blocked);
    }

    pub fn set_metric(&mut self, metric: Metric) -> Result<()> {
        self.graph.set_value(self.metric, Some(Value::Metric(metric)))
    }

    pub fn metric(&self) -> Metric {
        self.graph
            .peek(self.metric)
            .and_then(Value::as_metric)
            .unwrap_or_default()
    }

    // ----- update passes -----

    /// Run one `update()` pass over `layers`: resolve everything, then write.
    pub fn run_update(&mut self, layers: &[&dyn Layer]) -> Result<()> {
        self.update_count += 1;
        let span = debug_span!("update", pass = self.update_count);
        let _guard = span.enter();

        self.graph.resolve(self.metric, &self.store);
        for layer in layers {
            layer.recompute(self);
        }

        if self.fresh(self.metric) {
            let metric = self.graph.peek(self.metric).cloned();
            self.mesh.set_geometry_attribute(METRIC, metric);
        }
        for layer in layers {
            layer.materialize(self)?;
        }
        Ok(())
    }

    /// Whether a node was recomputed since its value was last written.
    /// Marks the current value as written.
    pub fn fresh(&mut self, id: NodeId) -> bool {
        let stamp = self.graph.node(id).last_updated();
        let seen = self.materialized.entry(id).or_insert(0);
        if stamp > *seen {
            *seen = stamp;
            true
        } else {
            false
        }
    }

    /// Bring the geometry's count of `category` in line with the graph.
    ///
    /// A changed count clears the category in the geometry, so every slot and
    /// explicit list of the category is scheduled for rewriting.
    pub fn sync_count(&mut self, category: Category) -> bool {
        let count = self.resolved_count(category);
        if !self.mesh.set_count(category, count) {
            return false;
        }
        for slot in self.slots.iter().filter(|slot| slot.category == category) {
            self.materialized.remove(&slot.node);
        }
        self.store.category_mut(category).mark_all_changed();
        true
    }

    /// Write the explicit lists of `category` that changed since the last pass.
    pub fn write_category(&mut self, category: Category) -> Result<()> {
        let changed = self.store.category_mut(category).take_changed();
        let mut first_error = None;
        for attribute in changed {
            let set = self.store.category(category);
            if set.is_generated(&attribute) {
                continue;
            }
            let value = set.list(&attribute).cloned();
            if let Err(err) = self.mesh.set_attribute_list(category, attribute.clone(), value) {
                self.store.category_mut(category).mark_changed(attribute);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Write a generated slot if it is fresh.
    pub fn materialize_slot(&mut self, slot: &AttributeSlot) -> Result<()> {
        if !self.is_generated(slot) {
            return Ok(());
        }
        self.graph.resolve(slot.node, &self.store);
        if !self.fresh(slot.node) {
            return Ok(());
        }
        let value = self.graph.peek(slot.node).cloned();
        debug!(
            category = %slot.category,
            attribute = %slot.attribute,
            present = value.is_some(),
            "materialize"
        );
        let result = self
            .mesh
            .set_attribute_list(slot.category, slot.attribute.clone(), value);
        if result.is_err() {
            self.materialized.remove(&slot.node);
        }
        result
    }

    /// Write a list into the geometry directly.
    pub fn write_list(&mut self, category: Category, attribute: Attribute, value: Option<Value>) -> Result<()> {
        self.mesh.set_attribute_list(category, attribute, value)
    }

    pub fn write_geometry_attribute(&mut self, name: &str, value: Option<Value>) {
        self.mesh.set_geometry_attribute(name, value);
    }

    pub(crate) fn forget(&mut self, id: NodeId) {
        self.materialized.remove(&id);
    }
}

impl std::fmt::Debug for FactoryCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryCore")
            .field("nodes", &self.graph.node_count())
            .field("kind", &self.mesh.kind())
            .field("update_count", &self.update_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::index_labels;

    fn labelled_core() -> (FactoryCore, AttributeSlot) {
        let mut core = FactoryCore::new(GeometryKind::PointSet);
        let slot = core.slot(Category::Vertex, Attribute::Labels, ValueType::Strings);
        let count = core.count_node(Category::Vertex);
        core.add_ingredient(slot.node(), count);
        core.set_slot_method(&slot, move |r, _| {
            let n = r.count(count);
            (n > 0).then(|| Value::from(index_labels(n)))
        });
        (core, slot)
    }

    struct Labels(AttributeSlot);

    impl Layer for Labels {
        fn recompute(&self, core: &mut FactoryCore) {
            core.resolve(self.0.node());
        }

        fn materialize(&self, core: &mut FactoryCore) -> Result<()> {
            core.sync_count(Category::Vertex);
            core.write_category(Category::Vertex)?;
            core.materialize_slot(&self.0)
        }
    }

    #[test]
    fn slot_falls_back_to_explicit_data() {
        let (mut core, slot) = labelled_core();
        core.set_count(Category::Vertex, 2).unwrap();
        let labels = Value::from(vec!["a".to_string(), "b".to_string()]);
        core.set_attribute(Category::Vertex, Attribute::Labels, Some(labels.clone()))
            .unwrap();

        assert!(core.resolve(slot.node()).unwrap().same(&labels));
    }

    #[test]
    fn generate_excludes_explicit_data() {
        let (mut core, slot) = labelled_core();
        core.set_count(Category::Vertex, 1).unwrap();
        core.set_attribute(Category::Vertex, Attribute::Labels, Some(Value::from(vec!["x".to_string()])))
            .unwrap();

        let err = core.set_generate(&slot, true).unwrap_err();
        assert!(matches!(err, GeometryError::ExplicitAttributePresent { .. }));
        assert!(!core.is_generated(&slot));

        core.set_attribute(Category::Vertex, Attribute::Labels, None).unwrap();
        core.set_generate(&slot, true).unwrap();
        let err = core
            .set_attribute(Category::Vertex, Attribute::Labels, Some(Value::from(vec!["x".to_string()])))
            .unwrap_err();
        assert!(matches!(err, GeometryError::AttributeGenerated { .. }));

        core.set_generate(&slot, false).unwrap();
        core.set_attribute(Category::Vertex, Attribute::Labels, Some(Value::from(vec!["x".to_string()])))
            .unwrap();
    }

    #[test]
    fn wrong_length_is_rejected_before_storing() {
        let (mut core, _) = labelled_core();
        core.set_count(Category::Vertex, 3).unwrap();
        let err = core
            .set_double_data(Category::Vertex, Attribute::Coordinates, Some(vec![[0.0; 3]; 2].into()))
            .unwrap_err();
        assert!(matches!(err, GeometryError::WrongLength { expected: 3, found: 2, .. }));
        assert!(core.store().vertex.is_empty());
    }

    #[test]
    fn only_fresh_slots_are_written() {
        let (mut core, slot) = labelled_core();
        core.set_generate(&slot, true).unwrap();
        core.set_count(Category::Vertex, 2).unwrap();
        let layer = Labels(slot.clone());

        core.run_update(&[&layer]).unwrap();
        let first = core.geometry().labels(Category::Vertex).cloned().unwrap();
        assert_eq!(first.as_slice(), &["0".to_string(), "1".to_string()]);

        core.run_update(&[&layer]).unwrap();
        let second = core.geometry().labels(Category::Vertex).unwrap();
        assert!(Arc::ptr_eq(&first, second));
        assert_eq!(core.update_count(), 2);
    }

    #[test]
    fn disabling_generation_removes_the_list() {
        let (mut core, slot) = labelled_core();
        core.set_generate(&slot, true).unwrap();
        core.set_count(Category::Vertex, 2).unwrap();
        let layer = Labels(slot.clone());
        core.run_update(&[&layer]).unwrap();
        assert!(core.geometry().labels(Category::Vertex).is_some());

        core.set_generate(&slot, false).unwrap();
        core.run_update(&[&layer]).unwrap();
        assert!(core.geometry().labels(Category::Vertex).is_none());
    }

    #[test]
    fn metric_is_written_once_per_change() {
        let mut core = FactoryCore::new(GeometryKind::PointSet);
        core.run_update(&[]).unwrap();
        assert_eq!(core.geometry().metric(), Metric::Euclidean);

        core.set_metric(Metric::Elliptic).unwrap();
        core.run_update(&[]).unwrap();
        assert_eq!(core.geometry().metric(), Metric::Elliptic);
        assert_eq!(core.metric(), Metric::Elliptic);
    }
}
