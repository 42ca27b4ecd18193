//! Explicit attribute data.
//!
//! Each factory keeps one `AttributeListSet` per category. It holds the
//! element count and the attribute lists a client supplied directly, plus the
//! bookkeeping that ties them to the graph: which attributes are generated
//! (and therefore refuse explicit data), which lists changed since the last
//! write to the output geometry, and the node standing for each list.

use indexmap::{IndexMap, IndexSet};

use super::attribute::{Attribute, Category};
use crate::graph::{NodeId, Value};

#[derive(Debug, Clone)]
pub struct AttributeListSet {
    category: Category,
    count: usize,
    lists: IndexMap<Attribute, Value>,
    nodes: IndexMap<Attribute, NodeId>,
    generated: IndexSet<Attribute>,
    count_blocked: bool,
    changed: IndexSet<Attribute>,
}

impl AttributeListSet {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            count: 0,
            lists: IndexMap::new(),
            nodes: IndexMap::new(),
            generated: IndexSet::new(),
            count_blocked: false,
            changed: IndexSet::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// The explicitly set element count.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Set the element count. A different count drops every list, since
    /// none of them can have the right length any more.
    ///
    /// Returns whether the count changed.
    pub(crate) fn set_count(&mut self, count: usize) -> bool {
        if count == self.count {
            return false;
        }
        self.count = count;
        self.clear();
        true
    }

    /// Drop every list, marking each for removal from the geometry.
    pub(crate) fn clear(&mut self) {
        let dropped: Vec<Attribute> = self.lists.drain(..).map(|(attribute, _)| attribute).collect();
        self.changed.extend(dropped);
    }

    pub fn list(&self, attribute: &Attribute) -> Option<&Value> {
        self.lists.get(attribute)
    }

    pub fn lists(&self) -> impl Iterator<Item = (&Attribute, &Value)> {
        self.lists.iter()
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.lists.contains_key(attribute)
    }

    /// Whether no explicit list is stored.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub(crate) fn insert(&mut self, attribute: Attribute, value: Value) {
        self.changed.insert(attribute.clone());
        self.lists.insert(attribute, value);
    }

    pub(crate) fn remove(&mut self, attribute: &Attribute) -> Option<Value> {
        let removed = self.lists.shift_remove(attribute);
        if removed.is_some() {
            self.changed.insert(attribute.clone());
        }
        removed
    }

    pub fn is_generated(&self, attribute: &Attribute) -> bool {
        self.generated.contains(attribute)
    }

    pub(crate) fn set_generated(&mut self, attribute: &Attribute, generated: bool) {
        if generated {
            self.generated.insert(attribute.clone());
        } else if self.generated.shift_remove(attribute) {
            self.changed.insert(attribute.clone());
        }
    }

    /// Whether the count is derived and refuses explicit values.
    pub fn is_count_blocked(&self) -> bool {
        self.count_blocked
    }

    pub(crate) fn set_count_blocked(&mut self, blocked: bool) {
        self.count_blocked = blocked;
    }

    /// The node standing for the explicit list of `attribute`, if one was wired.
    pub fn node(&self, attribute: &Attribute) -> Option<NodeId> {
        self.nodes.get(attribute).copied()
    }

    pub(crate) fn register_node(&mut self, attribute: Attribute, node: NodeId) {
        self.nodes.insert(attribute, node);
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.values().copied()
    }

    /// Mark every known attribute for rewriting.
    pub(crate) fn mark_all_changed(&mut self) {
        let keys: Vec<Attribute> = self
            .lists
            .keys()
            .chain(self.nodes.keys())
            .cloned()
            .collect();
        self.changed.extend(keys);
    }

    pub(crate) fn mark_changed(&mut self, attribute: Attribute) {
        self.changed.insert(attribute);
    }

    pub(crate) fn take_changed(&mut self) -> IndexSet<Attribute> {
        std::mem::take(&mut self.changed)
    }
}

/// The explicit data of all three categories. This is the context every
/// recompute function of a factory can read.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    pub vertex: AttributeListSet,
    pub edge: AttributeListSet,
    pub face: AttributeListSet,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self {
            vertex: AttributeListSet::new(Category::Vertex),
            edge: AttributeListSet::new(Category::Edge),
            face: AttributeListSet::new(Category::Face),
        }
    }

    pub fn category(&self, category: Category) -> &AttributeListSet {
        match category {
            Category::Vertex => &self.vertex,
            Category::Edge => &self.edge,
            Category::Face => &self.face,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut AttributeListSet {
        match category {
            Category::Vertex => &mut self.vertex,
            Category::Edge => &mut self.edge,
            Category::Face => &mut self.face,
        }
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_change_drops_lists_and_marks_them() {
        let mut set = AttributeListSet::new(Category::Vertex);
        assert!(set.set_count(2));
        set.insert(Attribute::Labels, Value::from(vec!["a".to_string(), "b".to_string()]));
        set.take_changed();

        assert!(!set.set_count(2));
        assert!(set.contains(&Attribute::Labels));

        assert!(set.set_count(3));
        assert!(set.is_empty());
        assert!(set.take_changed().contains(&Attribute::Labels));
    }

    #[test]
    fn ungenerating_schedules_a_rewrite() {
        let mut set = AttributeListSet::new(Category::Face);
        set.set_generated(&Attribute::Normals, true);
        assert!(set.is_generated(&Attribute::Normals));
        assert!(set.take_changed().is_empty());

        set.set_generated(&Attribute::Normals, false);
        assert!(!set.is_generated(&Attribute::Normals));
        assert_eq!(set.take_changed().len(), 1);
    }

    #[test]
    fn remove_only_marks_present_lists() {
        let mut set = AttributeListSet::new(Category::Edge);
        assert!(set.remove(&Attribute::Colors).is_none());
        assert!(set.take_changed().is_empty());
    }

    #[test]
    fn store_dispatches_by_category() {
        let mut store = AttributeStore::new();
        store.category_mut(Category::Edge).set_count(4);
        assert_eq!(store.edge.count(), 4);
        assert_eq!(store.category(Category::Vertex).count(), 0);
    }
}
