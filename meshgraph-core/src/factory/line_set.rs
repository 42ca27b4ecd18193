//! Indexed line sets: point sets plus edges (polylines over the vertices).

use super::config::FactoryConfig;
use super::core::{AttributeSlot, FactoryCore, Layer, MeshFactory};
use super::input::{AttributeMap, DoubleData, IndexData};
use super::point_set::{labels_for, PointSetBuilder, PointSetNodes};
use crate::data::{Attribute, Category, GeometryKind};
use crate::error::Result;
use crate::graph::{NodeId, Value, ValueType};

/// Nodes of the line set level.
#[derive(Debug, Clone)]
pub struct LineSetNodes {
    pub edge_count: NodeId,
    pub edge_labels: AttributeSlot,
}

impl LineSetNodes {
    pub fn new(core: &mut FactoryCore) -> Self {
        let edge_count = core.count_node(Category::Edge);

        let edge_labels = core.slot(Category::Edge, Attribute::Labels, ValueType::Strings);
        core.add_ingredient(edge_labels.node(), edge_count);
        core.set_slot_method(&edge_labels, move |r, _| labels_for(r.count(edge_count)));

        Self {
            edge_count,
            edge_labels,
        }
    }
}

impl Layer for LineSetNodes {
    fn recompute(&self, core: &mut FactoryCore) {
        core.resolve(self.edge_count);
        core.resolve(self.edge_labels.node());
    }

    fn materialize(&self, core: &mut FactoryCore) -> Result<()> {
        core.sync_count(Category::Edge);
        core.write_category(Category::Edge)?;
        core.materialize_slot(&self.edge_labels)
    }
}

/// Client API of every factory that has edges.
pub trait LineSetBuilder: PointSetBuilder {
    fn lines(&self) -> &LineSetNodes;

    fn edge_count(&mut self) -> usize {
        self.core_mut().resolved_count(Category::Edge)
    }

    /// Set the number of edges. Fails while edges are generated from faces.
    fn set_edge_count(&mut self, count: usize) -> Result<()> {
        self.core_mut().set_count(Category::Edge, count)
    }

    fn set_edge_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> Result<()> {
        self.core_mut().set_attribute(Category::Edge, attribute, value)
    }

    fn set_edge_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        self.core_mut().set_attributes(Category::Edge, attributes)
    }

    /// One index row per edge. Flat data is split into polylines of
    /// `per_element` vertices.
    fn set_edge_indices<I: Into<IndexData>>(&mut self, data: I) -> Result<()> {
        let rows = data.into().into_rows()?;
        self.set_edge_attribute(Attribute::Indices, Some(Value::from(rows)))
    }

    fn clear_edge_indices(&mut self) -> Result<()> {
        self.set_edge_attribute(Attribute::Indices, None)
    }

    fn set_edge_colors<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Edge, Attribute::Colors, Some(data.into()))
    }

    fn clear_edge_colors(&mut self) -> Result<()> {
        self.set_edge_attribute(Attribute::Colors, None)
    }

    fn set_edge_labels(&mut self, labels: Vec<String>) -> Result<()> {
        self.set_edge_attribute(Attribute::Labels, Some(Value::from(labels)))
    }

    fn clear_edge_labels(&mut self) -> Result<()> {
        self.set_edge_attribute(Attribute::Labels, None)
    }

    fn set_edge_relative_radii(&mut self, radii: Vec<f64>) -> Result<()> {
        self.set_edge_attribute(Attribute::RelativeRadii, Some(Value::from(radii)))
    }

    fn clear_edge_relative_radii(&mut self) -> Result<()> {
        self.set_edge_attribute(Attribute::RelativeRadii, None)
    }

    fn is_generate_edge_labels(&self) -> bool {
        self.core().is_generated(&self.lines().edge_labels)
    }

    fn set_generate_edge_labels(&mut self, generate: bool) -> Result<()> {
        let slot = self.lines().edge_labels.clone();
        self.core_mut().set_generate(&slot, generate)
    }
}

/// Builds an indexed line set.
#[derive(Debug)]
pub struct IndexedLineSetFactory {
    core: FactoryCore,
    points: PointSetNodes,
    lines: LineSetNodes,
}

impl IndexedLineSetFactory {
    pub fn new() -> Self {
        let mut core = FactoryCore::new(GeometryKind::IndexedLineSet);
        let points = PointSetNodes::new(&mut core);
        let lines = LineSetNodes::new(&mut core);
        Self { core, points, lines }
    }

    pub fn with_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new();
        config.apply_line_set(&mut factory)?;
        Ok(factory)
    }
}

impl Default for IndexedLineSetFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshFactory for IndexedLineSetFactory {
    fn core(&self) -> &FactoryCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactoryCore {
        &mut self.core
    }

    fn update(&mut self) -> Result<()> {
        self.core.run_update(&[&self.points, &self.lines])
    }
}

impl PointSetBuilder for IndexedLineSetFactory {
    fn points(&self) -> &PointSetNodes {
        &self.points
    }
}

impl LineSetBuilder for IndexedLineSetFactory {
    fn lines(&self) -> &LineSetNodes {
        &self.lines
    }
}
