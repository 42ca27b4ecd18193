//! Point sets: a vertex count, vertex attributes and generated vertex labels.

use super::config::FactoryConfig;
use super::core::{AttributeSlot, FactoryCore, Layer, MeshFactory};
use super::input::{AttributeMap, DoubleData};
use crate::data::{Attribute, Category, GeometryKind};
use crate::error::Result;
use crate::graph::{NodeId, Value, ValueType};
use crate::utility::index_labels;

/// `"0" .. "n-1"`, or nothing for an empty category.
pub(crate) fn labels_for(count: usize) -> Option<Value> {
    (count > 0).then(|| Value::from(index_labels(count)))
}

/// Nodes of the point set level.
#[derive(Debug, Clone)]
pub struct PointSetNodes {
    pub vertex_count: NodeId,
    pub vertex_labels: AttributeSlot,
}

impl PointSetNodes {
    pub fn new(core: &mut FactoryCore) -> Self {
        let vertex_count = core.count_node(Category::Vertex);

        let vertex_labels = core.slot(Category::Vertex, Attribute::Labels, ValueType::Strings);
        core.add_ingredient(vertex_labels.node(), vertex_count);
        core.set_slot_method(&vertex_labels, move |r, _| labels_for(r.count(vertex_count)));

        Self {
            vertex_count,
            vertex_labels,
        }
    }
}

impl Layer for PointSetNodes {
    fn recompute(&self, core: &mut FactoryCore) {
        core.resolve(self.vertex_count);
        core.resolve(self.vertex_labels.node());
    }

    fn materialize(&self, core: &mut FactoryCore) -> Result<()> {
        core.sync_count(Category::Vertex);
        core.write_category(Category::Vertex)?;
        core.materialize_slot(&self.vertex_labels)
    }
}

/// Client API of every factory that has vertices.
pub trait PointSetBuilder: MeshFactory {
    fn points(&self) -> &PointSetNodes;

    fn vertex_count(&mut self) -> usize {
        self.core_mut().resolved_count(Category::Vertex)
    }

    /// Set the number of vertices. A different count drops all explicit
    /// vertex attributes.
    fn set_vertex_count(&mut self, count: usize) -> Result<()> {
        self.core_mut().set_count(Category::Vertex, count)
    }

    fn set_vertex_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> Result<()> {
        self.core_mut().set_attribute(Category::Vertex, attribute, value)
    }

    /// Set several vertex attributes at once; nothing is stored if any fails.
    fn set_vertex_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        self.core_mut().set_attributes(Category::Vertex, attributes)
    }

    fn set_vertex_coordinates<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Vertex, Attribute::Coordinates, Some(data.into()))
    }

    fn clear_vertex_coordinates(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::Coordinates, None)
    }

    fn set_vertex_normals<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Vertex, Attribute::Normals, Some(data.into()))
    }

    fn clear_vertex_normals(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::Normals, None)
    }

    fn set_vertex_colors<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Vertex, Attribute::Colors, Some(data.into()))
    }

    fn clear_vertex_colors(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::Colors, None)
    }

    fn set_vertex_texture_coordinates<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut().set_double_data(
            Category::Vertex,
            Attribute::TextureCoordinates,
            Some(data.into()),
        )
    }

    fn clear_vertex_texture_coordinates(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::TextureCoordinates, None)
    }

    fn set_vertex_labels(&mut self, labels: Vec<String>) -> Result<()> {
        self.set_vertex_attribute(Attribute::Labels, Some(Value::from(labels)))
    }

    fn clear_vertex_labels(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::Labels, None)
    }

    /// One radius factor per vertex.
    fn set_vertex_relative_radii(&mut self, radii: Vec<f64>) -> Result<()> {
        self.set_vertex_attribute(Attribute::RelativeRadii, Some(Value::from(radii)))
    }

    fn clear_vertex_relative_radii(&mut self) -> Result<()> {
        self.set_vertex_attribute(Attribute::RelativeRadii, None)
    }

    fn is_generate_vertex_labels(&self) -> bool {
        self.core().is_generated(&self.points().vertex_labels)
    }

    fn set_generate_vertex_labels(&mut self, generate: bool) -> Result<()> {
        let slot = self.points().vertex_labels.clone();
        self.core_mut().set_generate(&slot, generate)
    }
}

/// Builds a point set.
#[derive(Debug)]
pub struct PointSetFactory {
    core: FactoryCore,
    points: PointSetNodes,
}

impl PointSetFactory {
    pub fn new() -> Self {
        let mut core = FactoryCore::new(GeometryKind::PointSet);
        let points = PointSetNodes::new(&mut core);
        Self { core, points }
    }

    pub fn with_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new();
        config.apply_point_set(&mut factory)?;
        Ok(factory)
    }
}

impl Default for PointSetFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshFactory for PointSetFactory {
    fn core(&self) -> &FactoryCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactoryCore {
        &mut self.core
    }

    fn update(&mut self) -> Result<()> {
        self.core.run_update(&[&self.points])
    }
}

impl PointSetBuilder for PointSetFactory {
    fn points(&self) -> &PointSetNodes {
        &self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;

    #[test]
    fn labels_follow_vertex_count() {
        let mut factory = PointSetFactory::new();
        factory.set_generate_vertex_labels(true).unwrap();
        factory.set_vertex_count(2).unwrap();
        factory.update().unwrap();
        assert_eq!(
            factory.geometry().labels(Category::Vertex).unwrap().as_slice(),
            &["0".to_string(), "1".to_string()]
        );

        factory.set_vertex_count(4).unwrap();
        factory.update().unwrap();
        assert_eq!(factory.geometry().labels(Category::Vertex).unwrap().len(), 4);

        factory.set_vertex_count(0).unwrap();
        factory.update().unwrap();
        assert!(factory.geometry().labels(Category::Vertex).is_none());
        assert_eq!(factory.geometry().vertex_count(), 0);
    }

    #[test]
    fn flat_coordinates_are_split_per_vertex() {
        let mut factory = PointSetFactory::new();
        factory.set_vertex_count(2).unwrap();
        factory
            .set_vertex_coordinates(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
            .unwrap();
        factory.update().unwrap();
        let coords = factory.geometry().vertex_coordinates().unwrap();
        assert_eq!(coords[1], vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn count_change_drops_explicit_attributes() {
        let mut factory = PointSetFactory::new();
        factory.set_vertex_count(1).unwrap();
        factory.set_vertex_relative_radii(vec![0.5]).unwrap();
        factory.update().unwrap();
        assert!(factory
            .geometry()
            .attribute(Category::Vertex, &Attribute::RelativeRadii)
            .is_some());

        factory.set_vertex_count(2).unwrap();
        factory.update().unwrap();
        assert!(factory
            .geometry()
            .attribute(Category::Vertex, &Attribute::RelativeRadii)
            .is_none());
    }

    #[test]
    fn bulk_attributes_are_all_or_nothing() {
        let mut factory = PointSetFactory::new();
        factory.set_vertex_count(2).unwrap();
        let mut attributes = AttributeMap::new();
        attributes.insert(Attribute::named("pointSize"), Value::from(vec![1.0, 2.0]));
        attributes.insert(Attribute::Colors, Value::from(vec![vec![1.0, 0.0, 0.0]]));

        let err = factory.set_vertex_attributes(attributes).unwrap_err();
        assert!(matches!(err, GeometryError::WrongLength { .. }));
        assert!(factory.core().store().vertex.is_empty());
    }
}
