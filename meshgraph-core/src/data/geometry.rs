//! Output Geometry
//!
//! `Geometry` is what a factory produces: per-category element counts, the
//! attribute lists describing those elements, and a few attributes of the
//! geometry as a whole. Every write is checked against the count of its
//! category, so a list in the geometry always has exactly one entry per
//! element.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::attribute::{Attribute, Category};
use crate::error::{GeometryError, Result};
use crate::graph::{Metric, Value};
use crate::utility::BoundingBox;

/// Name of the geometry attribute holding the metric.
pub const METRIC: &str = "metric";
/// Name of the geometry attribute holding the bounding box.
pub const BOUNDING_BOX: &str = "boundingBox";
/// Name of the geometry attribute holding `[u, v]` of a quad mesh.
pub const QUAD_MESH_SHAPE: &str = "quadMeshShape";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    PointSet,
    IndexedLineSet,
    IndexedFaceSet,
}

#[derive(Debug, Clone, Default)]
struct CategoryData {
    count: usize,
    lists: IndexMap<Attribute, Value>,
}

/// A point, line or face set.
#[derive(Debug, Clone)]
pub struct Geometry {
    kind: GeometryKind,
    vertex: CategoryData,
    edge: CategoryData,
    face: CategoryData,
    attributes: IndexMap<String, Value>,
}

impl Geometry {
    pub fn new(kind: GeometryKind) -> Self {
        Self {
            kind,
            vertex: CategoryData::default(),
            edge: CategoryData::default(),
            face: CategoryData::default(),
            attributes: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> GeometryKind {
        self.kind
    }

    fn data(&self, category: Category) -> &CategoryData {
        match category {
            Category::Vertex => &self.vertex,
            Category::Edge => &self.edge,
            Category::Face => &self.face,
        }
    }

    fn data_mut(&mut self, category: Category) -> &mut CategoryData {
        match category {
            Category::Vertex => &mut self.vertex,
            Category::Edge => &mut self.edge,
            Category::Face => &mut self.face,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.data(category).count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex.count
    }

    pub fn edge_count(&self) -> usize {
        self.edge.count
    }

    pub fn face_count(&self) -> usize {
        self.face.count
    }

    /// Set the element count of a category.
    ///
    /// A different count removes every list of the category. Returns whether
    /// the count changed.
    pub fn set_count(&mut self, category: Category, count: usize) -> bool {
        let data = self.data_mut(category);
        if data.count == count {
            return false;
        }
        debug!(%category, from = data.count, to = count, "count changed");
        data.count = count;
        data.lists.clear();
        true
    }

    pub fn attribute(&self, category: Category, attribute: &Attribute) -> Option<&Value> {
        self.data(category).lists.get(attribute)
    }

    pub fn attributes(&self, category: Category) -> &IndexMap<Attribute, Value> {
        &self.data(category).lists
    }

    /// Write or remove one list. The list must have one entry per element.
    pub fn set_attribute_list(
        &mut self,
        category: Category,
        attribute: Attribute,
        value: Option<Value>,
    ) -> Result<()> {
        let data = self.data_mut(category);
        match value {
            None => {
                data.lists.shift_remove(&attribute);
            }
            Some(value) => {
                let Some(found) = value.len() else {
                    return Err(GeometryError::InvalidArgument(format!(
                        "{category} {attribute} must be an array, got {}",
                        value.value_type()
                    )));
                };
                if found != data.count {
                    return Err(GeometryError::WrongLength {
                        category,
                        attribute,
                        expected: data.count,
                        found,
                    });
                }
                data.lists.insert(attribute, value);
            }
        }
        Ok(())
    }

    pub fn geometry_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_geometry_attribute(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.attributes.insert(name.to_string(), value);
            }
            None => {
                self.attributes.shift_remove(name);
            }
        }
    }

    fn double_arrays(&self, category: Category, attribute: &Attribute) -> Option<&Arc<Vec<Vec<f64>>>> {
        self.attribute(category, attribute).and_then(Value::as_double_arrays)
    }

    fn int_arrays(&self, category: Category, attribute: &Attribute) -> Option<&Arc<Vec<Vec<usize>>>> {
        self.attribute(category, attribute).and_then(Value::as_int_arrays)
    }

    pub fn vertex_coordinates(&self) -> Option<&Arc<Vec<Vec<f64>>>> {
        self.double_arrays(Category::Vertex, &Attribute::Coordinates)
    }

    pub fn vertex_normals(&self) -> Option<&Arc<Vec<Vec<f64>>>> {
        self.double_arrays(Category::Vertex, &Attribute::Normals)
    }

    pub fn face_normals(&self) -> Option<&Arc<Vec<Vec<f64>>>> {
        self.double_arrays(Category::Face, &Attribute::Normals)
    }

    pub fn edge_indices(&self) -> Option<&Arc<Vec<Vec<usize>>>> {
        self.int_arrays(Category::Edge, &Attribute::Indices)
    }

    pub fn face_indices(&self) -> Option<&Arc<Vec<Vec<usize>>>> {
        self.int_arrays(Category::Face, &Attribute::Indices)
    }

    pub fn labels(&self, category: Category) -> Option<&Arc<Vec<String>>> {
        self.attribute(category, &Attribute::Labels)
            .and_then(Value::as_strings)
    }

    pub fn metric(&self) -> Metric {
        self.geometry_attribute(METRIC)
            .and_then(Value::as_metric)
            .unwrap_or_default()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry_attribute(BOUNDING_BOX)
            .and_then(Value::as_bounding_box)
    }

    /// Copy out all data-valued content.
    pub fn snapshot(&self) -> GeometrySnapshot {
        let categories = Category::ALL
            .iter()
            .map(|&category| {
                let data = self.data(category);
                CategorySnapshot {
                    category,
                    count: data.count,
                    attributes: data
                        .lists
                        .iter()
                        .filter_map(|(a, v)| Some((a.name().to_string(), SnapshotValue::from_value(v)?)))
                        .collect(),
                }
            })
            .collect();
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(name, v)| Some((name.clone(), SnapshotValue::from_value(v)?)))
            .collect();
        GeometrySnapshot {
            kind: self.kind,
            categories,
            attributes,
        }
    }

    /// MessagePack encoding of [`Geometry::snapshot`].
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(&self.snapshot())?)
    }
}

/// Serializable copy of a [`Geometry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySnapshot {
    pub kind: GeometryKind,
    pub categories: Vec<CategorySnapshot>,
    pub attributes: IndexMap<String, SnapshotValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub category: Category,
    pub count: usize,
    pub attributes: IndexMap<String, SnapshotValue>,
}

/// Plain-data form of a [`Value`]. Immersions have no data form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotValue {
    Bool(bool),
    Count(usize),
    Double(f64),
    Metric(Metric),
    Ints(Vec<usize>),
    Doubles(Vec<f64>),
    Strings(Vec<String>),
    IntArrays(Vec<Vec<usize>>),
    DoubleArrays(Vec<Vec<f64>>),
    BoundingBox(BoundingBox),
}

impl SnapshotValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Bool(b) => SnapshotValue::Bool(*b),
            Value::Count(n) => SnapshotValue::Count(*n),
            Value::Double(d) => SnapshotValue::Double(*d),
            Value::Metric(m) => SnapshotValue::Metric(*m),
            Value::Ints(v) => SnapshotValue::Ints(v.to_vec()),
            Value::Doubles(v) => SnapshotValue::Doubles(v.to_vec()),
            Value::Strings(v) => SnapshotValue::Strings(v.to_vec()),
            Value::IntArrays(v) => SnapshotValue::IntArrays(v.to_vec()),
            Value::DoubleArrays(v) => SnapshotValue::DoubleArrays(v.to_vec()),
            Value::BoundingBox(b) => SnapshotValue::BoundingBox(*b),
            Value::Immersion(_) => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_checked_against_the_count() {
        let mut geometry = Geometry::new(GeometryKind::PointSet);
        geometry.set_count(Category::Vertex, 2);

        let err = geometry
            .set_attribute_list(Category::Vertex, Attribute::Labels, Some(Value::from(vec!["0".to_string()])))
            .unwrap_err();
        assert!(matches!(err, GeometryError::WrongLength { expected: 2, found: 1, .. }));
        assert!(geometry.labels(Category::Vertex).is_none());

        geometry
            .set_attribute_list(
                Category::Vertex,
                Attribute::Labels,
                Some(Value::from(vec!["0".to_string(), "1".to_string()])),
            )
            .unwrap();
        assert_eq!(geometry.labels(Category::Vertex).unwrap().len(), 2);
    }

    #[test]
    fn scalar_lists_are_rejected() {
        let mut geometry = Geometry::new(GeometryKind::PointSet);
        let err = geometry
            .set_attribute_list(Category::Vertex, Attribute::Labels, Some(Value::Count(0)))
            .unwrap_err();
        assert!(matches!(err, GeometryError::InvalidArgument(_)));
    }

    #[test]
    fn count_change_clears_category_only() {
        let mut geometry = Geometry::new(GeometryKind::IndexedFaceSet);
        geometry.set_count(Category::Vertex, 1);
        geometry.set_count(Category::Face, 1);
        geometry
            .set_attribute_list(Category::Vertex, Attribute::Coordinates, Some(Value::from(vec![vec![0.0; 3]])))
            .unwrap();
        geometry
            .set_attribute_list(Category::Face, Attribute::Indices, Some(Value::from(vec![vec![0usize]])))
            .unwrap();

        assert!(!geometry.set_count(Category::Vertex, 1));
        assert!(geometry.set_count(Category::Vertex, 2));
        assert!(geometry.vertex_coordinates().is_none());
        assert!(geometry.face_indices().is_some());
    }

    #[test]
    fn snapshot_round_trips_through_msgpack() {
        let mut geometry = Geometry::new(GeometryKind::PointSet);
        geometry.set_count(Category::Vertex, 1);
        geometry
            .set_attribute_list(Category::Vertex, Attribute::Coordinates, Some(Value::from(vec![vec![1.0, 2.0, 3.0]])))
            .unwrap();
        geometry.set_geometry_attribute(METRIC, Some(Value::Metric(Metric::Hyperbolic)));

        let bytes = geometry.to_msgpack().unwrap();
        let decoded: GeometrySnapshot = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, geometry.snapshot());
        assert_eq!(decoded.categories[0].count, 1);
        assert_eq!(decoded.attributes[METRIC], SnapshotValue::Metric(Metric::Hyperbolic));
    }
}
