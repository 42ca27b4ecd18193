//! Indexed Face Sets
//!
//! The face set level adds faces to a line set and most of the derived
//! attributes: face labels, face and vertex normals, edges extracted from the
//! faces, a bounding box, and the unwrap table relating duplicated vertices to
//! the vertices they stand for.
//!
//! # Unwrapped meshes
//!
//! A mesh with texture seams needs several vertices at one position, one per
//! set of texture coordinates. Clients describe such a mesh twice: `face
//! indices` over the actual vertices, and `unwrap face indices` of the same
//! shape over the duplicated ones. Normals are computed on the actual mesh and
//! copied onto every duplicate; the geometry receives the unwrap indices.

use std::sync::Arc;

use tracing::warn;

use super::config::FactoryConfig;
use super::core::{AttributeSlot, FactoryCore, FactoryResolver, Layer, MeshFactory};
use super::input::{AttributeMap, DoubleData, IndexData};
use super::line_set::{LineSetBuilder, LineSetNodes};
use super::point_set::{labels_for, PointSetBuilder, PointSetNodes};
use crate::data::geometry::BOUNDING_BOX;
use crate::data::{Attribute, Category, GeometryKind};
use crate::error::{GeometryError, Result};
use crate::graph::{reuse_rows, Metric, NodeId, Value, ValueType};
use crate::utility::{
    actual_vertex_of_unwrap_vertex, bounding_box, edges_from_faces, face_normals,
    face_normals_into, propagate_unwrap_normals, smooth_seams, vertex_normals_into,
};

/// Nodes describing the grid of a quad mesh, read by the normal smoothing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SeamNodes {
    pub u_line_count: NodeId,
    pub v_line_count: NodeId,
    pub closed_in_u: NodeId,
    pub closed_in_v: NodeId,
}

fn warn_non_euclidean(metric: Metric, what: &str) {
    if metric != Metric::Euclidean {
        warn!(?metric, "{what}: only euclidean normals are computed");
    }
}

/// Nodes of the face set level.
#[derive(Debug, Clone)]
pub struct FaceSetNodes {
    pub face_count: NodeId,
    pub vertex_coordinates: AttributeSlot,
    pub vertex_normals: AttributeSlot,
    pub edge_indices: AttributeSlot,
    pub face_indices: AttributeSlot,
    pub face_labels: AttributeSlot,
    pub face_normals: AttributeSlot,
    pub bounding_box: NodeId,
    pub generate_bounding_box: NodeId,
    pub unwrap_face_indices: NodeId,
    pub actual_vertex_of_unwrap_vertex: NodeId,
}

impl FaceSetNodes {
    pub fn new(core: &mut FactoryCore, lines: &LineSetNodes) -> Self {
        let vertex_count = core.count_node(Category::Vertex);
        let face_count = core.count_node(Category::Face);
        let metric = core.metric_node();

        let vertex_coordinates =
            core.slot(Category::Vertex, Attribute::Coordinates, ValueType::DoubleArrays);
        let face_indices = core.slot(Category::Face, Attribute::Indices, ValueType::IntArrays);
        let unwrap_face_indices = core.node("unwrapFaceIndices", ValueType::IntArrays);

        // actual vertex of unwrap vertex
        let table = core.node("actualVertexOfUnwrapVertex", ValueType::Ints);
        {
            let (fi, ufi) = (face_indices.node(), unwrap_face_indices);
            core.add_ingredient(table, ufi);
            core.add_ingredient(table, fi);
            core.add_ingredient(table, vertex_count);
            core.set_method(table, move |r, _| {
                let unwrap = r.int_arrays(ufi)?;
                let faces = r.int_arrays(fi)?;
                let n = r.count(vertex_count);
                Some(Value::from(actual_vertex_of_unwrap_vertex(&faces, &unwrap, n)))
            });
        }

        // face labels
        let face_labels = core.slot(Category::Face, Attribute::Labels, ValueType::Strings);
        core.add_ingredient(face_labels.node(), face_count);
        core.set_slot_method(&face_labels, move |r, _| labels_for(r.count(face_count)));

        // edge indices
        let edge_indices = core.slot(Category::Edge, Attribute::Indices, ValueType::IntArrays);
        {
            let fi = face_indices.node();
            core.add_ingredient(edge_indices.node(), fi);
            core.set_slot_method(&edge_indices, move |r, _| {
                r.int_arrays(fi).map(|faces| Value::from(edges_from_faces(&faces)))
            });
        }

        // edge count: the generated edges while generating, else explicit
        {
            let ei = edge_indices.node();
            core.set_method(lines.edge_count, move |r, _| {
                let edges = r.context().category(Category::Edge);
                if edges.is_generated(&Attribute::Indices) {
                    Some(Value::Count(r.get(ei).and_then(|v| v.len()).unwrap_or(0)))
                } else {
                    Some(Value::Count(edges.count()))
                }
            });
        }

        // face normals
        let face_normals_slot = core.slot(Category::Face, Attribute::Normals, ValueType::DoubleArrays);
        {
            let (fi, vc) = (face_indices.node(), vertex_coordinates.node());
            let node = face_normals_slot.node();
            core.add_ingredient(node, metric);
            core.add_ingredient(node, fi);
            core.add_ingredient(node, vc);
            core.add_ingredient(node, table);
            core.set_slot_method(&face_normals_slot, move |r, hint| {
                let faces = r.int_arrays(fi)?;
                let coordinates = r.double_arrays(vc)?;
                warn_non_euclidean(r.metric(metric), "face normals");
                let mut normals = reuse_rows(hint, faces.len(), 3);
                face_normals_into(&coordinates, &faces, &mut normals);
                Some(Value::from(normals))
            });
        }

        let vertex_normals = core.slot(Category::Vertex, Attribute::Normals, ValueType::DoubleArrays);

        // bounding box
        let generate_bounding_box =
            core.node_with("generateBoundingBox", ValueType::Bool, Value::Bool(false));
        let bbox = core.node("boundingBox", ValueType::BoundingBox);
        {
            let (fi, vc) = (face_indices.node(), vertex_coordinates.node());
            core.add_ingredient(bbox, vc);
            core.add_ingredient(bbox, fi);
            core.add_ingredient(bbox, generate_bounding_box);
            core.set_method(bbox, move |r, _| {
                if !r.flag(generate_bounding_box) {
                    return None;
                }
                let coordinates = r.double_arrays(vc)?;
                let faces = r.int_arrays(fi);
                bounding_box(&coordinates, faces.as_ref().map(|f| f.as_slice())).map(Value::BoundingBox)
            });
        }

        let nodes = Self {
            face_count,
            vertex_coordinates,
            vertex_normals,
            edge_indices,
            face_indices,
            face_labels,
            face_normals: face_normals_slot,
            bounding_box: bbox,
            generate_bounding_box,
            unwrap_face_indices,
            actual_vertex_of_unwrap_vertex: table,
        };
        nodes.install_vertex_normals(core, None);
        nodes
    }

    /// Wire the vertex normal slot. With `seam`, normals are also averaged
    /// across the seams of a closed quad grid.
    pub(crate) fn install_vertex_normals(&self, core: &mut FactoryCore, seam: Option<SeamNodes>) {
        let metric = core.metric_node();
        let fi = self.face_indices.node();
        let vc = self.vertex_coordinates.node();
        let fnormals = self.face_normals.node();
        let table = self.actual_vertex_of_unwrap_vertex;
        let node = self.vertex_normals.node();

        for ingredient in [metric, fnormals, fi, vc, table] {
            core.add_ingredient(node, ingredient);
        }
        if let Some(seam) = seam {
            for ingredient in [seam.u_line_count, seam.v_line_count, seam.closed_in_u, seam.closed_in_v] {
                core.add_ingredient(node, ingredient);
            }
        }

        core.set_slot_method(&self.vertex_normals, move |r: &mut FactoryResolver<'_>, hint| {
            let faces = r.int_arrays(fi)?;
            let coordinates = r.double_arrays(vc)?;
            let metric = r.metric(metric);
            warn_non_euclidean(metric, "vertex normals");

            let per_face = match r.double_arrays(fnormals) {
                Some(normals) if normals.len() == faces.len() => normals,
                _ => Arc::new(face_normals(&coordinates, &faces)),
            };
            let mut normals = reuse_rows(hint, coordinates.len(), 3);
            vertex_normals_into(coordinates.len(), &faces, &per_face, &mut normals);

            if let Some(seam) = seam {
                let (closed_u, closed_v) = (r.flag(seam.closed_in_u), r.flag(seam.closed_in_v));
                if closed_u || closed_v {
                    let (u, v) = (r.count(seam.u_line_count), r.count(seam.v_line_count));
                    smooth_seams(&mut normals, u, v, closed_u, closed_v);
                }
            }
            if let Some(table) = r.ints(table) {
                propagate_unwrap_normals(&mut normals, &table);
            }
            Some(Value::from(normals))
        });
    }
}

impl Layer for FaceSetNodes {
    fn recompute(&self, core: &mut FactoryCore) {
        core.resolve(self.face_count);
        core.resolve(self.face_indices.node());
        core.resolve(self.unwrap_face_indices);
        core.resolve(self.bounding_box);
        core.resolve(self.actual_vertex_of_unwrap_vertex);
        core.resolve(self.vertex_coordinates.node());
        core.resolve(self.face_labels.node());
        core.resolve(self.edge_indices.node());
        core.resolve(self.face_normals.node());
        core.resolve(self.vertex_normals.node());
    }

    fn materialize(&self, core: &mut FactoryCore) -> Result<()> {
        core.sync_count(Category::Face);
        core.write_category(Category::Face)?;

        if core.fresh(self.bounding_box) {
            let bbox = core.peek(self.bounding_box).cloned();
            core.write_geometry_attribute(BOUNDING_BOX, bbox);
        }

        // the geometry shows the unwrap indices when there are any
        let unwrap_fresh = core.fresh(self.unwrap_face_indices);
        let faces_fresh = core.fresh(self.face_indices.node());
        if unwrap_fresh || faces_fresh {
            let indices = core
                .peek(self.unwrap_face_indices)
                .or_else(|| core.peek(self.face_indices.node()))
                .cloned();
            if let Err(err) = core.write_list(Category::Face, Attribute::Indices, indices) {
                core.forget(self.face_indices.node());
                return Err(err);
            }
        }

        core.materialize_slot(&self.vertex_coordinates)?;
        core.materialize_slot(&self.edge_indices)?;
        core.materialize_slot(&self.face_labels)?;
        core.materialize_slot(&self.face_normals)?;
        core.materialize_slot(&self.vertex_normals)
    }
}

/// Client API of every factory that has faces.
pub trait FaceSetBuilder: LineSetBuilder {
    fn faces(&self) -> &FaceSetNodes;

    fn face_count(&mut self) -> usize {
        self.core_mut().resolved_count(Category::Face)
    }

    /// Set the number of faces. A different count drops all explicit face
    /// attributes.
    fn set_face_count(&mut self, count: usize) -> Result<()> {
        self.core_mut().set_count(Category::Face, count)
    }

    fn set_face_attribute(&mut self, attribute: Attribute, value: Option<Value>) -> Result<()> {
        self.core_mut().set_attribute(Category::Face, attribute, value)
    }

    fn set_face_attributes(&mut self, attributes: AttributeMap) -> Result<()> {
        self.core_mut().set_attributes(Category::Face, attributes)
    }

    /// One index row per face.
    fn set_face_indices<I: Into<IndexData>>(&mut self, data: I) -> Result<()> {
        let rows = data.into().into_rows()?;
        self.set_face_attribute(Attribute::Indices, Some(Value::from(rows)))
    }

    /// Faces of `points_per_face` vertices packed back to back (triangles if `None`).
    fn set_face_indices_flat(&mut self, indices: Vec<usize>, points_per_face: Option<usize>) -> Result<()> {
        self.set_face_indices(IndexData::flat(indices, points_per_face.unwrap_or(3)))
    }

    fn clear_face_indices(&mut self) -> Result<()> {
        self.set_face_attribute(Attribute::Indices, None)
    }

    /// Face indices over the duplicated vertices of an unwrapped mesh. Must
    /// have one row per face, parallel to the face indices.
    fn set_unwrap_face_indices<I: Into<IndexData>>(&mut self, data: I) -> Result<()> {
        let rows = data.into().into_rows()?;
        let expected = self.face_count();
        if rows.len() != expected {
            return Err(GeometryError::WrongLength {
                category: Category::Face,
                attribute: Attribute::named("unwrapIndices"),
                expected,
                found: rows.len(),
            });
        }
        let node = self.faces().unwrap_face_indices;
        self.core_mut().set_value(node, Some(Value::from(rows)))
    }

    fn clear_unwrap_face_indices(&mut self) -> Result<()> {
        let node = self.faces().unwrap_face_indices;
        self.core_mut().set_value(node, None)
    }

    /// For each vertex, the vertex it duplicates (itself if none); `None`
    /// without unwrap face indices.
    fn actual_vertex_of_unwrap_vertex(&mut self) -> Option<Arc<Vec<usize>>> {
        let node = self.faces().actual_vertex_of_unwrap_vertex;
        self.core_mut().resolve(node).and_then(|v| v.as_ints().cloned())
    }

    fn set_face_normals<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Face, Attribute::Normals, Some(data.into()))
    }

    fn clear_face_normals(&mut self) -> Result<()> {
        self.set_face_attribute(Attribute::Normals, None)
    }

    fn set_face_colors<D: Into<DoubleData>>(&mut self, data: D) -> Result<()> {
        self.core_mut()
            .set_double_data(Category::Face, Attribute::Colors, Some(data.into()))
    }

    fn clear_face_colors(&mut self) -> Result<()> {
        self.set_face_attribute(Attribute::Colors, None)
    }

    fn set_face_labels(&mut self, labels: Vec<String>) -> Result<()> {
        self.set_face_attribute(Attribute::Labels, Some(Value::from(labels)))
    }

    fn clear_face_labels(&mut self) -> Result<()> {
        self.set_face_attribute(Attribute::Labels, None)
    }

    fn is_generate_face_labels(&self) -> bool {
        self.core().is_generated(&self.faces().face_labels)
    }

    fn set_generate_face_labels(&mut self, generate: bool) -> Result<()> {
        let slot = self.faces().face_labels.clone();
        self.core_mut().set_generate(&slot, generate)
    }

    fn is_generate_face_normals(&self) -> bool {
        self.core().is_generated(&self.faces().face_normals)
    }

    fn set_generate_face_normals(&mut self, generate: bool) -> Result<()> {
        let slot = self.faces().face_normals.clone();
        self.core_mut().set_generate(&slot, generate)
    }

    fn is_generate_vertex_normals(&self) -> bool {
        self.core().is_generated(&self.faces().vertex_normals)
    }

    fn set_generate_vertex_normals(&mut self, generate: bool) -> Result<()> {
        let slot = self.faces().vertex_normals.clone();
        self.core_mut().set_generate(&slot, generate)
    }

    fn is_generate_edges_from_faces(&self) -> bool {
        self.core().is_generated(&self.faces().edge_indices)
    }

    /// Derive the edges from the faces.
    ///
    /// Enabling fails with `EdgeAttributesPresent` while explicit edge data is
    /// stored. While enabled the edge count follows the generated edges and
    /// cannot be set; disabling drops explicit edge attributes and falls back
    /// to the explicit edge count.
    fn set_generate_edges_from_faces(&mut self, generate: bool) -> Result<()> {
        let slot = self.faces().edge_indices.clone();
        let core = self.core_mut();
        if core.is_generated(&slot) == generate {
            return Ok(());
        }
        if generate && !core.store().edge.is_empty() {
            return Err(GeometryError::EdgeAttributesPresent);
        }
        let edge_count = core.count_node(Category::Edge);
        core.set_generate(&slot, generate)?;
        if generate {
            core.add_ingredient(edge_count, slot.node());
        } else {
            core.remove_ingredient(edge_count, slot.node());
            core.clear_attributes(Category::Edge);
            core.outdate(edge_count);
        }
        core.set_count_blocked(Category::Edge, generate);
        Ok(())
    }

    fn is_generate_bounding_box(&self) -> bool {
        let node = self.faces().generate_bounding_box;
        self.core()
            .peek(node)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Compute the bounding box of the faces and publish it as the
    /// `boundingBox` geometry attribute.
    fn set_generate_bounding_box(&mut self, generate: bool) -> Result<()> {
        let node = self.faces().generate_bounding_box;
        self.core_mut().set_value(node, Some(Value::Bool(generate)))
    }
}

/// Builds an indexed face set.
#[derive(Debug)]
pub struct IndexedFaceSetFactory {
    core: FactoryCore,
    points: PointSetNodes,
    lines: LineSetNodes,
    faces: FaceSetNodes,
}

impl IndexedFaceSetFactory {
    pub fn new() -> Self {
        let mut core = FactoryCore::new(GeometryKind::IndexedFaceSet);
        let points = PointSetNodes::new(&mut core);
        let lines = LineSetNodes::new(&mut core);
        let faces = FaceSetNodes::new(&mut core, &lines);
        Self {
            core,
            points,
            lines,
            faces,
        }
    }

    pub fn with_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new();
        config.apply_face_set(&mut factory)?;
        Ok(factory)
    }
}

impl Default for IndexedFaceSetFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshFactory for IndexedFaceSetFactory {
    fn core(&self) -> &FactoryCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactoryCore {
        &mut self.core
    }

    fn update(&mut self) -> Result<()> {
        self.core
            .run_update(&[&self.points, &self.lines, &self.faces])
    }
}

impl PointSetBuilder for IndexedFaceSetFactory {
    fn points(&self) -> &PointSetNodes {
        &self.points
    }
}

impl LineSetBuilder for IndexedFaceSetFactory {
    fn lines(&self) -> &LineSetNodes {
        &self.lines
    }
}

impl FaceSetBuilder for IndexedFaceSetFactory {
    fn faces(&self) -> &FaceSetNodes {
        &self.faces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square() -> IndexedFaceSetFactory {
        let mut factory = IndexedFaceSetFactory::new();
        factory.set_vertex_count(4).unwrap();
        factory
            .set_vertex_coordinates(vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ])
            .unwrap();
        factory.set_face_count(2).unwrap();
        factory
            .set_face_indices_flat(vec![0, 1, 2, 2, 3, 0], None)
            .unwrap();
        factory
    }

    #[test]
    fn normals_of_a_flat_square_point_up() {
        let mut factory = square();
        factory.set_generate_face_normals(true).unwrap();
        factory.set_generate_vertex_normals(true).unwrap();
        factory.update().unwrap();

        let geometry = factory.geometry();
        for normal in geometry.face_normals().unwrap().iter() {
            assert_abs_diff_eq!(normal[2], 1.0, epsilon = 1e-12);
        }
        for normal in geometry.vertex_normals().unwrap().iter() {
            assert_abs_diff_eq!(normal[2], 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn vertex_normals_do_not_need_generated_face_normals() {
        let mut factory = square();
        factory.set_generate_vertex_normals(true).unwrap();
        factory.update().unwrap();
        assert!(factory.geometry().face_normals().is_none());
        assert_eq!(factory.geometry().vertex_normals().unwrap().len(), 4);
    }

    #[test]
    fn missing_coordinates_leave_normals_absent() {
        let mut factory = IndexedFaceSetFactory::new();
        factory.set_vertex_count(3).unwrap();
        factory.set_face_count(1).unwrap();
        factory.set_face_indices(vec![vec![0, 1, 2]]).unwrap();
        factory.set_generate_face_normals(true).unwrap();
        factory.update().unwrap();
        assert!(factory.geometry().face_normals().is_none());
        assert!(factory.geometry().face_indices().is_some());
    }

    #[test]
    fn bounding_box_is_published_only_while_enabled() {
        let mut factory = square();
        factory.update().unwrap();
        assert!(factory.geometry().bounding_box().is_none());

        factory.set_generate_bounding_box(true).unwrap();
        factory.update().unwrap();
        let bbox = factory.geometry().bounding_box().unwrap();
        assert_eq!(bbox.min, [0.0, 0.0, 0.0]);
        assert_eq!(bbox.max, [1.0, 1.0, 0.0]);

        factory.set_generate_bounding_box(false).unwrap();
        factory.update().unwrap();
        assert!(factory.geometry().bounding_box().is_none());
    }

    #[test]
    fn generated_edges_block_the_edge_count() {
        let mut factory = square();
        factory.set_generate_edges_from_faces(true).unwrap();
        assert_eq!(factory.edge_count(), 5);

        let err = factory.set_edge_count(3).unwrap_err();
        assert!(matches!(err, GeometryError::Unsupported(_)));
        let err = factory.set_edge_indices(vec![vec![0, 1]]).unwrap_err();
        assert!(matches!(err, GeometryError::AttributeGenerated { .. }));
    }

    #[test]
    fn explicit_edge_data_prevents_edge_generation() {
        let mut factory = square();
        factory.set_edge_count(1).unwrap();
        factory.set_edge_indices(vec![vec![0, 2]]).unwrap();

        let err = factory.set_generate_edges_from_faces(true).unwrap_err();
        assert!(matches!(err, GeometryError::EdgeAttributesPresent));
        assert!(!factory.is_generate_edges_from_faces());
    }

    #[test]
    fn unwrap_indices_must_match_face_count() {
        let mut factory = square();
        let err = factory
            .set_unwrap_face_indices(vec![vec![0, 1, 2]])
            .unwrap_err();
        assert!(matches!(err, GeometryError::WrongLength { expected: 2, found: 1, .. }));
    }

    #[test]
    fn second_update_rewrites_nothing() {
        let mut factory = square();
        factory.set_generate_face_normals(true).unwrap();
        factory.update().unwrap();
        let before = factory.geometry().face_normals().cloned().unwrap();
        let stamp = factory
            .core()
            .graph()
            .node(factory.faces().face_normals.node())
            .last_updated();

        factory.update().unwrap();
        let after = factory.geometry().face_normals().unwrap();
        assert!(Arc::ptr_eq(&before, after));
        assert_eq!(
            factory
                .core()
                .graph()
                .node(factory.faces().face_normals.node())
                .last_updated(),
            stamp
        );
    }
}
