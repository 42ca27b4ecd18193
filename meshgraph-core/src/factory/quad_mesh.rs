//! Quad Meshes
//!
//! A quad mesh is a face set over a regular `u x v` grid of vertices. The
//! grid owns the vertex and face counts and the face indices, so those cannot
//! be set directly. On top of the face set it generates texture coordinates
//! over the unit square and, optionally, edges along the parameter curves.
//!
//! # Closed directions
//!
//! A grid closed in u (or v) has its first and last column (or row) at the
//! same positions. The vertices stay duplicated; their normals are averaged
//! across the seam so shading is continuous.

use super::config::FactoryConfig;
use super::core::{AttributeSlot, FactoryCore, Layer, MeshFactory};
use super::face_set::{FaceSetBuilder, FaceSetNodes, SeamNodes};
use super::line_set::LineSetNodes;
use super::point_set::PointSetNodes;
use crate::data::geometry::QUAD_MESH_SHAPE;
use crate::data::{Attribute, Category, GeometryKind};
use crate::error::{GeometryError, Result};
use crate::graph::{NodeId, Value, ValueType};
use crate::utility::{edges_from_faces, quad_edge_curves, quad_face_indices, quad_texture_coordinates};

/// Grid size of a fresh quad mesh in each direction.
pub const DEFAULT_LINE_COUNT: usize = 10;

pub(crate) const FIXED_BY_GRID: &str = "determined by the quad mesh size";

/// Nodes of the quad mesh level.
#[derive(Debug, Clone)]
pub struct QuadMeshNodes {
    pub u_line_count: NodeId,
    pub v_line_count: NodeId,
    pub closed_in_u: NodeId,
    pub closed_in_v: NodeId,
    pub edge_from_quad_mesh: NodeId,
    /// `[scale_u, scale_v, shift_u, shift_v]`
    pub texture_transform: NodeId,
    pub texture_coordinates: AttributeSlot,
    pub shape: NodeId,
}

impl QuadMeshNodes {
    pub fn new(core: &mut FactoryCore, faces: &FaceSetNodes) -> Self {
        let count = Value::Count(DEFAULT_LINE_COUNT);
        let u_line_count = core.node_with("uLineCount", ValueType::Count, count.clone());
        let v_line_count = core.node_with("vLineCount", ValueType::Count, count);
        let closed_in_u = core.node_with("closedInU", ValueType::Bool, Value::Bool(false));
        let closed_in_v = core.node_with("closedInV", ValueType::Bool, Value::Bool(false));
        let edge_from_quad_mesh =
            core.node_with("edgeFromQuadMesh", ValueType::Bool, Value::Bool(false));
        let texture_transform = core.node_with(
            "textureTransform",
            ValueType::Doubles,
            Value::from(vec![1.0, 1.0, 0.0, 0.0]),
        );

        core.reset_count(Category::Vertex, DEFAULT_LINE_COUNT * DEFAULT_LINE_COUNT);
        core.reset_count(Category::Face, (DEFAULT_LINE_COUNT - 1) * (DEFAULT_LINE_COUNT - 1));

        // face indices come from the grid
        core.generate_from_start(&faces.face_indices);
        core.add_ingredient(faces.face_indices.node(), u_line_count);
        core.add_ingredient(faces.face_indices.node(), v_line_count);
        core.set_slot_method(&faces.face_indices, move |r, _| {
            let (u, v) = (r.count(u_line_count), r.count(v_line_count));
            Some(Value::from(quad_face_indices(u, v)))
        });

        // edges: parameter curves or face boundaries
        {
            let fi = faces.face_indices.node();
            let edges = &faces.edge_indices;
            for ingredient in [edge_from_quad_mesh, u_line_count, v_line_count] {
                core.add_ingredient(edges.node(), ingredient);
            }
            core.set_slot_method(edges, move |r, _| {
                if r.flag(edge_from_quad_mesh) {
                    let (u, v) = (r.count(u_line_count), r.count(v_line_count));
                    return Some(Value::from(quad_edge_curves(u, v)));
                }
                r.int_arrays(fi).map(|faces| Value::from(edges_from_faces(&faces)))
            });
        }

        faces.install_vertex_normals(
            core,
            Some(SeamNodes {
                u_line_count,
                v_line_count,
                closed_in_u,
                closed_in_v,
            }),
        );

        // texture coordinates
        let texture_coordinates = core.slot(
            Category::Vertex,
            Attribute::TextureCoordinates,
            ValueType::DoubleArrays,
        );
        for ingredient in [u_line_count, v_line_count, texture_transform] {
            core.add_ingredient(texture_coordinates.node(), ingredient);
        }
        core.set_slot_method(&texture_coordinates, move |r, _| {
            let (u, v) = (r.count(u_line_count), r.count(v_line_count));
            let t = r.doubles(texture_transform)?;
            let (scale, shift) = ([t[0], t[1]], [t[2], t[3]]);
            Some(Value::from(quad_texture_coordinates(u, v, scale, shift)))
        });
        core.generate_from_start(&texture_coordinates);

        let shape = core.node("quadMeshShape", ValueType::Ints);
        core.add_ingredient(shape, u_line_count);
        core.add_ingredient(shape, v_line_count);
        core.set_method(shape, move |r, _| {
            Some(Value::from(vec![r.count(u_line_count), r.count(v_line_count)]))
        });

        Self {
            u_line_count,
            v_line_count,
            closed_in_u,
            closed_in_v,
            edge_from_quad_mesh,
            texture_transform,
            texture_coordinates,
            shape,
        }
    }

    pub(crate) fn set_mesh_size(&self, core: &mut FactoryCore, u: usize, v: usize) -> Result<()> {
        if u < 2 || v < 2 {
            return Err(GeometryError::InvalidArgument(format!(
                "quad mesh needs at least 2 lines per direction, got {u} x {v}"
            )));
        }
        core.set_value(self.u_line_count, Some(Value::Count(u)))?;
        core.set_value(self.v_line_count, Some(Value::Count(v)))?;
        core.reset_count(Category::Vertex, u * v);
        core.reset_count(Category::Face, (u - 1) * (v - 1));
        Ok(())
    }

    fn texture_transform(&self, core: &FactoryCore) -> [f64; 4] {
        match core.peek(self.texture_transform).and_then(Value::as_doubles) {
            Some(t) if t.len() == 4 => [t[0], t[1], t[2], t[3]],
            _ => [1.0, 1.0, 0.0, 0.0],
        }
    }
}

impl Layer for QuadMeshNodes {
    fn recompute(&self, core: &mut FactoryCore) {
        core.resolve(self.shape);
        core.resolve(self.texture_coordinates.node());
    }

    fn materialize(&self, core: &mut FactoryCore) -> Result<()> {
        if core.fresh(self.shape) {
            let shape = core.peek(self.shape).cloned();
            core.write_geometry_attribute(QUAD_MESH_SHAPE, shape);
        }
        core.materialize_slot(&self.texture_coordinates)
    }
}

fn peek_count(core: &FactoryCore, id: NodeId) -> usize {
    core.peek(id).and_then(Value::as_count).unwrap_or(0)
}

fn peek_flag(core: &FactoryCore, id: NodeId) -> bool {
    core.peek(id).and_then(Value::as_bool).unwrap_or(false)
}

/// Client API of every factory built on a quad grid.
pub trait QuadMeshBuilder: FaceSetBuilder {
    fn quad(&self) -> &QuadMeshNodes;

    fn u_line_count(&self) -> usize {
        peek_count(self.core(), self.quad().u_line_count)
    }

    fn v_line_count(&self) -> usize {
        peek_count(self.core(), self.quad().v_line_count)
    }

    /// Resize the grid to `u x v` vertices. Both must be at least 2. A new
    /// size drops explicit vertex and face attributes.
    fn set_mesh_size(&mut self, u: usize, v: usize) -> Result<()> {
        let quad = self.quad().clone();
        quad.set_mesh_size(self.core_mut(), u, v)
    }

    fn set_u_line_count(&mut self, u: usize) -> Result<()> {
        let v = self.v_line_count();
        self.set_mesh_size(u, v)
    }

    fn set_v_line_count(&mut self, v: usize) -> Result<()> {
        let u = self.u_line_count();
        self.set_mesh_size(u, v)
    }

    fn is_closed_in_u(&self) -> bool {
        peek_flag(self.core(), self.quad().closed_in_u)
    }

    fn set_closed_in_u(&mut self, closed: bool) -> Result<()> {
        let node = self.quad().closed_in_u;
        self.core_mut().set_value(node, Some(Value::Bool(closed)))
    }

    fn is_closed_in_v(&self) -> bool {
        peek_flag(self.core(), self.quad().closed_in_v)
    }

    fn set_closed_in_v(&mut self, closed: bool) -> Result<()> {
        let node = self.quad().closed_in_v;
        self.core_mut().set_value(node, Some(Value::Bool(closed)))
    }

    fn is_edge_from_quad_mesh(&self) -> bool {
        peek_flag(self.core(), self.quad().edge_from_quad_mesh)
    }

    /// Generated edges follow the parameter curves instead of the face
    /// boundaries. Only takes effect while edges are generated from faces.
    fn set_edge_from_quad_mesh(&mut self, on: bool) -> Result<()> {
        let node = self.quad().edge_from_quad_mesh;
        self.core_mut().set_value(node, Some(Value::Bool(on)))
    }

    fn texture_scale(&self) -> [f64; 2] {
        let t = self.quad().texture_transform(self.core());
        [t[0], t[1]]
    }

    fn set_texture_scale(&mut self, scale_u: f64, scale_v: f64) -> Result<()> {
        let quad = self.quad().clone();
        let t = quad.texture_transform(self.core());
        let value = Value::from(vec![scale_u, scale_v, t[2], t[3]]);
        self.core_mut().set_value(quad.texture_transform, Some(value))
    }

    fn texture_shift(&self) -> [f64; 2] {
        let t = self.quad().texture_transform(self.core());
        [t[2], t[3]]
    }

    fn set_texture_shift(&mut self, shift_u: f64, shift_v: f64) -> Result<()> {
        let quad = self.quad().clone();
        let t = quad.texture_transform(self.core());
        let value = Value::from(vec![t[0], t[1], shift_u, shift_v]);
        self.core_mut().set_value(quad.texture_transform, Some(value))
    }

    fn is_generate_texture_coordinates(&self) -> bool {
        self.core().is_generated(&self.quad().texture_coordinates)
    }

    fn set_generate_texture_coordinates(&mut self, generate: bool) -> Result<()> {
        let slot = self.quad().texture_coordinates.clone();
        self.core_mut().set_generate(&slot, generate)
    }
}

/// Implements the point, line and face builder traits for a factory over a
/// quad grid, refusing the operations the grid owns.
macro_rules! quad_grid_builders {
    ($factory:ty) => {
        impl $crate::factory::point_set::PointSetBuilder for $factory {
            fn points(&self) -> &$crate::factory::point_set::PointSetNodes {
                &self.points
            }

            fn set_vertex_count(&mut self, _count: usize) -> $crate::error::Result<()> {
                Err($crate::error::GeometryError::Unsupported(
                    $crate::factory::quad_mesh::FIXED_BY_GRID,
                ))
            }
        }

        impl $crate::factory::line_set::LineSetBuilder for $factory {
            fn lines(&self) -> &$crate::factory::line_set::LineSetNodes {
                &self.lines
            }
        }

        impl $crate::factory::face_set::FaceSetBuilder for $factory {
            fn faces(&self) -> &$crate::factory::face_set::FaceSetNodes {
                &self.faces
            }

            fn set_face_count(&mut self, _count: usize) -> $crate::error::Result<()> {
                Err($crate::error::GeometryError::Unsupported(
                    $crate::factory::quad_mesh::FIXED_BY_GRID,
                ))
            }

            fn set_face_indices<I: Into<$crate::factory::input::IndexData>>(
                &mut self,
                _data: I,
            ) -> $crate::error::Result<()> {
                Err($crate::error::GeometryError::Unsupported(
                    $crate::factory::quad_mesh::FIXED_BY_GRID,
                ))
            }

            fn set_face_indices_flat(
                &mut self,
                _indices: Vec<usize>,
                _points_per_face: Option<usize>,
            ) -> $crate::error::Result<()> {
                Err($crate::error::GeometryError::Unsupported(
                    $crate::factory::quad_mesh::FIXED_BY_GRID,
                ))
            }

            fn clear_face_indices(&mut self) -> $crate::error::Result<()> {
                Err($crate::error::GeometryError::Unsupported(
                    $crate::factory::quad_mesh::FIXED_BY_GRID,
                ))
            }
        }

        impl $crate::factory::quad_mesh::QuadMeshBuilder for $factory {
            fn quad(&self) -> &$crate::factory::quad_mesh::QuadMeshNodes {
                &self.quad
            }
        }
    };
}

pub(crate) use quad_grid_builders;

/// Builds a quad mesh. Starts out as a 10 x 10 grid.
#[derive(Debug)]
pub struct QuadMeshFactory {
    core: FactoryCore,
    points: PointSetNodes,
    lines: LineSetNodes,
    faces: FaceSetNodes,
    quad: QuadMeshNodes,
}

impl QuadMeshFactory {
    pub fn new() -> Self {
        let mut core = FactoryCore::new(GeometryKind::IndexedFaceSet);
        let points = PointSetNodes::new(&mut core);
        let lines = LineSetNodes::new(&mut core);
        let faces = FaceSetNodes::new(&mut core, &lines);
        let quad = QuadMeshNodes::new(&mut core, &faces);
        Self {
            core,
            points,
            lines,
            faces,
            quad,
        }
    }

    pub fn with_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new();
        config.apply_quad_mesh(&mut factory)?;
        Ok(factory)
    }
}

impl Default for QuadMeshFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshFactory for QuadMeshFactory {
    fn core(&self) -> &FactoryCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactoryCore {
        &mut self.core
    }

    fn update(&mut self) -> Result<()> {
        self.core
            .run_update(&[&self.points, &self.lines, &self.faces, &self.quad])
    }
}

quad_grid_builders!(QuadMeshFactory);
