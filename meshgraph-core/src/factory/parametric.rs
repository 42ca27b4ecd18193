//! Parametric Surfaces
//!
//! A parametric surface is a quad mesh whose vertex coordinates come from an
//! [`Immersion`] evaluated over a rectangular parameter domain. Grid line `j`
//! of `u` lines sits at `u_min + j * (u_max - u_min) / (u - 1)`, likewise in v.
//!
//! An immersion that reports itself mutable may change between updates (it
//! may depend on time or on parameters the graph cannot see), so its
//! coordinates are recomputed at every `update()`. An immutable immersion is
//! evaluated again only when the grid, the domain or the immersion change.

use std::fmt;
use std::sync::Arc;

use super::config::FactoryConfig;
use super::core::{AttributeSlot, FactoryCore, Layer, MeshFactory};
use super::face_set::FaceSetNodes;
use super::line_set::LineSetNodes;
use super::point_set::PointSetNodes;
use super::quad_mesh::{quad_grid_builders, QuadMeshNodes};
use crate::data::GeometryKind;
use crate::error::{GeometryError, Result};
use crate::graph::{reuse_rows, NodeId, Value, ValueType};

/// A map from the parameter plane into space.
pub trait Immersion: Send + Sync + fmt::Debug {
    /// Number of values written per point (3, or 4 for homogeneous coordinates).
    fn dimension(&self) -> usize;

    /// Whether evaluation always gives the same result for the same
    /// parameters.
    fn is_immutable(&self) -> bool {
        true
    }

    /// Write the point at `(u, v)` into `out`, which has `dimension()` entries.
    fn evaluate(&self, u: f64, v: f64, out: &mut [f64]);
}

/// An immersion backed by a closure.
pub struct FnImmersion<F> {
    dimension: usize,
    immutable: bool,
    f: F,
}

impl<F> FnImmersion<F>
where
    F: Fn(f64, f64, &mut [f64]) + Send + Sync,
{
    pub fn new(dimension: usize, f: F) -> Self {
        Self {
            dimension,
            immutable: true,
            f,
        }
    }

    /// Mark the immersion as changing between updates.
    pub fn mutable(mut self) -> Self {
        self.immutable = false;
        self
    }
}

impl<F> fmt::Debug for FnImmersion<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnImmersion")
            .field("dimension", &self.dimension)
            .field("immutable", &self.immutable)
            .finish_non_exhaustive()
    }
}

impl<F> Immersion for FnImmersion<F>
where
    F: Fn(f64, f64, &mut [f64]) + Send + Sync,
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn evaluate(&self, u: f64, v: f64, out: &mut [f64]) {
        (self.f)(u, v, out)
    }
}

fn grid_step(min: f64, max: f64, lines: usize) -> f64 {
    if lines > 1 {
        (max - min) / (lines - 1) as f64
    } else {
        0.0
    }
}

/// Nodes of the parametric surface level.
#[derive(Debug, Clone)]
pub struct SurfaceNodes {
    pub immersion: NodeId,
    /// `[u_min, u_max, v_min, v_max]`
    pub domain: NodeId,
    pub vertex_coordinates: AttributeSlot,
}

impl SurfaceNodes {
    pub fn new(core: &mut FactoryCore, faces: &FaceSetNodes, quad: &QuadMeshNodes) -> Self {
        let immersion = core.node("immersion", ValueType::Immersion);
        let domain = core.node_with(
            "domain",
            ValueType::Doubles,
            Value::from(vec![0.0, 1.0, 0.0, 1.0]),
        );

        let coordinates = faces.vertex_coordinates.clone();
        let (u_lines, v_lines) = (quad.u_line_count, quad.v_line_count);
        for ingredient in [immersion, domain, u_lines, v_lines] {
            core.add_ingredient(coordinates.node(), ingredient);
        }
        core.set_slot_method(&coordinates, move |r, hint| {
            let immersion = r.immersion(immersion)?;
            let d = r.doubles(domain)?;
            let (u, v) = (r.count(u_lines), r.count(v_lines));
            let dim = immersion.dimension();
            let (du, dv) = (grid_step(d[0], d[1], u), grid_step(d[2], d[3], v));

            let mut points = reuse_rows(hint, u * v, dim);
            for i in 0..v {
                for j in 0..u {
                    let row = &mut points[i * u + j];
                    immersion.evaluate(d[0] + j as f64 * du, d[2] + i as f64 * dv, row);
                }
            }
            Some(Value::from(points))
        });
        core.generate_from_start(&coordinates);

        Self {
            immersion,
            domain,
            vertex_coordinates: coordinates,
        }
    }

    /// Outdate the coordinates if the immersion may have changed.
    fn refresh_mutable(&self, core: &mut FactoryCore) {
        let mutable = core
            .peek(self.immersion)
            .and_then(Value::as_immersion)
            .is_some_and(|immersion| !immersion.is_immutable());
        if mutable {
            core.outdate(self.vertex_coordinates.node());
        }
    }
}

impl Layer for SurfaceNodes {
    fn recompute(&self, core: &mut FactoryCore) {
        core.resolve(self.vertex_coordinates.node());
    }

    // coordinates are written by the face set level
    fn materialize(&self, _core: &mut FactoryCore) -> Result<()> {
        Ok(())
    }
}

/// Builds a quad mesh by sampling an immersion. Starts out as a 10 x 10 grid
/// over the unit square, without an immersion.
#[derive(Debug)]
pub struct ParametricSurfaceFactory {
    core: FactoryCore,
    points: PointSetNodes,
    lines: LineSetNodes,
    faces: FaceSetNodes,
    quad: QuadMeshNodes,
    surface: SurfaceNodes,
}

impl ParametricSurfaceFactory {
    pub fn new() -> Self {
        let mut core = FactoryCore::new(GeometryKind::IndexedFaceSet);
        let points = PointSetNodes::new(&mut core);
        let lines = LineSetNodes::new(&mut core);
        let faces = FaceSetNodes::new(&mut core, &lines);
        let quad = QuadMeshNodes::new(&mut core, &faces);
        let surface = SurfaceNodes::new(&mut core, &faces, &quad);
        Self {
            core,
            points,
            lines,
            faces,
            quad,
            surface,
        }
    }

    pub fn with_config(config: &FactoryConfig) -> Result<Self> {
        let mut factory = Self::new();
        config.apply_quad_mesh(&mut factory)?;
        Ok(factory)
    }

    pub fn immersion(&self) -> Option<Arc<dyn Immersion>> {
        self.core
            .peek(self.surface.immersion)
            .and_then(Value::as_immersion)
            .cloned()
    }

    pub fn set_immersion<I: Immersion + 'static>(&mut self, immersion: I) -> Result<()> {
        self.set_shared_immersion(Some(Arc::new(immersion)))
    }

    /// Set (or clear) an immersion that may be shared with other factories.
    pub fn set_shared_immersion(&mut self, immersion: Option<Arc<dyn Immersion>>) -> Result<()> {
        self.core
            .set_value(self.surface.immersion, immersion.map(Value::Immersion))
    }

    /// `[u_min, u_max, v_min, v_max]`
    pub fn domain(&self) -> [f64; 4] {
        match self.core.peek(self.surface.domain).and_then(Value::as_doubles) {
            Some(d) if d.len() == 4 => [d[0], d[1], d[2], d[3]],
            _ => [0.0, 1.0, 0.0, 1.0],
        }
    }

    pub fn set_domain(&mut self, u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Result<()> {
        if [u_min, u_max, v_min, v_max].iter().any(|x| !x.is_finite()) {
            return Err(GeometryError::InvalidArgument(format!(
                "domain bounds must be finite, got [{u_min}, {u_max}] x [{v_min}, {v_max}]"
            )));
        }
        let value = Value::from(vec![u_min, u_max, v_min, v_max]);
        self.core.set_value(self.surface.domain, Some(value))
    }

    pub fn set_u_range(&mut self, min: f64, max: f64) -> Result<()> {
        let [_, _, v_min, v_max] = self.domain();
        self.set_domain(min, max, v_min, v_max)
    }

    pub fn set_v_range(&mut self, min: f64, max: f64) -> Result<()> {
        let [u_min, u_max, _, _] = self.domain();
        self.set_domain(u_min, u_max, min, max)
    }
}

impl Default for ParametricSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshFactory for ParametricSurfaceFactory {
    fn core(&self) -> &FactoryCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FactoryCore {
        &mut self.core
    }

    fn update(&mut self) -> Result<()> {
        self.surface.refresh_mutable(&mut self.core);
        self.core.run_update(&[
            &self.points,
            &self.lines,
            &self.faces,
            &self.quad,
            &self.surface,
        ])
    }
}

quad_grid_builders!(ParametricSurfaceFactory);
