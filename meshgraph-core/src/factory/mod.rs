//! Mesh Factories
//!
//! A factory turns client input (counts, explicit attribute lists, generation
//! switches) into a `Geometry`, recomputing only what the input changes
//! reached.
//!
//! # Overview
//!
//! Factories are stacked in levels. Each level is a `Layer`: a set of nodes
//! wired into one shared `FactoryCore` graph.
//!
//! - `PointSetFactory`: vertices
//! - `IndexedLineSetFactory`: plus edges
//! - `IndexedFaceSetFactory`: plus faces, normals, edges from faces, unwrapping
//! - `QuadMeshFactory`: a face set over a `u x v` grid
//! - `ParametricSurfaceFactory`: a quad mesh sampled from an `Immersion`
//!
//! `update()` resolves every layer, then writes what changed into the geometry.
//!
//! # Design Decisions
//!
//! 1. Levels compose rather than inherit. A higher level constructs the lower
//!    layers and may replace the recompute method of a node they created; the
//!    quad mesh, for example, regenerates the face indices from its grid.
//!
//! 2. The client API lives in builder traits with default methods. A level
//!    that forbids an operation overrides the method to return `Unsupported`.
//!
//! 3. The graph context is the explicit attribute data, so a generated slot
//!    can fall back to explicit data without a node per list.

mod config;
mod core;
mod face_set;
mod input;
mod line_set;
mod parametric;
mod point_set;
mod quad_mesh;

pub use self::core::{AttributeSlot, FactoryCore, FactoryGraph, FactoryResolver, Layer, MeshFactory};
pub use config::{FactoryConfig, GridConfig};
pub use face_set::{FaceSetBuilder, FaceSetNodes, IndexedFaceSetFactory};
pub use input::{AttributeMap, DoubleData, IndexData};
pub use line_set::{IndexedLineSetFactory, LineSetBuilder, LineSetNodes};
pub use parametric::{FnImmersion, Immersion, ParametricSurfaceFactory, SurfaceNodes};
pub use point_set::{PointSetBuilder, PointSetFactory, PointSetNodes};
pub use quad_mesh::{QuadMeshBuilder, QuadMeshFactory, QuadMeshNodes, DEFAULT_LINE_COUNT};
