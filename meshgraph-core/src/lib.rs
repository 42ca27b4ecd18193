//! Meshgraph Core
//!
//! This crate provides incremental mesh construction on top of a dependency
//! graph. It implements:
//!
//! - A lazily recomputed dependency graph with typed node values
//! - Attribute slots that switch between generated and explicit data
//! - Factories for point sets, line sets, face sets, quad meshes and
//!   parametric surfaces
//! - An output geometry with serde snapshots
//!
//! # Architecture
//!
//! - `graph`: nodes, values, invalidation and resolution
//! - `data`: attribute keys, explicit data and the output geometry
//! - `factory`: factory levels and their client API
//! - `utility`: the mesh algorithms recompute methods call
//!
//! # Example
//!
//! ```rust
//! use meshgraph_core::factory::{FaceSetBuilder, IndexedFaceSetFactory, MeshFactory, PointSetBuilder};
//!
//! let mut factory = IndexedFaceSetFactory::new();
//! factory.set_vertex_count(4)?;
//! factory.set_vertex_coordinates(vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [1.0, 1.0, 0.0],
//! ])?;
//! factory.set_face_count(2)?;
//! factory.set_face_indices(vec![vec![0, 1, 2], vec![2, 1, 3]])?;
//! factory.set_generate_edges_from_faces(true)?;
//! factory.update()?;
//!
//! assert_eq!(factory.geometry().edge_count(), 5);
//! # Ok::<(), meshgraph_core::GeometryError>(())
//! ```

pub mod data;
pub mod error;
pub mod factory;
pub mod graph;
pub mod utility;

pub use error::{GeometryError, Result};
