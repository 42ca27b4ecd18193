//! Mesh data: attribute keys, the explicit data a client supplies, and the
//! geometry a factory produces.

mod attribute;
pub mod geometry;
mod list_set;

pub use attribute::{Attribute, Category};
pub use geometry::{CategorySnapshot, Geometry, GeometryKind, GeometrySnapshot, SnapshotValue};
pub use list_set::{AttributeListSet, AttributeStore};
