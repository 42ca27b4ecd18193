//! Error Types
//!
//! One error type covers the whole crate. Caller mistakes (wrong lengths,
//! type mismatches, mutually exclusive settings) are returned as `Err`.
//! Wiring mistakes inside a factory (cycles, self edges) are programming
//! errors: the graph panics with the `Display` text of the matching variant.

use thiserror::Error;

use crate::data::{Attribute, Category};
use crate::graph::{Traversal, ValueType};

/// Errors raised by the dependency graph, the factories and the output geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A node was re-entered while it was being resolved or outdated.
    #[error("cycle detected at node `{node}` during {phase}")]
    CycleDetected { node: String, phase: Traversal },

    /// A node was wired as its own ingredient or dependent.
    #[error("node `{node}` cannot depend on itself")]
    SelfDependency { node: String },

    /// A value of the wrong type was assigned to a node.
    #[error("node `{node}` holds {expected} values, got {found}")]
    TypeMismatch {
        node: String,
        expected: ValueType,
        found: ValueType,
    },

    /// An attribute array does not match the element count of its category.
    #[error("{category} {attribute}: array has wrong length (expected {expected}, found {found})")]
    WrongLength {
        category: Category,
        attribute: Attribute,
        expected: usize,
        found: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Explicit data was supplied for an attribute that is being generated.
    #[error("{category} {attribute} is generated; disable generation before setting it")]
    AttributeGenerated {
        category: Category,
        attribute: Attribute,
    },

    /// Generation was enabled for an attribute that has explicit data.
    #[error("{category} {attribute} is explicitly set; clear it before generating it")]
    ExplicitAttributePresent {
        category: Category,
        attribute: Attribute,
    },

    /// Edges cannot be generated from faces while edge attributes are set.
    #[error("cannot generate edges from faces while edge attributes are set")]
    EdgeAttributesPresent,

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GeometryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_length_names_both_lengths() {
        let err = GeometryError::WrongLength {
            category: Category::Vertex,
            attribute: Attribute::Coordinates,
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "vertex coordinates: array has wrong length (expected 3, found 2)"
        );
    }

    #[test]
    fn cycle_message_names_node_and_phase() {
        let err = GeometryError::CycleDetected {
            node: "faceNormals".to_string(),
            phase: Traversal::Resolve,
        };
        assert_eq!(err.to_string(), "cycle detected at node `faceNormals` during resolve");
    }
}
