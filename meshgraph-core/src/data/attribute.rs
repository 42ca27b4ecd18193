//! Attribute keys.
//!
//! Every list stored on a mesh is addressed by a `(Category, Attribute)` pair:
//! the category says which elements the list describes, the attribute says
//! what the list means.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The element category an attribute list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Per-vertex data.
    Vertex,
    /// Per-edge data.
    Edge,
    /// Per-face data.
    Face,
}

impl Category {
    /// All categories, in materialization order.
    pub const ALL: [Category; 3] = [Category::Vertex, Category::Edge, Category::Face];

    /// Lower-case name, used in node names and log output.
    pub fn name(self) -> &'static str {
        match self {
            Category::Vertex => "vertex",
            Category::Edge => "edge",
            Category::Face => "face",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The meaning of an attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    Coordinates,
    Normals,
    Colors,
    TextureCoordinates,
    Labels,
    Indices,
    RelativeRadii,
    /// Any attribute without a dedicated variant.
    Named(String),
}

impl Attribute {
    /// Look up an attribute by name. Well-known names map onto their variant.
    pub fn named(name: &str) -> Self {
        match name {
            "coordinates" => Attribute::Coordinates,
            "normals" => Attribute::Normals,
            "colors" => Attribute::Colors,
            "textureCoordinates" => Attribute::TextureCoordinates,
            "labels" => Attribute::Labels,
            "indices" => Attribute::Indices,
            "relativeRadii" => Attribute::RelativeRadii,
            other => Attribute::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Attribute::Coordinates => "coordinates",
            Attribute::Normals => "normals",
            Attribute::Colors => "colors",
            Attribute::TextureCoordinates => "textureCoordinates",
            Attribute::Labels => "labels",
            Attribute::Indices => "indices",
            Attribute::RelativeRadii => "relativeRadii",
            Attribute::Named(name) => name,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
