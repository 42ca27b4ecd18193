//! Factory configuration.
//!
//! A `FactoryConfig` holds the switches a client would otherwise flip one
//! setter at a time: the metric, what to generate, and the grid of quad
//! meshes. It is plain serde data; missing fields take their defaults, so
//! `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use super::face_set::FaceSetBuilder;
use super::line_set::LineSetBuilder;
use super::point_set::PointSetBuilder;
use super::quad_mesh::{QuadMeshBuilder, DEFAULT_LINE_COUNT};
use crate::error::Result;
use crate::graph::Metric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FactoryConfig {
    pub metric: Metric,
    pub generate_vertex_labels: bool,
    pub generate_edge_labels: bool,
    pub generate_face_labels: bool,
    pub generate_edges_from_faces: bool,
    pub generate_face_normals: bool,
    pub generate_vertex_normals: bool,
    pub generate_bounding_box: bool,
    /// Only read by quad meshes and parametric surfaces.
    pub grid: Option<GridConfig>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Euclidean,
            generate_vertex_labels: false,
            generate_edge_labels: false,
            generate_face_labels: false,
            generate_edges_from_faces: false,
            generate_face_normals: false,
            generate_vertex_normals: false,
            generate_bounding_box: false,
            grid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub u_line_count: usize,
    pub v_line_count: usize,
    pub closed_in_u: bool,
    pub closed_in_v: bool,
    pub edge_from_quad_mesh: bool,
    pub generate_texture_coordinates: bool,
    pub texture_scale: [f64; 2],
    pub texture_shift: [f64; 2],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            u_line_count: DEFAULT_LINE_COUNT,
            v_line_count: DEFAULT_LINE_COUNT,
            closed_in_u: false,
            closed_in_v: false,
            edge_from_quad_mesh: false,
            generate_texture_coordinates: true,
            texture_scale: [1.0, 1.0],
            texture_shift: [0.0, 0.0],
        }
    }
}

impl FactoryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn apply_point_set<F: PointSetBuilder>(&self, factory: &mut F) -> Result<()> {
        factory.set_metric(self.metric)?;
        factory.set_generate_vertex_labels(self.generate_vertex_labels)
    }

    pub fn apply_line_set<F: LineSetBuilder>(&self, factory: &mut F) -> Result<()> {
        self.apply_point_set(factory)?;
        factory.set_generate_edge_labels(self.generate_edge_labels)
    }

    pub fn apply_face_set<F: FaceSetBuilder>(&self, factory: &mut F) -> Result<()> {
        self.apply_line_set(factory)?;
        factory.set_generate_face_labels(self.generate_face_labels)?;
        factory.set_generate_edges_from_faces(self.generate_edges_from_faces)?;
        factory.set_generate_face_normals(self.generate_face_normals)?;
        factory.set_generate_vertex_normals(self.generate_vertex_normals)?;
        factory.set_generate_bounding_box(self.generate_bounding_box)
    }

    pub fn apply_quad_mesh<F: QuadMeshBuilder>(&self, factory: &mut F) -> Result<()> {
        self.apply_face_set(factory)?;
        let Some(grid) = &self.grid else {
            return Ok(());
        };
        factory.set_mesh_size(grid.u_line_count, grid.v_line_count)?;
        factory.set_closed_in_u(grid.closed_in_u)?;
        factory.set_closed_in_v(grid.closed_in_v)?;
        factory.set_edge_from_quad_mesh(grid.edge_from_quad_mesh)?;
        factory.set_generate_texture_coordinates(grid.generate_texture_coordinates)?;
        factory.set_texture_scale(grid.texture_scale[0], grid.texture_scale[1])?;
        factory.set_texture_shift(grid.texture_shift[0], grid.texture_shift[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::factory::core::MeshFactory;
    use crate::factory::{IndexedFaceSetFactory, QuadMeshFactory};

    #[test]
    fn empty_json_is_the_default() {
        assert_eq!(FactoryConfig::from_json("{}").unwrap(), FactoryConfig::default());
    }

    #[test]
    fn json_round_trip() {
        let config = FactoryConfig {
            metric: Metric::Hyperbolic,
            generate_face_normals: true,
            grid: Some(GridConfig {
                u_line_count: 4,
                closed_in_v: true,
                ..GridConfig::default()
            }),
            ..FactoryConfig::default()
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("\"generateFaceNormals\": true"));
        assert!(json.contains("\"hyperbolic\""));
        assert_eq!(FactoryConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = FactoryConfig::from_json("{\"metric\": 3}").unwrap_err();
        assert!(matches!(err, GeometryError::Config(_)));
    }

    #[test]
    fn face_set_picks_up_generation_switches() {
        let config = FactoryConfig::from_json(
            r#"{"generateFaceLabels": true, "generateEdgesFromFaces": true}"#,
        )
        .unwrap();
        let factory = IndexedFaceSetFactory::with_config(&config).unwrap();
        assert!(factory.is_generate_face_labels());
        assert!(factory.is_generate_edges_from_faces());
        assert!(!factory.is_generate_face_normals());
    }

    #[test]
    fn grid_settings_reach_the_quad_mesh() {
        let config = FactoryConfig::from_json(
            r#"{"grid": {"uLineCount": 3, "vLineCount": 5, "closedInU": true}}"#,
        )
        .unwrap();
        let mut factory = QuadMeshFactory::with_config(&config).unwrap();
        assert_eq!((factory.u_line_count(), factory.v_line_count()), (3, 5));
        assert!(factory.is_closed_in_u());
        factory.update().unwrap();
        assert_eq!(factory.geometry().face_count(), 8);
    }

    #[test]
    fn invalid_grid_fails_construction() {
        let config = FactoryConfig::from_json(r#"{"grid": {"uLineCount": 1}}"#).unwrap();
        assert!(QuadMeshFactory::with_config(&config).is_err());
    }
}
