//! Integration Tests for the Graph and the Factories
//!
//! These tests drive the public API the way a client would: wire nodes or
//! configure a factory, call `update()`, and inspect the output geometry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use meshgraph_core::data::{Attribute, Category, GeometryKind, SnapshotValue};
use meshgraph_core::factory::{
    FaceSetBuilder, FactoryConfig, FnImmersion, IndexedFaceSetFactory, LineSetBuilder, MeshFactory,
    ParametricSurfaceFactory, PointSetBuilder, PointSetFactory, QuadMeshBuilder, QuadMeshFactory,
};
use meshgraph_core::graph::{DependencyGraph, Metric, NodeId, Value, ValueType};
use meshgraph_core::GeometryError;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Graph with `a` (value), `b = 2a`, `c = b + 1`, counting recomputations.
fn chain() -> (DependencyGraph<()>, [NodeId; 3], Arc<AtomicUsize>) {
    let mut graph: DependencyGraph<()> = DependencyGraph::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let a = graph.add_node_with("a", ValueType::Count, Value::Count(1));
    let b = graph.add_node("b", ValueType::Count);
    let c = graph.add_node("c", ValueType::Count);
    graph.add_ingredient(b, a);
    graph.add_ingredient(c, b);

    let counter = runs.clone();
    graph.set_update_method(b, move |r, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(Value::Count(r.count(a) * 2))
    });
    let counter = runs.clone();
    graph.set_update_method(c, move |r, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(Value::Count(r.count(b) + 1))
    });
    (graph, [a, b, c], runs)
}

/// Test that resolving twice recomputes nothing the second time.
#[test]
fn resolve_is_idempotent() {
    let (mut graph, [_, _, c], runs) = chain();
    assert_eq!(graph.get(c, &()).and_then(|v| v.as_count()), Some(3));
    let stamp = graph.node(c).last_updated();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    assert_eq!(graph.get(c, &()).and_then(|v| v.as_count()), Some(3));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(graph.node(c).last_updated(), stamp);
}

/// Test that a change at the head of a chain reaches its tail.
#[test]
fn invalidation_reaches_the_whole_chain() {
    let (mut graph, [a, b, c], _) = chain();
    graph.resolve(c, &());
    assert!(!graph.node(b).is_out_of_date());

    graph.set_value(a, Some(Value::Count(5))).unwrap();
    assert!(graph.node(b).is_out_of_date());
    assert!(graph.node(c).is_out_of_date());
    assert_eq!(graph.get(c, &()).and_then(|v| v.as_count()), Some(11));
}

/// Test that assigning the value a node already holds outdates nothing.
#[test]
fn identical_value_is_a_no_op() {
    let (mut graph, [a, _, c], runs) = chain();
    graph.resolve(c, &());
    graph.set_value(a, Some(Value::Count(1))).unwrap();
    assert!(!graph.node(c).is_out_of_date());
    graph.resolve(c, &());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test that wiring a cycle panics instead of hanging.
#[test]
#[should_panic(expected = "cycle detected")]
fn wiring_a_cycle_panics() {
    let mut graph: DependencyGraph<()> = DependencyGraph::new();
    let a = graph.add_node("a", ValueType::Count);
    let b = graph.add_node("b", ValueType::Count);
    graph.add_ingredient(a, b);
    graph.add_ingredient(b, a);
}

/// Test the point set scenario end to end.
#[test]
fn point_set_end_to_end() {
    let mut factory = PointSetFactory::new();
    factory.set_vertex_count(3).unwrap();
    factory
        .set_vertex_coordinates(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
        .unwrap();
    factory.set_generate_vertex_labels(true).unwrap();
    factory.update().unwrap();

    let geometry = factory.geometry();
    assert_eq!(geometry.kind(), GeometryKind::PointSet);
    assert_eq!(geometry.vertex_count(), 3);
    assert_eq!(geometry.labels(Category::Vertex).unwrap().as_slice(), strings(&["0", "1", "2"]).as_slice());
    assert_eq!(geometry.vertex_coordinates().unwrap()[2], vec![0.0, 1.0, 0.0]);
    assert_eq!(factory.update_count(), 1);
}

/// Test that generation and explicit data exclude each other both ways.
#[test]
fn generate_and_explicit_exclude_each_other() {
    let mut factory = PointSetFactory::new();
    factory.set_vertex_count(2).unwrap();
    factory.set_vertex_labels(strings(&["a", "b"])).unwrap();
    assert!(matches!(
        factory.set_generate_vertex_labels(true),
        Err(GeometryError::ExplicitAttributePresent { .. })
    ));

    factory.clear_vertex_labels().unwrap();
    factory.set_generate_vertex_labels(true).unwrap();
    assert!(matches!(
        factory.set_vertex_labels(strings(&["a", "b"])),
        Err(GeometryError::AttributeGenerated { .. })
    ));

    factory.set_generate_vertex_labels(false).unwrap();
    factory.set_vertex_labels(strings(&["a", "b"])).unwrap();
    factory.update().unwrap();
    assert_eq!(factory.geometry().labels(Category::Vertex).unwrap()[0], "a");
}

/// Test that every list in the geometry matches its category's count.
#[test]
fn lists_match_counts_after_update() {
    let mut factory = IndexedFaceSetFactory::new();
    factory.set_vertex_count(4).unwrap();
    factory.set_vertex_coordinates(vec![0.0; 12]).unwrap();
    factory.set_vertex_colors(vec![[1.0, 0.0, 0.0, 1.0]; 4]).unwrap();
    factory.set_face_count(2).unwrap();
    factory
        .set_face_indices(vec![vec![0, 1, 2], vec![2, 1, 3]])
        .unwrap();
    factory.set_generate_face_labels(true).unwrap();
    factory.set_generate_edges_from_faces(true).unwrap();
    factory.update().unwrap();

    let geometry = factory.geometry();
    for category in Category::ALL {
        let count = geometry.count(category);
        for (attribute, value) in geometry.attributes(category) {
            assert_eq!(value.len(), Some(count), "{category} {attribute}");
        }
    }
    assert!(matches!(
        factory.set_vertex_colors(vec![[1.0, 0.0, 0.0]; 3]),
        Err(GeometryError::WrongLength { expected: 4, found: 3, .. })
    ));
}

/// Test that two triangles sharing an edge give five edges.
#[test]
fn edges_from_two_triangles() {
    let mut factory = IndexedFaceSetFactory::new();
    factory.set_vertex_count(4).unwrap();
    factory.set_face_count(2).unwrap();
    factory
        .set_face_indices(vec![vec![0, 1, 2], vec![2, 1, 3]])
        .unwrap();
    factory.set_generate_edges_from_faces(true).unwrap();
    factory.update().unwrap();

    let edges = factory.geometry().edge_indices().unwrap();
    assert_eq!(edges.len(), 5);
    let mut sorted: Vec<Vec<usize>> = edges.iter().cloned().collect();
    sorted.sort();
    assert_eq!(
        sorted,
        vec![vec![0, 1], vec![0, 2], vec![1, 2], vec![1, 3], vec![2, 3]]
    );
}

fn cube_coordinates() -> Vec<[f64; 3]> {
    vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ]
}

fn cube_faces() -> Vec<Vec<usize>> {
    vec![
        vec![0, 3, 2, 1],
        vec![4, 5, 6, 7],
        vec![0, 1, 5, 4],
        vec![2, 3, 7, 6],
        vec![0, 4, 7, 3],
        vec![1, 2, 6, 5],
    ]
}

fn cube() -> IndexedFaceSetFactory {
    let mut factory = IndexedFaceSetFactory::new();
    factory.set_vertex_count(8).unwrap();
    factory.set_vertex_coordinates(cube_coordinates()).unwrap();
    factory.set_face_count(6).unwrap();
    factory.set_face_indices(cube_faces()).unwrap();
    factory
}

/// Test toggling edge generation on a cube.
#[test]
fn cube_edges_come_and_go() {
    let mut factory = cube();
    factory.set_generate_edges_from_faces(true).unwrap();
    factory.update().unwrap();
    assert_eq!(factory.geometry().edge_count(), 12);
    assert_eq!(factory.edge_count(), 12);

    factory.set_generate_edges_from_faces(false).unwrap();
    factory.update().unwrap();
    assert_eq!(factory.geometry().edge_count(), 0);
    assert!(factory.geometry().edge_indices().is_none());
}

/// Test toggling face labels.
#[test]
fn face_labels_come_and_go() {
    let mut factory = cube();
    factory.set_generate_face_labels(true).unwrap();
    factory.update().unwrap();
    assert_eq!(factory.geometry().labels(Category::Face).unwrap().len(), 6);

    factory.set_generate_face_labels(false).unwrap();
    factory.update().unwrap();
    assert!(factory.geometry().labels(Category::Face).is_none());
}

/// Test that an unwrapped cube maps every duplicate to its vertex and shares
/// its normal.
#[test]
fn unwrapped_cube() {
    let mut coordinates = cube_coordinates();
    for actual in [2, 6, 3, 7, 3, 7] {
        coordinates.push(coordinates[actual]);
    }

    let mut factory = IndexedFaceSetFactory::new();
    factory.set_vertex_count(14).unwrap();
    factory.set_vertex_coordinates(coordinates).unwrap();
    factory.set_face_count(6).unwrap();
    factory.set_face_indices(cube_faces()).unwrap();
    let mut unwrap = cube_faces();
    unwrap[3] = vec![2, 10, 11, 6];
    unwrap[4] = vec![0, 4, 13, 12];
    unwrap[5] = vec![1, 8, 9, 5];
    factory.set_unwrap_face_indices(unwrap.clone()).unwrap();
    factory.set_generate_vertex_normals(true).unwrap();
    factory.update().unwrap();

    let table = factory.actual_vertex_of_unwrap_vertex().unwrap();
    assert_eq!(table.len(), 14);
    assert_eq!(&table[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(&table[8..], &[2, 6, 3, 7, 3, 7]);

    let geometry = factory.geometry();
    assert_eq!(geometry.face_indices().unwrap().as_slice(), unwrap.as_slice());
    let normals = geometry.vertex_normals().unwrap();
    for (unwrapped, &actual) in table.iter().enumerate() {
        assert_eq!(normals[unwrapped], normals[actual]);
    }
    let corner = 1.0 / 3.0_f64.sqrt();
    assert_abs_diff_eq!(normals[6][0], corner, epsilon = 1e-12);
    assert_abs_diff_eq!(normals[9][2], corner, epsilon = 1e-12);
}

/// Test that an update with nothing changed leaves the geometry alone.
#[test]
fn second_update_writes_nothing() {
    let mut factory = cube();
    factory.set_generate_face_normals(true).unwrap();
    factory.set_generate_vertex_normals(true).unwrap();
    factory.update().unwrap();
    let clock = factory.core().graph().clock();
    let normals = factory.geometry().vertex_normals().cloned().unwrap();

    factory.update().unwrap();
    assert_eq!(factory.core().graph().clock(), clock);
    assert!(Arc::ptr_eq(&normals, factory.geometry().vertex_normals().unwrap()));
}

/// Test a quad mesh with generated edges, normals and texture coordinates.
#[test]
fn quad_mesh_grid() {
    let mut factory = QuadMeshFactory::new();
    factory.set_mesh_size(4, 3).unwrap();
    let mut coordinates = Vec::new();
    for i in 0..3 {
        for j in 0..4 {
            coordinates.push([j as f64, i as f64, 0.0]);
        }
    }
    factory.set_vertex_coordinates(coordinates).unwrap();
    factory.set_generate_vertex_normals(true).unwrap();
    factory.set_generate_edges_from_faces(true).unwrap();
    factory.set_edge_from_quad_mesh(true).unwrap();
    factory.update().unwrap();

    let geometry = factory.geometry();
    assert_eq!(geometry.vertex_count(), 12);
    assert_eq!(geometry.face_count(), 6);
    assert_eq!(geometry.edge_count(), 7);
    assert!(geometry
        .attribute(Category::Vertex, &Attribute::TextureCoordinates)
        .is_some());
    for normal in geometry.vertex_normals().unwrap().iter() {
        assert_abs_diff_eq!(normal[2].abs(), 1.0, epsilon = 1e-12);
    }
}

/// Test a torus sampled from an immersion closed in both directions.
#[test]
fn parametric_torus() {
    use std::f64::consts::TAU;
    let mut factory = ParametricSurfaceFactory::new();
    factory
        .set_immersion(FnImmersion::new(3, |u, v, out: &mut [f64]| {
            let r = 2.0 + v.cos();
            out[0] = r * u.cos();
            out[1] = r * u.sin();
            out[2] = v.sin();
        }))
        .unwrap();
    factory.set_domain(0.0, TAU, 0.0, TAU).unwrap();
    factory.set_mesh_size(12, 8).unwrap();
    factory.set_closed_in_u(true).unwrap();
    factory.set_closed_in_v(true).unwrap();
    factory.set_generate_vertex_normals(true).unwrap();
    factory.update().unwrap();

    let geometry = factory.geometry();
    let coordinates = geometry.vertex_coordinates().unwrap();
    assert_eq!(coordinates.len(), 96);
    assert_abs_diff_eq!(coordinates[0][0], 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(coordinates[11][0], 3.0, epsilon = 1e-9);

    let normals = geometry.vertex_normals().unwrap();
    for i in 0..8 {
        assert_eq!(normals[i * 12], normals[i * 12 + 11]);
    }
    for j in 0..12 {
        assert_eq!(normals[j], normals[7 * 12 + j]);
    }
}

/// Test that a configuration builds the factory it describes.
#[test]
fn factory_from_json_config() {
    let config = FactoryConfig::from_json(
        r#"{
            "metric": "elliptic",
            "generateVertexLabels": true,
            "generateEdgesFromFaces": true,
            "generateBoundingBox": true
        }"#,
    )
    .unwrap();
    let mut factory = IndexedFaceSetFactory::with_config(&config).unwrap();
    factory.set_vertex_count(8).unwrap();
    factory.set_vertex_coordinates(cube_coordinates()).unwrap();
    factory.set_face_count(6).unwrap();
    factory.set_face_indices(cube_faces()).unwrap();
    factory.update().unwrap();

    let geometry = factory.geometry();
    assert_eq!(geometry.metric(), Metric::Elliptic);
    assert_eq!(geometry.edge_count(), 12);
    assert_eq!(geometry.labels(Category::Vertex).unwrap().len(), 8);
    let bbox = geometry.bounding_box().unwrap();
    assert_eq!(bbox.max, [1.0, 1.0, 1.0]);
}

/// Test that snapshots carry the counts and lists and encode to msgpack.
#[test]
fn snapshot_of_a_face_set() {
    let mut factory = cube();
    factory.set_generate_face_labels(true).unwrap();
    factory.update().unwrap();

    let snapshot = factory.geometry().snapshot();
    let faces = snapshot
        .categories
        .iter()
        .find(|c| c.category == Category::Face)
        .unwrap();
    assert_eq!(faces.count, 6);
    assert!(matches!(
        faces.attributes.get("labels"),
        Some(SnapshotValue::Strings(labels)) if labels.len() == 6
    ));

    let bytes = factory.geometry().to_msgpack().unwrap();
    assert!(!bytes.is_empty());
}
