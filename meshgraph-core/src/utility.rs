//! Geometry Utilities
//!
//! Free functions the factories use to derive attributes: edges from faces,
//! face and vertex normals, bounding boxes, quad grids and unwrap tables.
//! Everything here is pure; the factories decide when to call it.

use glam::DVec3;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Smallest box containing all points, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = DVec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self {
            min: min.to_array(),
            max: max.to_array(),
        })
    }

    pub fn center(&self) -> DVec3 {
        (DVec3::from_array(self.min) + DVec3::from_array(self.max)) * 0.5
    }

    pub fn extent(&self) -> DVec3 {
        DVec3::from_array(self.max) - DVec3::from_array(self.min)
    }
}

/// Read a coordinate row as a 3D point.
///
/// Rows of four are homogeneous and get divided by `w` (unless `w` is zero);
/// shorter rows are padded with zeros.
pub fn point(row: &[f64]) -> DVec3 {
    let get = |i: usize| row.get(i).copied().unwrap_or(0.0);
    let p = DVec3::new(get(0), get(1), get(2));
    match row.get(3) {
        Some(&w) if row.len() == 4 && w != 0.0 => p / w,
        _ => p,
    }
}

/// Bounding box of the vertices referenced by `faces`, or of all vertices
/// when there are no faces.
pub fn bounding_box(coordinates: &[Vec<f64>], faces: Option<&[Vec<usize>]>) -> Option<BoundingBox> {
    match faces {
        Some(faces) if !faces.is_empty() => BoundingBox::from_points(
            faces
                .iter()
                .flatten()
                .filter_map(|&v| coordinates.get(v))
                .map(|row| point(row)),
        ),
        _ => BoundingBox::from_points(coordinates.iter().map(|row| point(row))),
    }
}

/// Unique undirected edges of a face list, including the closing edge of
/// every face. Edges keep the order in which they are first met.
pub fn edges_from_faces(faces: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut edges: IndexSet<(usize, usize)> = IndexSet::new();
    for face in faces {
        let n = face.len();
        if n < 2 {
            continue;
        }
        for k in 0..n {
            let (a, b) = (face[k], face[(k + 1) % n]);
            if a == b {
                continue;
            }
            edges.insert((a.min(b), a.max(b)));
        }
    }
    edges.into_iter().map(|(a, b)| vec![a, b]).collect()
}

/// Unit normal of one polygon by Newell's method; zero for degenerate faces.
fn newell_normal(coordinates: &[Vec<f64>], face: &[usize]) -> DVec3 {
    let n = face.len();
    let mut normal = DVec3::ZERO;
    for k in 0..n {
        let (Some(a), Some(b)) = (coordinates.get(face[k]), coordinates.get(face[(k + 1) % n]))
        else {
            return DVec3::ZERO;
        };
        let (a, b) = (point(a), point(b));
        normal += DVec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        );
    }
    normal.normalize_or_zero()
}

/// One unit normal per face, written into `out` (resized as needed).
pub fn face_normals_into(coordinates: &[Vec<f64>], faces: &[Vec<usize>], out: &mut Vec<Vec<f64>>) {
    out.resize_with(faces.len(), || vec![0.0; 3]);
    for (row, face) in out.iter_mut().zip(faces) {
        row.clear();
        row.extend_from_slice(&newell_normal(coordinates, face).to_array());
    }
}

pub fn face_normals(coordinates: &[Vec<f64>], faces: &[Vec<usize>]) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(faces.len());
    face_normals_into(coordinates, faces, &mut out);
    out
}

/// Per-vertex normals: the normalized sum of the normals of the incident faces.
///
/// Vertices not referenced by any face get the zero vector.
pub fn vertex_normals_into(
    vertex_count: usize,
    faces: &[Vec<usize>],
    face_normals: &[Vec<f64>],
    out: &mut Vec<Vec<f64>>,
) {
    let mut sums = vec![DVec3::ZERO; vertex_count];
    for (face, normal) in faces.iter().zip(face_normals) {
        let normal = point(normal);
        for &v in face {
            if let Some(sum) = sums.get_mut(v) {
                *sum += normal;
            }
        }
    }
    out.resize_with(vertex_count, || vec![0.0; 3]);
    for (row, sum) in out.iter_mut().zip(sums) {
        row.clear();
        row.extend_from_slice(&sum.normalize_or_zero().to_array());
    }
}

/// Translation table from unwrap vertices to the vertices they duplicate.
///
/// `table[unwrap[f][k]] = faces[f][k]`; vertices no unwrap face references
/// map to themselves.
pub fn actual_vertex_of_unwrap_vertex(
    faces: &[Vec<usize>],
    unwrap_faces: &[Vec<usize>],
    vertex_count: usize,
) -> Vec<usize> {
    let mut table: Vec<usize> = (0..vertex_count).collect();
    for (face, unwrap_face) in faces.iter().zip(unwrap_faces) {
        for (&actual, &unwrapped) in face.iter().zip(unwrap_face) {
            if let Some(slot) = table.get_mut(unwrapped) {
                *slot = actual;
            }
        }
    }
    table
}

/// Expand per-vertex data given for actual vertices onto unwrap vertices.
///
/// `data` holds `entries_per_vertex` values per vertex; the result holds the
/// same number of values for every entry of `table`.
pub fn unwrap_vertex_attributes<T: Clone>(
    data: &[T],
    entries_per_vertex: usize,
    table: &[usize],
) -> Option<Vec<T>> {
    if entries_per_vertex == 0 {
        return None;
    }
    let mut out = Vec::with_capacity(table.len() * entries_per_vertex);
    for &actual in table {
        let start = actual * entries_per_vertex;
        out.extend_from_slice(data.get(start..start + entries_per_vertex)?);
    }
    Some(out)
}

/// Copy the normal of each canonical vertex onto its duplicates.
pub fn propagate_unwrap_normals(normals: &mut [Vec<f64>], table: &[usize]) {
    for (unwrapped, &actual) in table.iter().enumerate() {
        if unwrapped != actual && actual < normals.len() && unwrapped < normals.len() {
            normals[unwrapped] = normals[actual].clone();
        }
    }
}

/// Quadrilaterals of a `u x v` grid, row by row.
pub fn quad_face_indices(u: usize, v: usize) -> Vec<Vec<usize>> {
    let mut faces = Vec::with_capacity(u.saturating_sub(1) * v.saturating_sub(1));
    for i in 0..v.saturating_sub(1) {
        for j in 0..u.saturating_sub(1) {
            faces.push(vec![
                i * u + j,
                (i + 1) * u + j,
                (i + 1) * u + j + 1,
                i * u + j + 1,
            ]);
        }
    }
    faces
}

/// Parameter curves of a `u x v` grid as polylines: first the `u` curves
/// running in v direction, then the `v` curves running in u direction.
pub fn quad_edge_curves(u: usize, v: usize) -> Vec<Vec<usize>> {
    let mut curves = Vec::with_capacity(u + v);
    for i in 0..u {
        curves.push((0..v).map(|j| j * u + i).collect());
    }
    for i in 0..v {
        curves.push((0..u).map(|j| i * u + j).collect());
    }
    curves
}

/// Texture coordinates of a `u x v` grid over the unit square, scaled then shifted.
pub fn quad_texture_coordinates(u: usize, v: usize, scale: [f64; 2], shift: [f64; 2]) -> Vec<Vec<f64>> {
    let du = if u > 1 { 1.0 / (u - 1) as f64 } else { 0.0 };
    let dv = if v > 1 { 1.0 / (v - 1) as f64 } else { 0.0 };
    let mut coords = Vec::with_capacity(u * v);
    for i in 0..v {
        for j in 0..u {
            coords.push(vec![
                j as f64 * du * scale[0] + shift[0],
                i as f64 * dv * scale[1] + shift[1],
            ]);
        }
    }
    coords
}

/// Average the normals of vertex pairs that meet across a closed seam.
pub fn smooth_seams(normals: &mut [Vec<f64>], u: usize, v: usize, closed_u: bool, closed_v: bool) {
    if normals.len() != u * v || u < 2 || v < 2 {
        return;
    }
    let mut join = |a: usize, b: usize| {
        let avg = (point(&normals[a]) + point(&normals[b])).normalize_or_zero().to_array();
        normals[a] = avg.to_vec();
        normals[b] = avg.to_vec();
    };
    if closed_u {
        for i in 0..v {
            join(i * u, i * u + u - 1);
        }
    }
    if closed_v {
        for j in 0..u {
            join(j, (v - 1) * u + j);
        }
    }
}

/// Stringified indices `"0" .. "n-1"`.
pub fn index_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}
