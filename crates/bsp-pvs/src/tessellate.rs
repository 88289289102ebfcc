//! Conversion of leaf polygons into the flat triangle buffer used for drawing
//! and segment tests.

use crate::{Polygon, Triangle};

/// Splits a triangle or quad into triangles, keeping per-vertex normals.
///
/// Quads are cut along the 0–2 diagonal into `(0, 1, 2)` and `(2, 3, 0)`.
///
/// # Panics
/// Panics for any vertex count other than 3 or 4, which [`Polygon`]'s
/// constructors already rule out.
pub fn triangulate(polygon: &Polygon) -> Vec<Triangle> {
    let v = polygon.vertices();
    let n = polygon.normals();
    let tri = |a: usize, b: usize, c: usize| {
        Triangle::with_normals([v[a], v[b], v[c]], [n[a], n[b], n[c]])
    };

    match polygon.len() {
        3 => vec![tri(0, 1, 2)],
        4 => vec![tri(0, 1, 2), tri(2, 3, 0)],
        count => panic!("Cannot tessellate a polygon with {count} vertices"),
    }
}

/// Tessellates every polygon of a leaf into one buffer.
pub fn tessellate(polygons: &[Polygon]) -> Vec<Triangle> {
    polygons.iter().flat_map(triangulate).collect()
}
