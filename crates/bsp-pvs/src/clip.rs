//! Polygon clipping against partition planes.

use nalgebra::{Point3, Vector3};

use crate::polygon::MAX_VERTICES;
use crate::{Classification, Plane3D, PlaneSide, Polygon};

/// Classifies `polygon` against `plane`.
///
/// - **Front**: no vertex behind the plane
/// - **Back**: no vertex in front of the plane
/// - **Coincident**: every vertex within epsilon of the plane
/// - **Intersects**: vertices strictly on both sides
#[inline]
pub fn classify(plane: &Plane3D, polygon: &Polygon) -> Classification {
    polygon.classify(plane)
}

/// Splits an intersecting polygon into its `(front, back)` pieces.
///
/// Uses a variant of the Sutherland-Hodgman algorithm: walks the polygon
/// edges and builds two vertex lists, adding an interpolated vertex (and
/// normal) wherever an edge crosses the plane. Both sides keep the original
/// winding, plane and divider flag.
///
/// A plane that cuts one corner off a quad leaves a pentagon on the other
/// side; such a side comes back as a quad and a triangle, so every piece
/// stays tessellatable.
///
/// # Panics
/// Panics if `polygon` does not classify as [`Classification::Intersects`].
pub fn split_polygon(plane: &Plane3D, polygon: &Polygon) -> (Vec<Polygon>, Vec<Polygon>) {
    assert_eq!(
        polygon.classify(plane),
        Classification::Intersects,
        "Only polygons spanning the plane can be split"
    );

    let vertices = polygon.vertices();
    let normals = polygon.normals();
    let n = vertices.len();

    let mut front_verts = Vec::with_capacity(n + 1);
    let mut front_norms = Vec::with_capacity(n + 1);
    let mut back_verts = Vec::with_capacity(n + 1);
    let mut back_norms = Vec::with_capacity(n + 1);

    let sides: Vec<PlaneSide> = vertices.iter().map(|v| plane.classify_point(v)).collect();

    for i in 0..n {
        let next = (i + 1) % n;

        match sides[i] {
            PlaneSide::Front => {
                front_verts.push(vertices[i]);
                front_norms.push(normals[i]);
            }
            PlaneSide::Back => {
                back_verts.push(vertices[i]);
                back_norms.push(normals[i]);
            }
            PlaneSide::OnPlane => {
                // On-plane vertices go to both sides
                front_verts.push(vertices[i]);
                front_norms.push(normals[i]);
                back_verts.push(vertices[i]);
                back_norms.push(normals[i]);
            }
        }

        let crosses = matches!(
            (sides[i], sides[next]),
            (PlaneSide::Front, PlaneSide::Back) | (PlaneSide::Back, PlaneSide::Front)
        );

        if crosses {
            let (a, b) = (vertices[i], vertices[next]);
            let da = plane.distance_from_point(&a);
            let db = plane.distance_from_point(&b);
            let t = da / (da - db);
            let point = a + (b - a) * t;
            let normal = normals[i] + (normals[next] - normals[i]) * t;

            front_verts.push(point);
            front_norms.push(normal);
            back_verts.push(point);
            back_norms.push(normal);
        }
    }

    let source_plane = polygon.plane();
    let used = polygon.is_used_as_divider();
    (
        into_pieces(front_verts, front_norms, source_plane, used),
        into_pieces(back_verts, back_norms, source_plane, used),
    )
}

/// Fans a convex vertex loop from its first vertex into quads, closing with a
/// triangle when the count calls for it.
fn into_pieces(
    vertices: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    plane: &Plane3D,
    used_as_divider: bool,
) -> Vec<Polygon> {
    let n = vertices.len();
    if n <= MAX_VERTICES {
        return vec![Polygon::fragment(vertices, normals, plane.clone(), used_as_divider)];
    }

    let mut pieces = Vec::with_capacity(n / 2);
    let mut start = 1;
    while start + 1 < n {
        let end = (start + MAX_VERTICES - 1).min(n);
        let fan: Vec<usize> = std::iter::once(0).chain(start..end).collect();
        pieces.push(Polygon::fragment(
            fan.iter().map(|&i| vertices[i]).collect(),
            fan.iter().map(|&i| normals[i]).collect(),
            plane.clone(),
            used_as_divider,
        ));
        start = end - 1;
    }
    pieces
}
