//! Polygon representation for BSP construction.

use nalgebra::{Point3, Vector3};

use crate::{Classification, Plane3D, PlaneSide};

/// Level geometry is made of triangles and quads only.
pub const MAX_VERTICES: usize = 4;

/// A convex polygon in 3D space: ordered vertices with parallel per-vertex normals.
///
/// Vertices should be coplanar and in counter-clockwise winding order
/// when viewed from the front (the direction the normal points).
/// Holds 3 to [`MAX_VERTICES`] vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point3<f32>>,
    normals: Vec<Vector3<f32>>,
    plane: Plane3D,
    used_as_divider: bool,
}

impl Polygon {
    /// Creates a polygon with flat normals derived from its first three vertices.
    ///
    /// # Panics
    /// - Panics unless 3 to [`MAX_VERTICES`] vertices are provided.
    /// - Panics if the first three vertices are collinear.
    /// - Panics (debug builds only) if vertices are not coplanar.
    pub fn new(vertices: Vec<Point3<f32>>) -> Self {
        assert!(vertices.len() >= 3, "Polygon must have at least 3 vertices");
        assert!(vertices.len() <= MAX_VERTICES, "Polygon must have at most 4 vertices");
        let plane = Plane3D::from_three_points(vertices[0], vertices[1], vertices[2]);
        let normals = vec![plane.normal(); vertices.len()];
        Self::from_parts(vertices, normals, plane)
    }

    /// Creates a polygon with explicit per-vertex normals.
    ///
    /// # Panics
    /// Panics if the normal count differs from the vertex count, or unless
    /// 3 to [`MAX_VERTICES`] vertices are provided.
    pub fn with_normals(vertices: Vec<Point3<f32>>, normals: Vec<Vector3<f32>>) -> Self {
        assert!(vertices.len() >= 3, "Polygon must have at least 3 vertices");
        assert!(vertices.len() <= MAX_VERTICES, "Polygon must have at most 4 vertices");
        assert_eq!(
            vertices.len(),
            normals.len(),
            "Polygon needs one normal per vertex"
        );
        let plane = Plane3D::from_three_points(vertices[0], vertices[1], vertices[2]);
        Self::from_parts(vertices, normals, plane)
    }

    /// Builds a four-sided polygon, corners in winding order.
    pub fn quad(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>, d: Point3<f32>) -> Self {
        Self::new(vec![a, b, c, d])
    }

    /// Builds a fragment that lies on an already known plane.
    pub(crate) fn fragment(
        vertices: Vec<Point3<f32>>,
        normals: Vec<Vector3<f32>>,
        plane: Plane3D,
        used_as_divider: bool,
    ) -> Self {
        let mut polygon = Self::from_parts(vertices, normals, plane);
        polygon.used_as_divider = used_as_divider;
        polygon
    }

    fn from_parts(vertices: Vec<Point3<f32>>, normals: Vec<Vector3<f32>>, plane: Plane3D) -> Self {
        debug_assert!((3..=MAX_VERTICES).contains(&vertices.len()));
        debug_assert!(
            vertices
                .iter()
                .all(|v| plane.classify_point(v) == PlaneSide::OnPlane),
            "Polygon vertices must be coplanar"
        );
        Self {
            vertices,
            normals,
            plane,
            used_as_divider: false,
        }
    }

    /// Returns the vertices of the polygon.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    /// Returns the per-vertex normals, parallel to [`Polygon::vertices`].
    #[inline]
    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the polygon has no vertices (always false for valid polygons).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns the plane that this polygon lies on.
    #[inline]
    pub fn plane(&self) -> &Plane3D {
        &self.plane
    }

    /// Whether this polygon's plane already split an ancestor region.
    #[inline]
    pub fn is_used_as_divider(&self) -> bool {
        self.used_as_divider
    }

    #[inline]
    pub(crate) fn mark_used_as_divider(&mut self) {
        self.used_as_divider = true;
    }

    /// Overwrites every vertex normal with the unit plane normal.
    pub fn normalize_normals(&mut self) {
        let n = self.plane.normal();
        self.normals.iter_mut().for_each(|normal| *normal = n);
    }

    /// Classifies this polygon relative to a plane.
    #[inline]
    pub fn classify(&self, plane: &Plane3D) -> Classification {
        plane.classify_points(&self.vertices)
    }
}

/// Returns `true` when no polygon lies behind, or straddles, the plane of any
/// other polygon in the set: the set bounds a convex room.
pub fn is_convex_set(polygons: &[Polygon]) -> bool {
    polygons.iter().enumerate().all(|(i, divider)| {
        polygons.iter().enumerate().all(|(j, polygon)| {
            i == j
                || !matches!(
                    polygon.classify(divider.plane()),
                    Classification::Back | Classification::Intersects
                )
        })
    })
}
