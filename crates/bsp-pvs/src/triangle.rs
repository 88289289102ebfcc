//! Triangles of a tessellated leaf, shared by rendering and segment tests.

use nalgebra::{Point3, Vector3};

use crate::PLANE_EPSILON;

/// Segment hits closer than this to either endpoint (in level units) are ignored,
/// so sample points resting on a surface do not occlude themselves.
pub const SEGMENT_END_TOLERANCE: f32 = 1e-2;

const BARYCENTRIC_EPSILON: f32 = 1e-4;

/// A triangle in 3D space with one normal per vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    vertices: [Point3<f32>; 3],
    normals: [Vector3<f32>; 3],
}

impl Triangle {
    /// Creates a flat-shaded triangle from three points.
    ///
    /// The winding order determines the normal direction via the right-hand rule:
    /// normal = (b - a) × (c - a)
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        let n = (b - a).cross(&(c - a)).try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
        Self {
            vertices: [a, b, c],
            normals: [n; 3],
        }
    }

    /// Creates a triangle with explicit per-vertex normals.
    pub fn with_normals(vertices: [Point3<f32>; 3], normals: [Vector3<f32>; 3]) -> Self {
        Self { vertices, normals }
    }

    /// Returns the three vertices of the triangle.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f32>; 3] {
        &self.vertices
    }

    /// Returns the three vertex normals.
    #[inline]
    pub fn normals(&self) -> &[Vector3<f32>; 3] {
        &self.normals
    }

    /// Computes the (unnormalized) face normal of the triangle.
    pub fn normal(&self) -> Vector3<f32> {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Whether `point` lies on the triangle surface, edges included.
    pub fn contains_point(&self, point: &Point3<f32>) -> bool {
        let normal = self.normal();
        let len = normal.norm();
        if len <= f32::EPSILON {
            return false;
        }
        let [a, b, c] = &self.vertices;
        if (normal / len).dot(&(point - a)).abs() > PLANE_EPSILON {
            return false;
        }

        let e1 = b - a;
        let e2 = c - a;
        let ep = point - a;
        let d00 = e1.dot(&e1);
        let d01 = e1.dot(&e2);
        let d11 = e2.dot(&e2);
        let d20 = ep.dot(&e1);
        let d21 = ep.dot(&e2);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f32::EPSILON {
            return false;
        }

        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        let u = 1.0 - v - w;
        u >= -BARYCENTRIC_EPSILON && v >= -BARYCENTRIC_EPSILON && w >= -BARYCENTRIC_EPSILON
    }

    /// Tests whether the segment `start → end` passes through the triangle
    /// (Möller–Trumbore). Segments lying in the triangle's plane never hit, and
    /// hits within [`SEGMENT_END_TOLERANCE`] of either endpoint are ignored.
    pub fn intersects_segment(&self, start: &Point3<f32>, end: &Point3<f32>) -> bool {
        let direction = end - start;
        let length = direction.norm();
        if length <= SEGMENT_END_TOLERANCE {
            return false;
        }

        let [a, b, c] = &self.vertices;
        let e1 = b - a;
        let e2 = c - a;
        let h = direction.cross(&e2);
        let det = e1.dot(&h);
        if det.abs() < 1e-8 {
            return false;
        }

        let inv_det = 1.0 / det;
        let s = start - a;
        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(&e1);
        let v = inv_det * direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = inv_det * e2.dot(&q);
        let margin = SEGMENT_END_TOLERANCE / length;
        t > margin && t < 1.0 - margin
    }
}
