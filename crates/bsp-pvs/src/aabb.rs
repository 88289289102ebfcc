//! Axis-aligned bounding boxes of regions.

use nalgebra::Point3;

use crate::{Plane3D, PlaneSide, PLANE_EPSILON};

/// Corner index pairs forming the twelve box edges. Corner bits: x = 1, y = 2, z = 4.
const EDGES: [(usize, usize); 12] = [
    (0, 1), (2, 3), (4, 5), (6, 7),
    (0, 2), (1, 3), (4, 6), (5, 7),
    (0, 4), (1, 5), (2, 6), (3, 7),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub mins: Point3<f32>,
    pub maxs: Point3<f32>,
}

impl Aabb {
    #[inline]
    pub const fn new(mins: Point3<f32>, maxs: Point3<f32>) -> Self {
        Self { mins, maxs }
    }

    /// Smallest box holding every point, `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(Self::new(first, first), |bbox, p| Self {
            mins: bbox.mins.inf(p),
            maxs: bbox.maxs.sup(p),
        }))
    }

    /// Inclusive containment test, padded by [`PLANE_EPSILON`].
    #[inline]
    pub fn contains_point(&self, p: &Point3<f32>) -> bool {
        p.x >= self.mins.x - PLANE_EPSILON
            && p.x <= self.maxs.x + PLANE_EPSILON
            && p.y >= self.mins.y - PLANE_EPSILON
            && p.y <= self.maxs.y + PLANE_EPSILON
            && p.z >= self.mins.z - PLANE_EPSILON
            && p.z <= self.maxs.z + PLANE_EPSILON
    }

    #[inline]
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.mins, &self.maxs)
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        std::array::from_fn(|i| {
            Point3::new(
                if i & 1 == 0 { self.mins.x } else { self.maxs.x },
                if i & 2 == 0 { self.mins.y } else { self.maxs.y },
                if i & 4 == 0 { self.mins.z } else { self.maxs.z },
            )
        })
    }

    /// Points where `plane` cuts the box: edge crossings plus corners lying on
    /// the plane. Duplicates are possible where edges meet at a corner.
    pub fn plane_intersections(&self, plane: &Plane3D) -> Vec<Point3<f32>> {
        let corners = self.corners();
        let mut points: Vec<Point3<f32>> = corners
            .iter()
            .filter(|c| plane.classify_point(c) == PlaneSide::OnPlane)
            .copied()
            .collect();

        for (a, b) in EDGES {
            let (start, end) = (&corners[a], &corners[b]);
            let crosses = matches!(
                (plane.classify_point(start), plane.classify_point(end)),
                (PlaneSide::Front, PlaneSide::Back) | (PlaneSide::Back, PlaneSide::Front)
            );
            if crosses {
                if let Some((_, point)) = plane.intersect_segment(start, end) {
                    points.push(point);
                }
            }
        }

        points
    }
}
