//! Sample points laid on partition planes and handed down to the leaves.

use log::debug;
use nalgebra::Point3;

use crate::bsp::RegionId;
use crate::{Aabb, PartitionTree, Plane3D, PLANE_EPSILON};

/// Regular `u × v` grid on `plane`, spanning the UV extents of the plane's
/// cut through `bbox`. Empty when the cut is degenerate.
pub fn plane_grid(plane: &Plane3D, bbox: &Aabb, (nu, nv): (usize, usize)) -> Vec<Point3<f32>> {
    let origin = plane.origin();
    let (u_axis, v_axis) = plane.basis();

    let extents = bbox
        .plane_intersections(plane)
        .iter()
        .map(|p| {
            let d = p - origin;
            (d.dot(&u_axis), d.dot(&v_axis))
        })
        .fold(None, |acc: Option<(f32, f32, f32, f32)>, (u, v)| {
            Some(match acc {
                None => (u, u, v, v),
                Some((min_u, max_u, min_v, max_v)) => {
                    (min_u.min(u), max_u.max(u), min_v.min(v), max_v.max(v))
                }
            })
        });

    let Some((min_u, max_u, min_v, max_v)) = extents else {
        debug!("Plane {plane:?} misses its region's bounds, no sample points");
        return Vec::new();
    };
    if nu == 0 || nv == 0 || max_u - min_u <= PLANE_EPSILON || max_v - min_v <= PLANE_EPSILON {
        debug!("Degenerate sample grid on plane {plane:?}");
        return Vec::new();
    }

    let step_u = (max_u - min_u) / nu as f32;
    let step_v = (max_v - min_v) / nv as f32;

    (0..nu)
        .flat_map(move |i| {
            let u = min_u + i as f32 * step_u;
            (0..nv).map(move |j| {
                let v = min_v + j as f32 * step_v;
                origin + u_axis * u + v_axis * v
            })
        })
        .collect()
}

impl PartitionTree {
    /// Fills every leaf's sample set, starting from `external` points at the
    /// root. Each partition plane contributes a grid to both of its children.
    pub fn distribute_sample_points(&mut self, external: Vec<Point3<f32>>) {
        if self.regions.is_empty() {
            return;
        }
        let grid = self.config().sample_grid;
        self.distribute_region(0, external, grid);

        let total: usize = self.leaf_regions().map(|r| r.sample_points().len()).sum();
        debug!("Distributed {total} sample points over {} leaves", self.leaf_count());
    }

    fn distribute_region(&mut self, id: RegionId, mut points: Vec<Point3<f32>>, grid: (usize, usize)) {
        let region = &self.regions[id];
        match region.bbox() {
            Some(bbox) => points.retain(|p| bbox.contains_point(p)),
            None => points.clear(),
        }
        region.prune_points_on_geometry(&mut points);

        let (Some((front, back)), Some(plane), Some(bbox)) =
            (region.children(), region.plane(), region.bbox())
        else {
            self.regions[id].sample_points = points;
            return;
        };

        let planar = plane_grid(plane, bbox, grid);
        let mut front_points = planar.clone();
        let mut back_points = planar;
        for p in points {
            if plane.distance_from_point(&p) > 0.0 {
                front_points.push(p);
            } else {
                back_points.push(p);
            }
        }

        self.distribute_region(back, back_points, grid);
        self.distribute_region(front, front_points, grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn make_bbox() -> Aabb {
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(20.0, 10.0, 10.0))
    }

    #[test]
    fn grid_lies_on_plane_inside_bounds() {
        let plane = Plane3D::new(Vector3::x(), 10.0);
        let bbox = make_bbox();
        let points = plane_grid(&plane, &bbox, (20, 20));
        assert_eq!(points.len(), 400);
        for p in &points {
            assert!((p.x - 10.0).abs() < 1e-4);
            assert!(bbox.contains_point(p));
        }
    }

    #[test]
    fn grid_steps_are_uniform() {
        let plane = Plane3D::new(-Vector3::x(), -10.0);
        let points = plane_grid(&plane, &make_bbox(), (20, 20));
        // 10 units split in 20 steps: every coordinate is a multiple of 0.5
        for p in &points {
            assert!((p.y * 2.0 - (p.y * 2.0).round()).abs() < 1e-4);
            assert!((p.z * 2.0 - (p.z * 2.0).round()).abs() < 1e-4);
        }
        assert!(points.contains(&Point3::new(10.0, 5.0, 5.0)));
    }

    #[test]
    fn plane_outside_bounds_gives_no_points() {
        let plane = Plane3D::new(Vector3::x(), 50.0);
        assert!(plane_grid(&plane, &make_bbox(), (20, 20)).is_empty());
    }

    #[test]
    fn zero_resolution_gives_no_points() {
        let plane = Plane3D::new(Vector3::x(), 10.0);
        assert!(plane_grid(&plane, &make_bbox(), (0, 20)).is_empty());
    }
}
