//! Partition tree regions.

use nalgebra::{Matrix4, Point3};

use crate::{Aabb, Plane3D, Polygon, Triangle};

/// Index of a region inside its tree's arena. Ids are handed out in creation
/// order, so the root is always `0`.
pub type RegionId = usize;

/// Static mesh attached to the leaf that contains its anchor point.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticObjectPlacement {
    pub mesh_id: u32,
    pub transform: Matrix4<f32>,
}

impl StaticObjectPlacement {
    pub fn new(mesh_id: u32, transform: Matrix4<f32>) -> Self {
        Self { mesh_id, transform }
    }
}

/// A node of the partition tree.
///
/// Internal regions carry a partition plane and a `(front, back)` child pair
/// and hold no geometry once their children are built. Leaves keep their
/// polygons until tessellation, then only the triangle buffer, along with the
/// sample points, PVS and static objects filled in after the build.
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    depth: usize,
    parent: Option<RegionId>,
    children: Option<(RegionId, RegionId)>,
    plane: Option<Plane3D>,
    pub(crate) polygons: Vec<Polygon>,
    pub(crate) bbox: Option<Aabb>,
    pub(crate) convex: bool,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) placements: Vec<StaticObjectPlacement>,
    pub(crate) sample_points: Vec<Point3<f32>>,
    pub(crate) pvs: Vec<RegionId>,
    pub(crate) connected: Vec<RegionId>,
}

impl Region {
    pub(crate) fn new(
        id: RegionId,
        depth: usize,
        parent: Option<RegionId>,
        polygons: Vec<Polygon>,
    ) -> Self {
        Self {
            id,
            depth,
            parent,
            children: None,
            plane: None,
            polygons,
            bbox: None,
            convex: false,
            triangles: Vec::new(),
            placements: Vec::new(),
            sample_points: Vec::new(),
            pvs: Vec::new(),
            connected: Vec::new(),
        }
    }

    pub(crate) fn split(&mut self, plane: Plane3D, front: RegionId, back: RegionId) {
        debug_assert!(self.polygons.is_empty(), "Internal regions keep no geometry");
        self.plane = Some(plane);
        self.children = Some((front, back));
    }

    #[inline]
    pub fn id(&self) -> RegionId {
        self.id
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn parent(&self) -> Option<RegionId> {
        self.parent
    }

    /// `(front, back)` children, `None` at leaves.
    #[inline]
    pub fn children(&self) -> Option<(RegionId, RegionId)> {
        self.children
    }

    #[inline]
    pub fn front(&self) -> Option<RegionId> {
        self.children.map(|(front, _)| front)
    }

    #[inline]
    pub fn back(&self) -> Option<RegionId> {
        self.children.map(|(_, back)| back)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Partition plane of an internal region.
    #[inline]
    pub fn plane(&self) -> Option<&Plane3D> {
        self.plane.as_ref()
    }

    /// Polygons of a leaf that has not been tessellated yet.
    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Bounds of the geometry the region was built from.
    #[inline]
    pub fn bbox(&self) -> Option<&Aabb> {
        self.bbox.as_ref()
    }

    /// Whether this leaf bounds a convex room, as opposed to being cut off by
    /// the depth limit.
    #[inline]
    pub fn is_convex(&self) -> bool {
        self.convex
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn placements(&self) -> &[StaticObjectPlacement] {
        &self.placements
    }

    #[inline]
    pub fn sample_points(&self) -> &[Point3<f32>] {
        &self.sample_points
    }

    /// Leaves potentially visible from this one.
    #[inline]
    pub fn pvs(&self) -> &[RegionId] {
        &self.pvs
    }

    /// Leaves found sharing a sample point with this one.
    #[inline]
    pub fn connected_leaves(&self) -> &[RegionId] {
        &self.connected
    }

    /// Attaches a placement unless one with the same mesh id is already here.
    pub(crate) fn attach(&mut self, placement: StaticObjectPlacement) -> bool {
        if self
            .placements
            .iter()
            .any(|p| p.mesh_id == placement.mesh_id)
        {
            return false;
        }
        self.placements.push(placement);
        true
    }

    /// Drops every point lying on one of this region's triangles.
    pub(crate) fn prune_points_on_geometry(&self, points: &mut Vec<Point3<f32>>) {
        if self.triangles.is_empty() {
            return;
        }
        points.retain(|p| !self.triangles.iter().any(|t| t.contains_point(p)));
    }
}
