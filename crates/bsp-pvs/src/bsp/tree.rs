//! Partition tree container and construction.

use log::{debug, info, warn};
use nalgebra::Point3;

use crate::pvs::PairMatrix;
use crate::{
    clip, is_convex_set, tessellate, Aabb, Classification, GeometryStore, Plane3D, PlaneSide,
    Polygon, TreeConfig,
};

use super::region::{Region, RegionId, StaticObjectPlacement};
use super::selector::{BalancedSelector, PartitionSelector};
use super::visitor::LeafVisitor;

/// Counters gathered while building a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Polygons handed to the builder.
    pub input_polygons: usize,
    /// Polygons cut in two by a partition plane.
    pub splits: usize,
    /// Pieces beyond two per split, from sides cut into a quad and a triangle.
    pub extra_pieces: usize,
    /// Regions created, leaves included.
    pub nodes: usize,
    pub leaves: usize,
    /// Depth limit the tree was built with.
    pub max_depth: usize,
    /// Deepest leaf.
    pub depth_reached: usize,
    /// Fewest polygons found in a single leaf.
    pub min_leaf_polygons: Option<usize>,
    /// Leaves that closed a convex room before hitting the depth limit.
    pub convex_rooms: usize,
}

impl BuildStats {
    /// Every split turns one polygon into two, or more when a side was too
    /// large for a single quad.
    #[inline]
    pub fn polygons_after_splits(&self) -> usize {
        self.input_polygons + self.splits + self.extra_pieces
    }

    pub fn log_summary(&self) {
        info!("Total polygons in tree before splits: {}", self.input_polygons);
        info!("Polygons split: {}", self.splits);
        info!("Total polygons in tree after splits: {}", self.polygons_after_splits());
        info!("Number of leaves in tree: {}", self.leaves);
        info!("Number of nodes in tree: {}", self.nodes);
        info!(
            "Minimum number of polygons in a leaf: {}",
            self.min_leaf_polygons.unwrap_or(0)
        );
        info!("Maximum depth allowed: {}", self.max_depth);
        info!("Depth reached: {}", self.depth_reached);
        info!("Convex rooms: {}", self.convex_rooms);
    }
}

/// A partition tree over static level geometry.
///
/// Regions live in an arena indexed by [`RegionId`]. Leaves are convex rooms
/// (or whatever was left at the depth limit) and carry the data a renderer
/// needs: triangles, static objects and the potentially visible set.
///
/// ```ignore
/// use bsp_pvs::{GeometryStore, PartitionTree, TreeConfig};
///
/// let config = TreeConfig::default();
/// let store = GeometryStore::load("level.geo", config.scale)?;
/// let mut tree = PartitionTree::from_geometry(store, &config);
/// tree.tessellate();
/// tree.build_pvs("level.pvs");
/// ```
#[derive(Debug, Clone)]
pub struct PartitionTree {
    pub(crate) regions: Vec<Region>,
    pub(crate) leaves: Vec<RegionId>,
    /// Leaf pairs known to see each other.
    pub(crate) visible: PairMatrix,
    /// Leaf pairs already tested, visible or not.
    pub(crate) checked: PairMatrix,
    stats: BuildStats,
    config: TreeConfig,
    tessellated: bool,
}

impl PartitionTree {
    /// Builds a tree with the default [`BalancedSelector`].
    pub fn build(polygons: Vec<Polygon>, config: &TreeConfig) -> Self {
        Self::build_with(polygons, config, &BalancedSelector::default())
    }

    /// Builds a tree choosing dividers with `selector`.
    pub fn build_with<S: PartitionSelector + ?Sized>(
        polygons: Vec<Polygon>,
        config: &TreeConfig,
        selector: &S,
    ) -> Self {
        info!(
            "Building partition tree from {} polygons (max depth {})",
            polygons.len(),
            config.max_depth
        );

        let mut ctx = BuildContext {
            regions: Vec::new(),
            leaves: Vec::new(),
            stats: BuildStats {
                input_polygons: polygons.len(),
                max_depth: config.max_depth,
                ..BuildStats::default()
            },
            max_depth: config.max_depth,
            selector,
        };
        let root = ctx.push_region(0, None, polygons);
        ctx.build_region(root);
        ctx.stats.nodes = ctx.regions.len();

        let node_count = ctx.regions.len();
        let tree = Self {
            regions: ctx.regions,
            leaves: ctx.leaves,
            visible: PairMatrix::new(node_count),
            checked: PairMatrix::new(node_count),
            stats: ctx.stats,
            config: config.clone(),
            tessellated: false,
        };
        tree.stats.log_summary();
        tree
    }

    /// Builds a tree from the whole polygon soup of `store`.
    pub fn from_geometry(store: GeometryStore, config: &TreeConfig) -> Self {
        Self::build(store.into_polygons(), config)
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// # Panics
    /// Panics if `id` is not a region of this tree.
    #[inline]
    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id]
    }

    #[inline]
    pub fn root(&self) -> &Region {
        &self.regions[0]
    }

    /// Ids of every leaf, in the order they were finalized.
    #[inline]
    pub fn leaves(&self) -> &[RegionId] {
        &self.leaves
    }

    pub fn leaf_regions(&self) -> impl Iterator<Item = &Region> {
        self.leaves.iter().map(|&id| &self.regions[id])
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Whether leaves `a` and `b` are in each other's PVS.
    #[inline]
    pub fn is_visible(&self, a: RegionId, b: RegionId) -> bool {
        self.visible.get(a, b)
    }

    /// Whether the pair `(a, b)` has been tested by the tracer.
    #[inline]
    pub fn is_checked(&self, a: RegionId, b: RegionId) -> bool {
        self.checked.get(a, b)
    }

    #[inline]
    pub fn is_tessellated(&self) -> bool {
        self.tessellated
    }

    /// Replaces every leaf's polygons with its triangle buffer. Repeated calls
    /// do nothing.
    ///
    /// # Panics
    /// Panics if a leaf holds a polygon that is neither a triangle nor a quad.
    pub fn tessellate(&mut self) {
        if self.tessellated {
            return;
        }
        let mut triangles = 0;
        for &id in &self.leaves {
            let region = &mut self.regions[id];
            region.triangles = tessellate::tessellate(&region.polygons);
            region.polygons = Vec::new();
            triangles += region.triangles.len();
        }
        self.tessellated = true;
        debug!("Tessellated {} leaves into {triangles} triangles", self.leaves.len());
    }

    /// Leaf containing `point`. Points on a partition plane go to the back.
    pub fn leaf_at(&self, point: &Point3<f32>) -> RegionId {
        let mut id = 0;
        while let (Some((front, back)), Some(plane)) =
            (self.regions[id].children(), self.regions[id].plane())
        {
            id = if plane.distance_from_point(point) > 0.0 {
                front
            } else {
                back
            };
        }
        id
    }

    /// The leaf containing `point` followed by its PVS.
    pub fn potentially_visible(&self, point: &Point3<f32>) -> Vec<RegionId> {
        let leaf = self.leaf_at(point);
        std::iter::once(leaf)
            .chain(self.regions[leaf].pvs.iter().copied())
            .collect()
    }

    /// Attaches a static object to the leaf containing `anchor`.
    ///
    /// Returns `false` when that leaf already holds the same mesh id.
    pub fn insert_static_object(
        &mut self,
        placement: StaticObjectPlacement,
        anchor: &Point3<f32>,
    ) -> bool {
        let leaf = self.leaf_at(anchor);
        self.regions[leaf].attach(placement)
    }

    /// Visits leaves nearest to `eye` first.
    pub fn traverse_front_to_back<V: LeafVisitor>(&self, eye: Point3<f32>, visitor: &mut V) {
        if !self.regions.is_empty() {
            traverse_front_to_back_node(self, 0, &eye, visitor);
        }
    }

    /// Visits leaves farthest from `eye` first.
    pub fn traverse_back_to_front<V: LeafVisitor>(&self, eye: Point3<f32>, visitor: &mut V) {
        if !self.regions.is_empty() {
            traverse_back_to_front_node(self, 0, &eye, visitor);
        }
    }
}

/// Mutable state threaded through the recursive build.
struct BuildContext<'s, S: ?Sized> {
    regions: Vec<Region>,
    leaves: Vec<RegionId>,
    stats: BuildStats,
    max_depth: usize,
    selector: &'s S,
}

impl<S: PartitionSelector + ?Sized> BuildContext<'_, S> {
    fn push_region(
        &mut self,
        depth: usize,
        parent: Option<RegionId>,
        polygons: Vec<Polygon>,
    ) -> RegionId {
        let id = self.regions.len();
        self.regions.push(Region::new(id, depth, parent, polygons));
        id
    }

    fn build_region(&mut self, id: RegionId) {
        let mut polygons = std::mem::take(&mut self.regions[id].polygons);
        let depth = self.regions[id].depth();
        self.regions[id].bbox = Aabb::from_points(polygons.iter().flat_map(|p| p.vertices()));

        let convex = is_convex_set(&polygons);
        if convex || depth >= self.max_depth {
            self.finalize_leaf(id, polygons, convex);
            return;
        }

        let Some(divider) = self.selector.select(&polygons) else {
            warn!(
                "Region {id} at depth {depth} has no viable divider, keeping its {} polygons as a leaf",
                polygons.len()
            );
            self.finalize_leaf(id, polygons, false);
            return;
        };
        polygons[divider].mark_used_as_divider();
        let plane = polygons[divider].plane().clone();

        let (front, back) = self.partition(&plane, polygons);
        let has_front = !front.is_empty();
        let has_back = !back.is_empty();

        let front_id = self.push_region(depth + 1, Some(id), front);
        let back_id = self.push_region(depth + 1, Some(id), back);
        self.regions[id].split(plane, front_id, back_id);

        if has_front {
            self.build_region(front_id);
        }
        if has_back {
            self.build_region(back_id);
        }
    }

    /// Distributes polygons to the sides of `plane`. Coincident polygons go to
    /// the front and are never cut.
    fn partition(&mut self, plane: &Plane3D, polygons: Vec<Polygon>) -> (Vec<Polygon>, Vec<Polygon>) {
        let mut front = Vec::new();
        let mut back = Vec::new();

        for polygon in polygons {
            match clip::classify(plane, &polygon) {
                Classification::Front | Classification::Coincident => front.push(polygon),
                Classification::Back => back.push(polygon),
                Classification::Intersects => {
                    let (f, b) = clip::split_polygon(plane, &polygon);
                    self.stats.splits += 1;
                    self.stats.extra_pieces += f.len() + b.len() - 2;
                    front.extend(f);
                    back.extend(b);
                }
            }
        }

        (front, back)
    }

    fn finalize_leaf(&mut self, id: RegionId, polygons: Vec<Polygon>, convex: bool) {
        let region = &mut self.regions[id];
        self.stats.leaves += 1;
        self.stats.convex_rooms += usize::from(convex);
        self.stats.depth_reached = self.stats.depth_reached.max(region.depth());
        self.stats.min_leaf_polygons = Some(
            self.stats
                .min_leaf_polygons
                .map_or(polygons.len(), |m| m.min(polygons.len())),
        );
        region.polygons = polygons;
        region.convex = convex;
        self.leaves.push(id);
    }
}

fn eye_in_front(tree: &PartitionTree, id: RegionId, eye: &Point3<f32>) -> bool {
    tree.regions[id]
        .plane()
        .is_some_and(|plane| plane.classify_point(eye) != PlaneSide::Back)
}

/// Traverses a subtree front-to-back.
fn traverse_front_to_back_node<V: LeafVisitor>(
    tree: &PartitionTree,
    id: RegionId,
    eye: &Point3<f32>,
    visitor: &mut V,
) {
    let region = &tree.regions[id];
    match region.children() {
        None => visitor.visit_leaf(region),
        Some((front, back)) => {
            let (near, far) = if eye_in_front(tree, id, eye) {
                (front, back)
            } else {
                (back, front)
            };
            traverse_front_to_back_node(tree, near, eye, visitor);
            traverse_front_to_back_node(tree, far, eye, visitor);
        }
    }
}

/// Traverses a subtree back-to-front.
fn traverse_back_to_front_node<V: LeafVisitor>(
    tree: &PartitionTree,
    id: RegionId,
    eye: &Point3<f32>,
    visitor: &mut V,
) {
    let region = &tree.regions[id];
    match region.children() {
        None => visitor.visit_leaf(region),
        Some((front, back)) => {
            let (near, far) = if eye_in_front(tree, id, eye) {
                (front, back)
            } else {
                (back, front)
            };
            traverse_back_to_front_node(tree, far, eye, visitor);
            traverse_back_to_front_node(tree, near, eye, visitor);
        }
    }
}
