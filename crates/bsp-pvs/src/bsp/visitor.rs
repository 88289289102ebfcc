//! Leaf traversal callbacks and per-frame draw bookkeeping for renderers.

use nalgebra::Point3;

use super::region::{Region, RegionId};
use super::tree::PartitionTree;

/// Receives leaves in traversal order.
pub trait LeafVisitor {
    fn visit_leaf(&mut self, leaf: &Region);
}

/// Records the ids of visited leaves.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<RegionId>,
}

impl CollectingVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_leaves(self) -> Vec<RegionId> {
        self.collected
    }

    pub fn leaves(&self) -> &[RegionId] {
        &self.collected
    }
}

impl LeafVisitor for CollectingVisitor {
    fn visit_leaf(&mut self, leaf: &Region) {
        self.collected.push(leaf.id());
    }
}

/// A visitor that calls a closure for each leaf.
pub struct FnVisitor<F>
where
    F: FnMut(&Region),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(&Region),
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> LeafVisitor for FnVisitor<F>
where
    F: FnMut(&Region),
{
    fn visit_leaf(&mut self, leaf: &Region) {
        (self.func)(leaf);
    }
}

/// Per-leaf "drawn" flags, so a leaf reached through several PVS lists is
/// drawn once per frame.
#[derive(Debug, Clone)]
pub struct DrawTracker {
    drawn: Vec<bool>,
}

impl DrawTracker {
    pub fn new(tree: &PartitionTree) -> Self {
        Self {
            drawn: vec![false; tree.node_count()],
        }
    }

    /// Clears every flag; call at the start of a frame.
    pub fn reset(&mut self) {
        self.drawn.fill(false);
    }

    #[inline]
    pub fn is_drawn(&self, id: RegionId) -> bool {
        self.drawn.get(id).copied().unwrap_or(false)
    }

    /// Flags `id` as drawn. Returns `false` if it already was.
    pub fn mark_drawn(&mut self, id: RegionId) -> bool {
        match self.drawn.get_mut(id) {
            Some(flag) if !*flag => {
                *flag = true;
                true
            }
            _ => false,
        }
    }

    /// Leaves to draw from `eye`: the leaf holding it, then its PVS, skipping
    /// anything already drawn this frame.
    pub fn draw_list(&mut self, tree: &PartitionTree, eye: &Point3<f32>) -> Vec<RegionId> {
        tree.potentially_visible(eye)
            .into_iter()
            .filter(|&id| self.mark_drawn(id))
            .collect()
    }
}

/// What one frame put on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub leaves_drawn: usize,
    pub triangles_drawn: usize,
    pub static_objects: usize,
}

impl FrameStats {
    pub fn record(&mut self, leaf: &Region) {
        self.leaves_drawn += 1;
        self.triangles_drawn += leaf.triangles().len();
        self.static_objects += leaf.placements().len();
    }

    pub fn from_leaves(tree: &PartitionTree, leaves: &[RegionId]) -> Self {
        let mut stats = Self::default();
        for &id in leaves {
            stats.record(tree.region(id));
        }
        stats
    }
}
