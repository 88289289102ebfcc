//! Interactive walk through the partition tree's regions.

use bsp_pvs::{PartitionTree, Region, RegionId};
use macroquad::prelude::*;

use crate::{draw_region_bounds, draw_sample_points, draw_triangles, region_color};

/// Direction taken at each region on the way down from the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Front,
    Back,
}

/// Keyboard navigation over the region arena. The selected region's bounds
/// are outlined; a selected leaf also shows its sample points and PVS.
#[derive(Debug, Default)]
pub struct RegionNavigator {
    path: Vec<Direction>,
}

impl RegionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> &[Direction] {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Id of the selected region.
    pub fn current(&self, tree: &PartitionTree) -> RegionId {
        let mut id = tree.root().id();
        for dir in &self.path {
            let region = tree.region(id);
            let next = match dir {
                Direction::Front => region.front(),
                Direction::Back => region.back(),
            };
            match next {
                Some(child) => id = child,
                None => break,
            }
        }
        id
    }

    fn descend(&mut self, tree: &PartitionTree, dir: Direction) -> bool {
        if tree.region(self.current(tree)).is_leaf() {
            return false;
        }
        self.path.push(dir);
        true
    }

    pub fn go_front(&mut self, tree: &PartitionTree) -> bool {
        self.descend(tree, Direction::Front)
    }

    pub fn go_back(&mut self, tree: &PartitionTree) -> bool {
        self.descend(tree, Direction::Back)
    }

    pub fn go_parent(&mut self) -> bool {
        self.path.pop().is_some()
    }

    pub fn go_root(&mut self) {
        self.path.clear();
    }

    /// F/B descend, P goes up, R returns to the root.
    pub fn update(&mut self, tree: &PartitionTree) -> bool {
        let mut changed = false;
        if is_key_pressed(KeyCode::F) {
            changed |= self.go_front(tree);
        }
        if is_key_pressed(KeyCode::B) {
            changed |= self.go_back(tree);
        }
        if is_key_pressed(KeyCode::P) {
            changed |= self.go_parent();
        }
        if is_key_pressed(KeyCode::R) && !self.path.is_empty() {
            self.go_root();
            changed = true;
        }
        changed
    }

    /// Draws the selection on top of the scene.
    pub fn render(&self, tree: &PartitionTree) {
        let region = tree.region(self.current(tree));
        draw_region_bounds(region, YELLOW);
        if region.is_leaf() {
            draw_sample_points(region, WHITE);
            for &id in region.pvs() {
                draw_region_bounds(tree.region(id), region_color(id));
            }
        }
    }

    /// Draws only the leaves below the selected region.
    pub fn render_subtree(&self, tree: &PartitionTree) {
        let mut stack = vec![self.current(tree)];
        while let Some(id) = stack.pop() {
            let region = tree.region(id);
            match region.children() {
                Some((front, back)) => stack.extend([back, front]),
                None => draw_triangles(region.triangles(), region_color(id)),
            }
        }
    }

    pub fn draw_ui(&self, tree: &PartitionTree, y_offset: f32) {
        let region = tree.region(self.current(tree));

        let path_str = if self.path.is_empty() {
            "root".to_string()
        } else {
            self.path
                .iter()
                .map(|d| match d {
                    Direction::Front => "F",
                    Direction::Back => "B",
                })
                .collect::<Vec<_>>()
                .join(" -> ")
        };

        draw_text(
            &format!("Region {} (depth {}) path: {path_str}", region.id(), region.depth()),
            10.0,
            y_offset,
            18.0,
            YELLOW,
        );
        draw_text(&describe(region), 10.0, y_offset + 20.0, 18.0, if region.is_leaf() { ORANGE } else { GREEN });
        draw_text("[F]ront | [B]ack | [P]arent | [R]oot", 10.0, y_offset + 40.0, 16.0, DARKGRAY);
    }
}

fn describe(region: &Region) -> String {
    if region.is_leaf() {
        format!(
            "leaf: {} triangles, {} samples, sees {:?}",
            region.triangles().len(),
            region.sample_points().len(),
            region.pvs()
        )
    } else {
        format!("internal: {:?}", region.plane())
    }
}
