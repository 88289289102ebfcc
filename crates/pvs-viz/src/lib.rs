//! Drawing helpers and demo scenes for the PVS viewer.

use std::hash::{Hash, Hasher};

use bsp_pvs::bsp::{FrameStats, LeafVisitor};
use bsp_pvs::{Polygon, Region, RegionId, Triangle};
use macroquad::models::{draw_mesh, Mesh, Vertex};
use macroquad::prelude::*;
use nalgebra::{Point3, Vector3};

pub mod navigator;
pub use navigator::RegionNavigator;

/// Deterministic color per region, so a leaf keeps its color across frames.
pub fn region_color(id: RegionId) -> Color {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    // Keep colors away from black
    let r = (((hash >> 16) & 0xFF) as u8).max(40);
    let g = (((hash >> 8) & 0xFF) as u8).max(40);
    let b = ((hash & 0xFF) as u8).max(40);

    Color::from_rgba(r, g, b, 255)
}

/// Darkens `color` by how far `normal` faces away from a fixed light.
fn shade(color: Color, normal: &Vector3<f32>) -> Color {
    let light = Vector3::new(0.3, 0.8, 0.5).normalize();
    let intensity = 0.45 + 0.55 * normal.dot(&light).abs();
    Color::new(color.r * intensity, color.g * intensity, color.b * intensity, color.a)
}

fn vertex(p: &Point3<f32>, color: Color) -> Vertex {
    Vertex::new2(vec3(p.x, p.y, p.z), vec2(0.0, 0.0), color)
}

/// Draws a triangle buffer in one mesh per `u16` index range.
pub fn draw_triangles(triangles: &[Triangle], color: Color) {
    // 3 vertices per triangle, indices must fit in u16
    for chunk in triangles.chunks(u16::MAX as usize / 3) {
        let vertices: Vec<Vertex> = chunk
            .iter()
            .flat_map(|t| {
                let c = shade(color, &t.normals()[0]);
                t.vertices().iter().map(move |p| vertex(p, c))
            })
            .collect();
        let indices: Vec<u16> = (0..vertices.len() as u16).collect();

        draw_mesh(&Mesh {
            vertices,
            indices,
            texture: None,
        });
    }
}

/// Draws a raw polygon as a fan, for geometry that hasn't been tessellated.
pub fn draw_polygon(polygon: &Polygon, color: Color) {
    let verts = polygon.vertices();
    let c = shade(color, &polygon.plane().normal());
    let vertices: Vec<Vertex> = verts.iter().map(|p| vertex(p, c)).collect();

    let mut indices: Vec<u16> = Vec::with_capacity((verts.len() - 2) * 3);
    for i in 1..verts.len() - 1 {
        indices.extend([0, i as u16, (i + 1) as u16]);
    }

    draw_mesh(&Mesh {
        vertices,
        indices,
        texture: None,
    });
}

/// Draws a region's sample points as small cubes.
pub fn draw_sample_points(region: &Region, color: Color) {
    for p in region.sample_points() {
        draw_cube(vec3(p.x, p.y, p.z), vec3(0.08, 0.08, 0.08), None, color);
    }
}

/// Outlines a region's bounding box.
pub fn draw_region_bounds(region: &Region, color: Color) {
    if let Some(bbox) = region.bbox() {
        let center = bbox.center();
        let size = bbox.maxs - bbox.mins;
        draw_cube_wires(vec3(center.x, center.y, center.z), vec3(size.x, size.y, size.z), color);
    }
}

/// Draws every visited leaf and counts what went on screen.
#[derive(Debug, Default)]
pub struct LeafRenderer {
    pub stats: FrameStats,
}

impl LeafRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeafVisitor for LeafRenderer {
    fn visit_leaf(&mut self, leaf: &Region) {
        draw_triangles(leaf.triangles(), region_color(leaf.id()));
        self.stats.record(leaf);
    }
}

fn rect(corners: [[f32; 3]; 4]) -> Polygon {
    Polygon::quad(
        Point3::from(corners[0]),
        Point3::from(corners[1]),
        Point3::from(corners[2]),
        Point3::from(corners[3]),
    )
}

/// Wall in the plane `x`, spanning `y` and `z`.
fn x_wall(x: f32, y: (f32, f32), z: (f32, f32), facing_positive: bool) -> Polygon {
    if facing_positive {
        rect([[x, y.0, z.0], [x, y.1, z.0], [x, y.1, z.1], [x, y.0, z.1]])
    } else {
        rect([[x, y.0, z.1], [x, y.1, z.1], [x, y.1, z.0], [x, y.0, z.0]])
    }
}

fn y_wall(y: f32, x: (f32, f32), z: (f32, f32), facing_positive: bool) -> Polygon {
    if facing_positive {
        rect([[x.0, y, z.0], [x.0, y, z.1], [x.1, y, z.1], [x.1, y, z.0]])
    } else {
        rect([[x.1, y, z.0], [x.1, y, z.1], [x.0, y, z.1], [x.0, y, z.0]])
    }
}

fn z_wall(z: f32, x: (f32, f32), y: (f32, f32), facing_positive: bool) -> Polygon {
    if facing_positive {
        rect([[x.0, y.0, z], [x.1, y.0, z], [x.1, y.1, z], [x.0, y.1, z]])
    } else {
        rect([[x.0, y.1, z], [x.1, y.1, z], [x.1, y.0, z], [x.0, y.0, z]])
    }
}

/// Four wall pieces around a doorway in the plane `x`.
fn door_frame(x: f32, size: f32, door: (f32, f32), facing_positive: bool) -> Vec<Polygon> {
    let full = (0.0, size);
    vec![
        x_wall(x, (0.0, door.0), full, facing_positive),
        x_wall(x, (door.1, size), full, facing_positive),
        x_wall(x, door, (0.0, door.0), facing_positive),
        x_wall(x, door, (door.1, size), facing_positive),
    ]
}

/// A row of `rooms` cubic rooms of edge `size` along +X, joined by short
/// corridors. Doorways alternate height so not every room sees every other.
pub fn generate_rooms_scene(rooms: usize, size: f32) -> Vec<Polygon> {
    let corridor = size * 0.5;
    let door = |i: usize| {
        let low = if i % 2 == 0 { 0.4 } else { 0.1 };
        (size * low, size * (low + 0.2))
    };

    let mut polygons = Vec::new();
    for i in 0..rooms {
        let x0 = i as f32 * (size + corridor);
        let x1 = x0 + size;
        let span = (x0, x1);
        let full = (0.0, size);

        polygons.push(y_wall(0.0, span, full, true));
        polygons.push(y_wall(size, span, full, false));
        polygons.push(z_wall(0.0, span, full, true));
        polygons.push(z_wall(size, span, full, false));

        match i {
            0 => polygons.push(x_wall(x0, full, full, true)),
            _ => polygons.extend(door_frame(x0, size, door(i - 1), true)),
        }
        if i + 1 == rooms {
            polygons.push(x_wall(x1, full, full, false));
            continue;
        }

        // Corridor to the next room
        let d = door(i);
        polygons.extend(door_frame(x1, size, d, false));
        let span = (x1, x1 + corridor);
        polygons.push(y_wall(d.0, span, d, true));
        polygons.push(y_wall(d.1, span, d, false));
        polygons.push(z_wall(d.0, span, d, true));
        polygons.push(z_wall(d.1, span, d, false));
    }
    polygons
}

/// Orbit camera with a movable target, so the eye can walk between leaves.
pub struct ViewerCamera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    /// Target movement per frame.
    pub move_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl ViewerCamera {
    pub fn new(distance: f32, yaw: f32, pitch: f32) -> Self {
        Self {
            distance,
            yaw,
            pitch,
            target: vec3(0.0, 0.0, 0.0),
            move_speed: 0.2,
            zoom_speed: 2.0,
            min_distance: 0.5,
            max_distance: 200.0,
        }
    }

    pub fn with_zoom(mut self, speed: f32, min: f32, max: f32) -> Self {
        self.zoom_speed = speed;
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Mouse drag orbits, scroll zooms, WASD/QE moves the target.
    pub fn update(&mut self) {
        if is_mouse_button_down(MouseButton::Left) {
            let delta = mouse_delta_position();
            self.yaw -= delta.x * 2.0;
            self.pitch -= delta.y * 2.0;
        }
        self.pitch = self.pitch.clamp(-1.5, 1.5);

        self.distance -= mouse_wheel().1 * self.zoom_speed;
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);

        let forward = vec3(-self.yaw.sin(), 0.0, -self.yaw.cos());
        let right = vec3(self.yaw.cos(), 0.0, -self.yaw.sin());
        let mut step = Vec3::ZERO;
        if is_key_down(KeyCode::W) {
            step += forward;
        }
        if is_key_down(KeyCode::S) {
            step -= forward;
        }
        if is_key_down(KeyCode::D) {
            step += right;
        }
        if is_key_down(KeyCode::A) {
            step -= right;
        }
        if is_key_down(KeyCode::E) {
            step.y += 1.0;
        }
        if is_key_down(KeyCode::Q) {
            step.y -= 1.0;
        }
        self.target += step * self.move_speed;
    }

    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + vec3(x, y, z)
    }

    pub fn to_camera3d(&self) -> Camera3D {
        Camera3D {
            position: self.position(),
            up: vec3(0.0, 1.0, 0.0),
            target: self.target,
            ..Default::default()
        }
    }

    /// The point whose leaf decides what is drawn: the orbit target.
    pub fn eye_point(&self) -> Point3<f32> {
        Point3::new(self.target.x, self.target.y, self.target.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsp_pvs::{PartitionTree, TreeConfig};

    #[test]
    fn region_colors_are_stable() {
        assert_eq!(region_color(7), region_color(7));
    }

    #[test]
    fn rooms_scene_has_expected_polygon_count() {
        assert_eq!(generate_rooms_scene(1, 10.0).len(), 6);
        // Two rooms of 5 solid walls, two door frames, one corridor
        assert_eq!(generate_rooms_scene(2, 10.0).len(), 5 + 5 + 4 + 4 + 4);
    }

    #[test]
    fn rooms_scene_partitions_into_rooms_and_corridors() {
        let tree = PartitionTree::build(generate_rooms_scene(3, 10.0), &TreeConfig::default());
        assert!(tree.leaf_count() > 1);
        assert_eq!(tree.node_count(), 2 * tree.leaf_count() - 1);
        assert!(tree.leaf_regions().all(|leaf| leaf.is_convex()));
    }
}
