//! End-to-end scenes: build, sample, trace and cache.

use bsp_pvs::bsp::DrawTracker;
use bsp_pvs::pvs::PvsSource;
use bsp_pvs::{
    GeometryStore, PartitionTree, Polygon, RegionId, StaticObjectPlacement, TreeConfig,
};
use nalgebra::{Matrix4, Point3};

type Range = (f32, f32);

fn x_wall(x: f32, (y0, y1): Range, (z0, z1): Range, facing_positive: bool) -> Polygon {
    let p = Point3::new;
    if facing_positive {
        Polygon::quad(p(x, y0, z0), p(x, y1, z0), p(x, y1, z1), p(x, y0, z1))
    } else {
        Polygon::quad(p(x, y0, z1), p(x, y1, z1), p(x, y1, z0), p(x, y0, z0))
    }
}

fn y_wall(y: f32, (x0, x1): Range, (z0, z1): Range, facing_positive: bool) -> Polygon {
    let p = Point3::new;
    if facing_positive {
        Polygon::quad(p(x0, y, z0), p(x0, y, z1), p(x1, y, z1), p(x1, y, z0))
    } else {
        Polygon::quad(p(x1, y, z0), p(x1, y, z1), p(x0, y, z1), p(x0, y, z0))
    }
}

fn z_wall(z: f32, (x0, x1): Range, (y0, y1): Range, facing_positive: bool) -> Polygon {
    let p = Point3::new;
    if facing_positive {
        Polygon::quad(p(x0, y0, z), p(x1, y0, z), p(x1, y1, z), p(x0, y1, z))
    } else {
        Polygon::quad(p(x0, y1, z), p(x1, y1, z), p(x1, y0, z), p(x0, y0, z))
    }
}

/// Six inward-facing walls of an axis-aligned box.
fn make_box(min: [f32; 3], max: [f32; 3]) -> Vec<Polygon> {
    let (x, y, z) = ((min[0], max[0]), (min[1], max[1]), (min[2], max[2]));
    vec![
        x_wall(x.0, y, z, true),
        x_wall(x.1, y, z, false),
        y_wall(y.0, x, z, true),
        y_wall(y.1, x, z, false),
        z_wall(z.0, x, y, true),
        z_wall(z.1, x, y, false),
    ]
}

/// The four wall pieces around a 2×2 doorway at y, z ∈ [4, 6] in the plane `x`.
fn make_door_frame(x: f32, facing_positive: bool) -> Vec<Polygon> {
    vec![
        x_wall(x, (0.0, 4.0), (0.0, 10.0), facing_positive),
        x_wall(x, (6.0, 10.0), (0.0, 10.0), facing_positive),
        x_wall(x, (4.0, 6.0), (0.0, 4.0), facing_positive),
        x_wall(x, (4.0, 6.0), (6.0, 10.0), facing_positive),
    ]
}

/// A 10³ room spanning `x0..x1` whose `door_x` wall is a door frame.
fn make_room(x0: f32, x1: f32, door_x: f32) -> Vec<Polygon> {
    let full = (0.0, 10.0);
    let (solid_x, door_faces_positive) = if door_x == x1 { (x0, false) } else { (x1, true) };
    let mut polygons = vec![
        x_wall(solid_x, full, full, solid_x == x0),
        y_wall(0.0, (x0, x1), full, true),
        y_wall(10.0, (x0, x1), full, false),
        z_wall(0.0, (x0, x1), full, true),
        z_wall(10.0, (x0, x1), full, false),
    ];
    polygons.extend(make_door_frame(door_x, door_faces_positive));
    polygons
}

/// Side walls of the doorway-sized corridor between `x0` and `x1`.
fn make_corridor(x0: f32, x1: f32) -> Vec<Polygon> {
    vec![
        y_wall(4.0, (x0, x1), (4.0, 6.0), true),
        y_wall(6.0, (x0, x1), (4.0, 6.0), false),
        z_wall(4.0, (x0, x1), (4.0, 6.0), true),
        z_wall(6.0, (x0, x1), (4.0, 6.0), false),
    ]
}

/// Room `[0, 10]³` opening into a dead-end corridor reaching `x = 20`.
fn make_room_and_corridor() -> Vec<Polygon> {
    let mut polygons = make_room(0.0, 10.0, 10.0);
    polygons.extend(make_corridor(10.0, 20.0));
    polygons.push(x_wall(20.0, (4.0, 6.0), (4.0, 6.0), false));
    polygons
}

/// Two rooms joined by a straight corridor: `[0, 10]`, `[10, 20]`, `[20, 30]`.
fn make_three_rooms() -> Vec<Polygon> {
    let mut polygons = make_room(0.0, 10.0, 10.0);
    polygons.extend(make_corridor(10.0, 20.0));
    polygons.extend(make_room(20.0, 30.0, 20.0));
    polygons
}

fn make_config() -> TreeConfig {
    TreeConfig::default().with_worker_threads(2)
}

fn make_traced(polygons: Vec<Polygon>) -> PartitionTree {
    let mut tree = PartitionTree::build(polygons, &make_config());
    tree.tessellate();
    tree.distribute_sample_points(Vec::new());
    tree.trace_visibility();
    tree
}

fn sorted_pvs(tree: &PartitionTree, leaf: RegionId) -> Vec<RegionId> {
    let mut pvs = tree.region(leaf).pvs().to_vec();
    pvs.sort_unstable();
    pvs
}

fn assert_structure(tree: &PartitionTree) {
    for region in tree.regions() {
        match region.children() {
            Some((front, back)) => {
                assert!(region.plane().is_some());
                assert!(region.polygons().is_empty());
                assert!(region.triangles().is_empty());
                assert_eq!(tree.region(front).parent(), Some(region.id()));
                assert_eq!(tree.region(back).parent(), Some(region.id()));
                assert!(!tree.leaves().contains(&region.id()));
            }
            None => {
                assert!(region.plane().is_none());
                assert!(tree.leaves().contains(&region.id()));
                assert!(region.is_convex() || region.depth() == tree.config().max_depth);
            }
        }
    }
}

#[test]
fn hexahedron_at_depth_zero_is_one_leaf() {
    let config = make_config().with_max_depth(0);
    let mut tree = PartitionTree::build(make_box([0.0; 3], [4.0; 3]), &config);
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.stats().splits, 0);

    tree.tessellate();
    tree.distribute_sample_points(Vec::new());
    tree.trace_visibility();
    assert!(tree.root().pvs().is_empty());
    assert!(tree.root().sample_points().is_empty());
}

#[test]
fn room_and_corridor_split_at_the_doorway() {
    let tree = PartitionTree::build(make_room_and_corridor(), &make_config());
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.leaf_count(), 2);
    assert_eq!(tree.stats().splits, 0);
    assert_eq!(tree.stats().convex_rooms, 2);
    assert_eq!(tree.region(1).polygons().len(), 9);
    assert_eq!(tree.region(2).polygons().len(), 5);
    assert_structure(&tree);
}

#[test]
fn doorway_connects_room_and_corridor() {
    let tree = make_traced(make_room_and_corridor());
    let (room, corridor) = (tree.leaf_at(&Point3::new(5.0, 5.0, 5.0)), tree.leaf_at(&Point3::new(15.0, 5.0, 5.0)));
    assert_ne!(room, corridor);

    // Only the 3×3 grid points inside the doorway survive on either side
    assert_eq!(tree.region(room).sample_points().len(), 9);
    assert_eq!(tree.region(corridor).sample_points().len(), 9);

    assert_eq!(tree.region(room).pvs(), &[corridor]);
    assert_eq!(tree.region(corridor).pvs(), &[room]);
    assert_eq!(tree.region(room).connected_leaves(), &[corridor]);
    assert!(tree.is_visible(room, corridor));
    assert!(tree.is_checked(room, corridor));
}

#[test]
fn rooms_see_each_other_down_a_straight_corridor() {
    let tree = make_traced(make_three_rooms());
    assert_eq!(tree.leaf_count(), 3);
    assert_eq!(tree.stats().splits, 0);
    assert_structure(&tree);

    let first = tree.leaf_at(&Point3::new(5.0, 5.0, 5.0));
    let corridor = tree.leaf_at(&Point3::new(15.0, 5.0, 5.0));
    let second = tree.leaf_at(&Point3::new(25.0, 5.0, 5.0));

    // Only the corridor touches both rooms
    assert_eq!(tree.region(first).connected_leaves(), &[corridor]);
    assert_eq!(tree.region(second).connected_leaves(), &[corridor]);

    // The rooms are found two hops apart
    assert!(tree.is_visible(first, second));
    let mut expected = vec![corridor, second];
    expected.sort_unstable();
    assert_eq!(sorted_pvs(&tree, first), expected);
}

#[test]
fn pvs_is_symmetric() {
    let tree = make_traced(make_three_rooms());
    for &a in tree.leaves() {
        for &b in tree.region(a).pvs() {
            assert_ne!(a, b);
            assert!(tree.region(b).pvs().contains(&a), "{a} sees {b} but not back");
            assert!(tree.is_visible(a, b) && tree.is_visible(b, a));
            assert!(tree.is_checked(a, b));
        }
        let pvs = sorted_pvs(&tree, a);
        let mut unique = pvs.clone();
        unique.dedup();
        assert_eq!(pvs, unique);
    }
}

#[test]
fn tracing_twice_changes_nothing() {
    let mut tree = make_traced(make_three_rooms());
    let before: Vec<_> = tree.leaves().iter().map(|&l| sorted_pvs(&tree, l)).collect();
    tree.trace_visibility();
    let after: Vec<_> = tree.leaves().iter().map(|&l| sorted_pvs(&tree, l)).collect();
    assert_eq!(before, after);
}

#[test]
fn segments_through_walls_are_blocked() {
    let mut tree = PartitionTree::build(make_room_and_corridor(), &make_config());
    tree.tessellate();

    let inside = Point3::new(5.0, 4.5, 5.2);
    assert!(!tree.segment_blocked(0, &inside, &Point3::new(15.0, 4.5, 5.2)));
    // Through the wall below the doorway
    assert!(tree.segment_blocked(0, &Point3::new(5.0, 1.0, 5.0), &Point3::new(15.0, 1.0, 5.0)));
    // Through the doorway, then the corridor's end wall
    assert!(tree.segment_blocked(0, &inside, &Point3::new(25.0, 4.5, 5.2)));
}

#[test]
fn pvs_cache_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("rooms.pvs");

    let mut traced = PartitionTree::build(make_three_rooms(), &make_config());
    assert_eq!(traced.build_pvs(&path).unwrap(), PvsSource::Traced);
    assert!(path.exists());

    let mut cached = PartitionTree::build(make_three_rooms(), &make_config());
    assert_eq!(cached.build_pvs(&path).unwrap(), PvsSource::Cache);
    assert!(cached.leaf_regions().all(|leaf| !leaf.sample_points().is_empty()));

    for &leaf in traced.leaves() {
        assert_eq!(sorted_pvs(&traced, leaf), sorted_pvs(&cached, leaf));
        for &other in traced.leaves() {
            assert_eq!(traced.is_visible(leaf, other), cached.is_visible(leaf, other));
        }
    }
}

#[test]
fn invalid_cache_is_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.pvs");
    std::fs::write(&path, "7\n1 * 0\n").unwrap();

    let mut tree = PartitionTree::build(make_three_rooms(), &make_config());
    assert_eq!(tree.build_pvs(&path).unwrap(), PvsSource::Traced);

    let rewritten = std::fs::read_to_string(&path).unwrap();
    assert_eq!(rewritten.lines().next(), Some("3"));
}

#[test]
fn static_objects_land_in_the_anchor_leaf() {
    let mut tree = PartitionTree::build(make_three_rooms(), &make_config());
    let anchor = Point3::new(25.0, 1.0, 5.0);
    let placement = StaticObjectPlacement::new(3, Matrix4::new_translation(&anchor.coords));

    assert!(tree.insert_static_object(placement.clone(), &anchor));
    assert!(!tree.insert_static_object(placement, &anchor));

    let leaf = tree.leaf_at(&anchor);
    assert_eq!(tree.region(leaf).placements().len(), 1);
    assert_eq!(tree.region(leaf).placements()[0].mesh_id, 3);
}

#[test]
fn coincident_polygon_goes_front_unsplit() {
    let mut polygons = make_box([0.0; 3], [2.0; 3]);
    polygons.extend(make_box([4.0, 0.0, 0.0], [6.0, 2.0, 2.0]));
    let patch = x_wall(2.0, (0.5, 1.0), (0.5, 1.0), true);
    polygons.push(patch.clone());

    let tree = PartitionTree::build(polygons, &make_config());
    assert_eq!(tree.stats().splits, 0);
    assert_eq!(tree.leaf_count(), 3);
    assert_structure(&tree);

    // The patch shares the root plane and stays whole on the front side
    let root_front = tree.root().front().unwrap();
    let holder = tree
        .leaf_regions()
        .find(|leaf| leaf.polygons().iter().any(|p| p.vertices() == patch.vertices()))
        .unwrap();
    assert_eq!(holder.parent(), Some(root_front));
    let total: usize = tree.leaf_regions().map(|l| l.polygons().len()).sum();
    assert_eq!(total, 13);
}

#[test]
fn splitting_conserves_polygons() {
    let polygons = vec![
        x_wall(1.0, (0.0, 1.0), (0.0, 1.0), true),
        x_wall(0.0, (0.0, 1.0), (0.0, 1.0), false),
        x_wall(2.0, (0.0, 1.0), (0.0, 1.0), true),
        y_wall(0.0, (-1.0, 4.0), (0.0, 1.0), true),
    ];
    let input = polygons.len();

    let tree = PartitionTree::build(polygons, &make_config());
    let stats = tree.stats();
    assert_eq!(stats.splits, 3);
    assert_eq!(stats.leaves, 4);
    assert_eq!(stats.nodes, 7);
    assert_structure(&tree);

    let in_leaves: usize = tree.leaf_regions().map(|l| l.polygons().len()).sum();
    assert_eq!(in_leaves, input + stats.splits);
    assert_eq!(in_leaves, stats.polygons_after_splits());
    assert!(tree.leaf_regions().flat_map(|l| l.polygons()).all(|p| p.len() == 4));
}

/// A 4×4 floor and a wall on `x + y = 1` facing the origin, which cuts the
/// floor's `(0, 0)` corner off.
fn make_oblique_cut() -> Vec<Polygon> {
    let p = Point3::new;
    vec![
        z_wall(0.0, (0.0, 4.0), (0.0, 4.0), true),
        Polygon::quad(p(2.0, -1.0, 0.0), p(2.0, -1.0, 2.0), p(-1.0, 2.0, 2.0), p(-1.0, 2.0, 0.0)),
    ]
}

#[test]
fn oblique_divider_keeps_pieces_tessellatable() {
    let mut tree = PartitionTree::build(make_oblique_cut(), &make_config());
    let stats = tree.stats().clone();
    assert_eq!(stats.splits, 1);
    assert_eq!(stats.extra_pieces, 1);
    assert_eq!(stats.leaves, 2);
    assert_structure(&tree);

    let pieces: Vec<&Polygon> = tree.leaf_regions().flat_map(|l| l.polygons()).collect();
    assert_eq!(pieces.len(), stats.polygons_after_splits());
    assert!(pieces.iter().all(|p| (3..=4).contains(&p.len())));

    // Wall quad, cut corner, and the rest of the floor as a quad and a triangle
    tree.tessellate();
    let triangles: usize = tree.leaf_regions().map(|l| l.triangles().len()).sum();
    assert_eq!(triangles, 2 + 1 + 2 + 1);

    let dir = tempfile::tempdir().unwrap();
    assert_eq!(tree.build_pvs(dir.path().join("oblique.pvs")).unwrap(), PvsSource::Traced);
}

/// Room, corridor, room with doors on both ends, corridor, room.
fn make_five_spaces() -> Vec<Polygon> {
    let full = (0.0, 10.0);
    let mut polygons = make_room(0.0, 10.0, 10.0);
    polygons.extend(make_corridor(10.0, 20.0));
    polygons.extend([
        y_wall(0.0, (20.0, 30.0), full, true),
        y_wall(10.0, (20.0, 30.0), full, false),
        z_wall(0.0, (20.0, 30.0), full, true),
        z_wall(10.0, (20.0, 30.0), full, false),
    ]);
    polygons.extend(make_door_frame(20.0, true));
    polygons.extend(make_door_frame(30.0, false));
    polygons.extend(make_corridor(30.0, 40.0));
    polygons.extend(make_room(40.0, 50.0, 40.0));
    polygons
}

#[test]
fn worker_count_does_not_change_the_pvs() {
    let trace_with = |threads: usize| {
        let config = TreeConfig::default().with_worker_threads(threads);
        let mut tree = PartitionTree::build(make_five_spaces(), &config);
        tree.tessellate();
        tree.distribute_sample_points(Vec::new());
        tree.trace_visibility();
        tree
    };

    let single = trace_with(1);
    assert!(single.leaf_count() >= 3);
    for threads in [2, 4, single.leaf_count() + 3] {
        let parallel = trace_with(threads);
        assert_eq!(parallel.leaves(), single.leaves());
        for &leaf in single.leaves() {
            assert_eq!(sorted_pvs(&parallel, leaf), sorted_pvs(&single, leaf));
            for &other in single.leaves() {
                assert_eq!(parallel.is_visible(leaf, other), single.is_visible(leaf, other));
            }
        }
    }
}

#[test]
fn tessellated_leaves_hold_only_triangles() {
    let mut tree = PartitionTree::build(make_three_rooms(), &make_config());
    tree.tessellate();
    for region in tree.regions() {
        assert!(region.polygons().is_empty());
        assert_eq!(region.is_leaf(), !region.triangles().is_empty());
    }
    let triangles: usize = tree.leaf_regions().map(|l| l.triangles().len()).sum();
    assert_eq!(triangles, 2 * 22);
}

#[test]
fn geometry_file_builds_the_same_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.geo");
    GeometryStore::from_polygons(make_three_rooms()).save(&path).unwrap();

    let store = GeometryStore::load(&path, 1.0).unwrap();
    assert_eq!(store.polygon_count(), 22);
    let tree = PartitionTree::from_geometry(store, &make_config());
    assert_eq!(tree.leaf_count(), 3);
    assert_eq!(tree.node_count(), 5);
}

#[test]
fn draw_list_covers_visible_leaves_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut tree = PartitionTree::build(make_three_rooms(), &make_config());
    tree.build_pvs(dir.path().join("rooms.pvs")).unwrap();

    let eye = Point3::new(5.0, 5.0, 5.0);
    let mut tracker = DrawTracker::new(&tree);
    let mut drawn = tracker.draw_list(&tree, &eye);
    assert_eq!(drawn[0], tree.leaf_at(&eye));
    drawn.sort_unstable();
    assert_eq!(drawn, tree.leaves().iter().copied().collect::<Vec<_>>());
    assert!(tracker.draw_list(&tree, &eye).is_empty());
}
