use std::error::Error;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use argh::FromArgs;
use bsp_pvs::bsp::{DrawTracker, LeafVisitor};
use bsp_pvs::{GeometryStore, PartitionTree, TreeConfig, DEFAULT_MAX_DEPTH};
use log::info;
use macroquad::prelude::*;
use pvs_viz::{draw_polygon, generate_rooms_scene, LeafRenderer, RegionNavigator, ViewerCamera};
use simplelog::TermLogger;

/// Build a BSP tree and its PVS, then walk through it
#[derive(Debug, Clone, FromArgs)]
struct CLIOptions {
    /// verbose level: off, error, warn, info, debug
    #[argh(option)]
    verbose: Option<log::LevelFilter>,
    /// binary geometry file; a demo scene is generated when absent
    #[argh(option)]
    geometry: Option<PathBuf>,
    /// number of rooms in the demo scene
    #[argh(option, default = "4")]
    rooms: usize,
    /// coordinate divisor applied when loading geometry
    #[argh(option, default = "1.0")]
    scale: f32,
    /// maximum tree depth
    #[argh(option, default = "DEFAULT_MAX_DEPTH")]
    max_depth: usize,
    /// sample points per plane axis
    #[argh(option, default = "20")]
    grid: usize,
    /// visibility worker threads, one per core by default
    #[argh(option)]
    threads: Option<usize>,
    /// PVS cache file; defaults to the user cache directory
    #[argh(option)]
    pvs: Option<PathBuf>,
    /// write each leaf's sample points to this file
    #[argh(option)]
    dump: Option<PathBuf>,
    /// build the PVS and exit without opening a window
    #[argh(switch)]
    bake: bool,
}

impl From<&CLIOptions> for TreeConfig {
    fn from(o: &CLIOptions) -> Self {
        let config = TreeConfig::default()
            .with_max_depth(o.max_depth)
            .with_sample_grid(o.grid, o.grid)
            .with_scale(o.scale);
        match o.threads {
            Some(threads) => config.with_worker_threads(threads),
            None => config,
        }
    }
}

/// `<cache>/bsp-pvs/<name>_<hash>.pvs`, so edited geometry never reuses a
/// stale cache.
fn pvs_cache_path(name: &str, hash: u64) -> Result<PathBuf, Box<dyn Error>> {
    let cache_dir = dirs::cache_dir()
        .ok_or("Could not determine cache directory")?
        .join("bsp-pvs");
    std::fs::create_dir_all(&cache_dir)?;
    Ok(cache_dir.join(format!("{name}_{hash:016x}.pvs")))
}

fn geometry_hash(store: &GeometryStore, config: &TreeConfig) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for polygon in store.polygons() {
        for v in polygon.vertices() {
            v.iter().for_each(|c| c.to_bits().hash(&mut hasher));
        }
    }
    config.max_depth.hash(&mut hasher);
    config.sample_grid.hash(&mut hasher);
    hasher.finish()
}

fn main() -> Result<(), Box<dyn Error>> {
    let options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(log::LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(log::LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let config = TreeConfig::from(&options);
    let (name, store) = match &options.geometry {
        Some(path) => {
            let name = path
                .file_stem()
                .map_or_else(|| "level".to_string(), |s| s.to_string_lossy().into_owned());
            (name, GeometryStore::load(path, config.scale)?)
        }
        None => {
            info!("No geometry given, generating {} rooms", options.rooms);
            let scene = generate_rooms_scene(options.rooms.max(1), 10.0);
            (format!("rooms{}", options.rooms), GeometryStore::from_polygons(scene))
        }
    };

    let pvs_path = match &options.pvs {
        Some(path) => path.clone(),
        None => pvs_cache_path(&name, geometry_hash(&store, &config))?,
    };

    let mut tree = PartitionTree::from_geometry(store.clone(), &config);
    let source = tree.build_pvs(&pvs_path)?;
    info!("PVS ready ({source:?}), cache at {pvs_path:?}");

    if let Some(path) = &options.dump {
        let mut writer = BufWriter::new(File::create(path)?);
        tree.dump_sample_points(&mut writer)?;
        writer.flush()?;
        info!("Dumped sample points to {path:?}");
    }

    if options.bake {
        return Ok(());
    }

    let conf = Conf {
        window_title: format!("PVS viewer: {name}"),
        window_width: 1280,
        window_height: 800,
        ..Default::default()
    };
    macroquad::Window::from_config(conf, run_viewer(tree, store));
    Ok(())
}

async fn run_viewer(tree: PartitionTree, store: GeometryStore) {
    let start = tree
        .root()
        .bbox()
        .map_or(vec3(0.0, 0.0, 0.0), |b| vec3(b.mins.x + 5.0, b.mins.y + 5.0, b.mins.z + 5.0));
    let mut camera = ViewerCamera::new(8.0, 0.6, 0.4)
        .with_zoom(1.0, 0.5, 120.0)
        .with_target(start);
    let mut navigator = RegionNavigator::new();
    let mut tracker = DrawTracker::new(&tree);
    let mut show_soup = false;
    let mut last_leaf = None;

    loop {
        camera.update();
        navigator.update(&tree);
        if is_key_pressed(KeyCode::Tab) {
            show_soup = !show_soup;
        }

        clear_background(Color::from_rgba(20, 20, 30, 255));
        set_camera(&camera.to_camera3d());

        let eye = camera.eye_point();
        let eye_leaf = tree.leaf_at(&eye);
        if last_leaf != Some(eye_leaf) {
            info!("Eye entered leaf {eye_leaf}, PVS {:?}", tree.region(eye_leaf).pvs());
            last_leaf = Some(eye_leaf);
        }
        let mut renderer = LeafRenderer::new();
        if show_soup {
            for polygon in store.polygons() {
                draw_polygon(polygon, GRAY);
            }
        } else if navigator.depth() > 0 {
            navigator.render_subtree(&tree);
        } else {
            tracker.reset();
            for id in tracker.draw_list(&tree, &eye) {
                renderer.visit_leaf(tree.region(id));
            }
        }
        navigator.render(&tree);
        draw_sphere(vec3(eye.x, eye.y, eye.z), 0.15, None, RED);

        set_default_camera();

        let stats = tree.stats();
        draw_text(
            &format!(
                "{} leaves, {} nodes, {} splits | eye in leaf {eye_leaf}",
                stats.leaves, stats.nodes, stats.splits
            ),
            10.0,
            25.0,
            20.0,
            WHITE,
        );
        draw_text(
            &format!(
                "Drawn: {} leaves, {} triangles, {} static objects",
                renderer.stats.leaves_drawn,
                renderer.stats.triangles_drawn,
                renderer.stats.static_objects
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );
        navigator.draw_ui(&tree, 70.0);
        draw_text(
            "Drag to orbit, scroll to zoom, WASD/QE to move, Tab for raw geometry",
            10.0,
            135.0,
            16.0,
            DARKGRAY,
        );
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 155.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
