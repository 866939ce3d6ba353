use crate::error::{Result, SceneError};
use crate::io::background::choose_background;
use crate::io::category_map::load_category_map;
use crate::io::config::Config;
use crate::io::manifest::Manifest;
use crate::io::obj_loader::FileLoader;
use crate::scene::camera::{add_interior_camera_pose, add_orbit_camera_pose, find_camera_radius};
use crate::scene::graph::SceneGraph;
use crate::scene::light::Light;
use crate::scene::loader::{AssetAggregator, LoadOptions};
use crate::scene::placement::{PlacementStats, place_objects_randomly, sample_poses_on_surface};
use crate::scene::room::{BoxRoomConstructor, build_room};
use crate::scene::scene_object::{ObjectKind, SceneObject};
use crate::weathering::{Weathering, WeatheringReport};
use log::{debug, info};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Instant;

/// What one generation run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The seed actually used, drawn from OS entropy when none was configured.
    pub seed: u64,
    pub groups: usize,
    pub objects: usize,
    pub camera_poses: usize,
    pub placement: PlacementStats,
    pub weathering: Option<WeatheringReport>,
    pub manifest: PathBuf,
}

/// Composes one scene from `config` and writes its manifest.
pub fn run(config: &Config) -> Result<RunSummary> {
    let start_time = Instant::now();
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    info!("Starting scene generation (seed {})...", seed);

    let mut graph = SceneGraph::new();

    // Shell and furniture before trash: unplaced trash must not occlude the floor.
    let shell = if config.room.enabled {
        let room = config.room.room_config(&config.assets.dataset);
        Some(build_room(
            &mut graph,
            &mut rng,
            &FileLoader,
            &BoxRoomConstructor::default(),
            &room,
        )?)
    } else {
        None
    };

    // --- Aggregation ---
    let mut aggregator = AssetAggregator::new(config.assets.base_dir.clone(), Box::new(FileLoader))
        .with_dataset(&config.assets.dataset);
    let template = LoadOptions {
        fuse_parts: config.assets.fuse_parts,
        ..LoadOptions::default()
    };
    match &config.assets.category_map {
        Some(path) => {
            let entries = load_category_map(path)?;
            info!("Category map lists {} class(es)", entries.len());
            aggregator.load_categories(&mut graph, &entries, &template)?;
        }
        None => {
            let opts = LoadOptions {
                assign_metadata: false,
                ..template
            };
            aggregator.load(&mut graph, None, &opts)?;
        }
    }
    let groups = aggregator.groups();
    if groups.is_empty() {
        return Err(SceneError::EmptyScene);
    }
    info!(
        "Aggregated {} group(s), {} placement unit(s)",
        groups.len(),
        aggregator.mesh_units().len()
    );

    // --- Weathering ---
    // Placement has to see the deformed, rescaled meshes. Lattice helpers
    // are parented and move with their owner.
    let weathering = config.weathering.enabled.then(|| {
        Weathering::new(config.weathering.params.clone(), &mut rng).apply_to_groups(&mut graph, groups, &mut rng)
    });

    // --- Placement ---
    let placement = match &shell {
        Some(shell) => {
            let floor = shell.floor().ok_or(SceneError::NoFloor)?;
            sample_poses_on_surface(
                &mut graph,
                &aggregator.mesh_units(),
                floor,
                &mut rng,
                &config.room.trash_placement(),
            )?
        }
        None => place_objects_randomly(&mut graph, groups, &mut rng, &config.placement.free_placement()),
    };

    // --- Cameras ---
    let num_views = config.camera.num_views;
    match &shell {
        Some(shell) => {
            let interior = config.camera.interior();
            for _ in 0..num_views {
                add_interior_camera_pose(&mut graph, shell, &mut rng, &interior)?;
            }
        }
        None => {
            let (center, radius) = find_camera_radius(&graph, groups, config.camera.distance_factor)?;
            let orbit = config.camera.orbit();
            for _ in 0..num_views {
                add_orbit_camera_pose(&mut graph, &mut rng, &center, radius, &orbit);
            }
        }
    }
    info!(
        "Placed {} object(s) ({} kept a best-effort pose), {} camera pose(s)",
        placement.placed + placement.exhausted,
        placement.exhausted,
        graph.camera_poses().len()
    );

    // --- Light & world ---
    let mut sun = SceneObject::new("Sun", ObjectKind::Light(Light::new_sun(config.light.energy)));
    sun.location = Vector3::from(config.light.location);
    graph.add(sun);

    if config.background.enabled {
        let background = choose_background(&config.background.dir, &mut rng)?;
        graph.set_world_background(&background, config.background.strength);
    }

    // --- Manifest ---
    let diagnostics = weathering.as_ref().map_or(&[][..], |r| r.diagnostics.as_slice());
    let manifest = Manifest::from_graph(&graph, &config.render, Some(seed), diagnostics)
        .write(&config.output.dir)?;

    debug!("Scene generation finished in {:.2?}", start_time.elapsed());
    Ok(RunSummary {
        seed,
        groups: groups.len(),
        objects: graph.len(),
        camera_poses: graph.camera_poses().len(),
        placement,
        weathering,
        manifest,
    })
}
