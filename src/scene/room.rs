//! Closed room shells with normalized furniture inside.

use crate::core::math::sampling::uniform;
use crate::error::{Result, SceneError};
use crate::io::material_set::load_material_set;
use crate::io::obj_loader::MeshLoader;
use crate::scene::graph::SceneGraph;
use crate::scene::loader::{collect_files, fuse_objects};
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::scene::placement::{RotationMode, SurfacePlacement, sample_poses_on_surface};
use crate::scene::scene_object::{ObjectId, SceneObject};
use crate::scene::utils::normalize_to_random_size;
use log::{debug, info, warn};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Directory layouts furniture datasets ship in, relative to the dataset root.
pub const FURNITURE_PATTERNS: [&[&str]; 4] = [
    &["model", "*", "*", "model.obj"],
    &["model", "*", "*", "*.obj"],
    &["model", "*", "*.obj"],
    &["*", "*", "model.obj"],
];

const WALL_THICKNESS: f32 = 0.1;
const SLAB_THICKNESS: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellRole {
    Floor,
    Wall,
    Ceiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellPart {
    pub id: ObjectId,
    pub role: ShellRole,
}

/// Generated room parts, each tagged with its role, plus the furniture that
/// ended up inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomShell {
    pub parts: Vec<ShellPart>,
    pub interior: Vec<ObjectId>,
}

impl RoomShell {
    fn with_role(&self, role: ShellRole) -> impl Iterator<Item = ObjectId> + '_ {
        self.parts.iter().filter(move |p| p.role == role).map(|p| p.id)
    }

    pub fn floor(&self) -> Option<ObjectId> {
        self.with_role(ShellRole::Floor).next()
    }

    pub fn walls(&self) -> Vec<ObjectId> {
        self.with_role(ShellRole::Wall).collect()
    }

    pub fn ceilings(&self) -> Vec<ObjectId> {
        self.with_role(ShellRole::Ceiling).collect()
    }

    pub fn interior(&self) -> &[ObjectId] {
        &self.interior
    }
}

/// Shape parameters handed to a [`RoomConstructor`].
#[derive(Debug, Clone, PartialEq)]
pub struct RoomLayout {
    pub floor_area: f32,
    pub wall_height: f32,
    pub amount_of_extrusions: u32,
    pub corridor_width: f32,
    pub objects_per_sq_meter: f32,
}

/// Builds the shell around prepared interior objects.
pub trait RoomConstructor {
    fn construct(
        &self,
        graph: &mut SceneGraph,
        rng: &mut StdRng,
        interior: &[ObjectId],
        materials: &[Material],
        layout: &RoomLayout,
    ) -> Result<RoomShell>;
}

/// Rectangular room: one floor slab, four walls and a ceiling slab.
///
/// Extrusions and corridors are not modeled; `amount_of_extrusions` and
/// `corridor_width` only reach custom constructors.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxRoomConstructor {
    /// Width to depth ratio range of the floor.
    pub aspect_range: (f32, f32),
    pub placement: SurfacePlacement,
}

impl Default for BoxRoomConstructor {
    fn default() -> Self {
        Self {
            aspect_range: (1.0, 2.0),
            placement: SurfacePlacement {
                min_height: 0.0,
                max_height: 0.0,
                min_distance: 0.8,
                max_distance: f32::INFINITY,
                use_ray_trace_check: true,
                rotation: RotationMode::Yaw,
                max_tries: 100,
            },
        }
    }
}

impl RoomConstructor for BoxRoomConstructor {
    fn construct(
        &self,
        graph: &mut SceneGraph,
        rng: &mut StdRng,
        interior: &[ObjectId],
        materials: &[Material],
        layout: &RoomLayout,
    ) -> Result<RoomShell> {
        if layout.floor_area <= 0.0 || layout.wall_height <= 0.0 {
            return Err(SceneError::Config(format!(
                "room needs a positive floor area and wall height, got {} and {}",
                layout.floor_area, layout.wall_height
            )));
        }
        let aspect = uniform(rng, self.aspect_range).max(1e-3);
        let width = (layout.floor_area / aspect).sqrt();
        let depth = width * aspect;
        let (hx, hy, h) = (width / 2.0, depth / 2.0, layout.wall_height);
        let t = WALL_THICKNESS;
        debug!("Room {:.2} x {:.2} x {:.2}", width, depth, h);

        let mut parts = Vec::new();
        #[rustfmt::skip]
        let boxes = [
            ("Floor",      ShellRole::Floor,   Point3::new(-hx, -hy, -SLAB_THICKNESS), Point3::new(hx, hy, 0.0)),
            ("Wall_north", ShellRole::Wall,    Point3::new(-hx - t, hy, 0.0),          Point3::new(hx + t, hy + t, h)),
            ("Wall_south", ShellRole::Wall,    Point3::new(-hx - t, -hy - t, 0.0),     Point3::new(hx + t, -hy, h)),
            ("Wall_east",  ShellRole::Wall,    Point3::new(hx, -hy, 0.0),              Point3::new(hx + t, hy, h)),
            ("Wall_west",  ShellRole::Wall,    Point3::new(-hx - t, -hy, 0.0),         Point3::new(-hx, hy, h)),
            ("Ceiling",    ShellRole::Ceiling, Point3::new(-hx, -hy, h),               Point3::new(hx, hy, h + SLAB_THICKNESS)),
        ];
        for (name, role, min, max) in boxes {
            let material = materials.choose(rng).cloned().unwrap_or_default();
            let mut obj = SceneObject::new_mesh(name, Mesh::create_box(min, max), vec![material]);
            obj.set_cp("room_part", name);
            parts.push(ShellPart {
                id: graph.add(obj),
                role,
            });
        }

        let budget = (layout.floor_area * layout.objects_per_sq_meter.max(0.0)).ceil() as usize;
        let (kept, surplus) = interior.split_at(budget.min(interior.len()));
        for &id in surplus {
            graph.remove(id);
        }
        if !surplus.is_empty() {
            debug!("Removed {} furniture object(s) over the density budget", surplus.len());
        }

        let shell = RoomShell {
            parts,
            interior: kept.to_vec(),
        };
        if let Some(floor) = shell.floor() {
            sample_poses_on_surface(graph, kept, floor, rng, &self.placement)?;
        }
        Ok(shell)
    }
}

/// Everything `build_room` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    pub materials_dir: PathBuf,
    pub furniture_root: PathBuf,
    pub target_count: usize,
    pub floor_area: f32,
    pub wall_height: f32,
    pub target_size_range: (f32, f32),
    pub amount_of_extrusions: u32,
    pub corridor_width: f32,
    pub objects_per_sq_meter: f32,
    /// Strength range for turning ceilings into area lights.
    pub ceiling_emission: Option<(f32, f32)>,
    /// Dataset tag stamped on the furniture.
    pub dataset: String,
}

impl RoomConfig {
    pub fn layout(&self) -> RoomLayout {
        RoomLayout {
            floor_area: self.floor_area,
            wall_height: self.wall_height,
            amount_of_extrusions: self.amount_of_extrusions,
            corridor_width: self.corridor_width,
            objects_per_sq_meter: self.objects_per_sq_meter,
        }
    }
}

fn segment_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_prefix('*') {
        Some("") => true,
        Some(suffix) => name.len() > suffix.len() && name.ends_with(suffix),
        None => pattern == name,
    }
}

fn path_matches(pattern: &[&str], relative: &Path) -> bool {
    let names: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    names.len() == pattern.len() && pattern.iter().zip(&names).all(|(p, n)| segment_matches(p, n))
}

/// Furniture meshes under `root` matching any known layout, deduplicated and
/// sorted.
pub fn find_furniture_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    let found: BTreeSet<PathBuf> = files
        .into_iter()
        .filter(|f| {
            f.strip_prefix(root)
                .is_ok_and(|rel| FURNITURE_PATTERNS.iter().any(|p| path_matches(p, rel)))
        })
        .collect();
    Ok(found.into_iter().collect())
}

/// Loads one furniture file as a single normalized unit resting on its origin.
fn prepare_furniture(
    graph: &mut SceneGraph,
    rng: &mut StdRng,
    loader: &dyn MeshLoader,
    path: &Path,
    cfg: &RoomConfig,
) -> Option<ObjectId> {
    let objects = match loader.load(path) {
        Ok(objects) => objects,
        Err(e) => {
            warn!("Skipping furniture '{}': {}", path.display(), e);
            return None;
        }
    };
    let ids: Vec<ObjectId> = objects
        .into_iter()
        .filter(SceneObject::is_mesh)
        .map(|obj| graph.add(obj))
        .collect();
    let id = fuse_objects(graph, &ids)?;

    let obj = graph.get_mut(id)?;
    if normalize_to_random_size(obj, rng, cfg.target_size_range).is_none() {
        debug!("'{}' has no usable extent, left unscaled", path.display());
    }
    obj.persist_rotation_and_scale();
    obj.set_origin_to_bottom_center();
    obj.set_cp("source", "room_furniture");
    obj.set_cp("dataset", cfg.dataset.as_str());
    Some(id)
}

/// Builds a furnished room shell.
pub fn build_room(
    graph: &mut SceneGraph,
    rng: &mut StdRng,
    loader: &dyn MeshLoader,
    constructor: &dyn RoomConstructor,
    cfg: &RoomConfig,
) -> Result<RoomShell> {
    let materials = load_material_set(&cfg.materials_dir)?;

    let candidates = find_furniture_files(&cfg.furniture_root)?;
    if candidates.is_empty() {
        return Err(SceneError::NoMeshFiles(cfg.furniture_root.clone()));
    }
    let count = cfg.target_count.min(candidates.len());
    info!(
        "Sampling {} of {} furniture file(s) from {}",
        count,
        candidates.len(),
        cfg.furniture_root.display()
    );

    let picked = rand::seq::index::sample(rng, candidates.len(), count);
    let interior: Vec<ObjectId> = picked
        .into_iter()
        .filter_map(|i| prepare_furniture(graph, rng, loader, &candidates[i], cfg))
        .collect();

    let shell = constructor.construct(graph, rng, &interior, &materials, &cfg.layout())?;

    if let Some(range) = cfg.ceiling_emission {
        for id in shell.ceilings() {
            let strength = uniform(rng, range);
            if let Some(data) = graph.get_mut(id).and_then(SceneObject::mesh_data_mut) {
                for material in &mut data.materials {
                    material.make_emissive(strength);
                }
            }
        }
    }

    info!(
        "Room built: {} shell part(s), {} furniture object(s)",
        shell.parts.len(),
        shell.interior.len()
    );
    Ok(shell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::scene::placement::UpperRegionSampler;
    use image::{Rgb, RgbImage};
    use nalgebra::Vector3;
    use rand::SeedableRng;
    use std::fs;

    struct SlabLoader;

    impl MeshLoader for SlabLoader {
        fn load(&self, _path: &Path) -> std::result::Result<Vec<SceneObject>, LoadError> {
            let mut obj = SceneObject::new_mesh(
                "slab",
                Mesh::create_box(Point3::new(0.0, 0.0, 0.0), Point3::new(12.0, 6.0, 3.0)),
                vec![Material::default()],
            );
            obj.rotation = Vector3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2);
            Ok(vec![obj])
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trash_scenes_room_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn config(root: &Path) -> RoomConfig {
        let materials_dir = root.join("materials");
        fs::create_dir_all(&materials_dir).unwrap();
        RgbImage::from_pixel(2, 2, Rgb([128, 128, 128]))
            .save(materials_dir.join("plaster.png"))
            .unwrap();
        let furniture_root = root.join("pix3d");
        for rel in [
            "model/chair/a/model.obj",
            "model/table/b/model.obj",
            "model/sofa/c/model.obj",
        ] {
            touch(&furniture_root, rel);
        }
        RoomConfig {
            materials_dir,
            furniture_root,
            target_count: 2,
            floor_area: 20.0,
            wall_height: 2.5,
            target_size_range: (1.0, 1.1),
            amount_of_extrusions: 0,
            corridor_width: 0.9,
            objects_per_sq_meter: 3.0,
            ceiling_emission: Some((1.0, 2.0)),
            dataset: "pix3d".into(),
        }
    }

    #[test]
    fn furniture_patterns_cover_known_layouts() {
        let root = scratch_dir("patterns");
        for rel in [
            "model/bed/IKEA_x/model.obj",
            "model/bed/IKEA_x/extra.obj",
            "model/desk/flat.obj",
            "chair/IKEA_y/model.obj",
            "model/bed/IKEA_x/notes.txt",
            "deep/a/b/c/model.obj",
        ] {
            touch(&root, rel);
        }
        let found: Vec<String> = find_furniture_files(&root)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            found,
            vec![
                "chair/IKEA_y/model.obj",
                "model/bed/IKEA_x/extra.obj",
                "model/bed/IKEA_x/model.obj",
                "model/desk/flat.obj",
            ]
        );
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn shell_roles_are_explicit() {
        let shell = RoomShell {
            parts: vec![
                ShellPart { id: 4, role: ShellRole::Wall },
                ShellPart { id: 2, role: ShellRole::Floor },
                ShellPart { id: 9, role: ShellRole::Ceiling },
            ],
            interior: vec![],
        };
        assert_eq!(shell.floor(), Some(2));
        assert_eq!(shell.walls(), vec![4]);
        assert_eq!(shell.ceilings(), vec![9]);
        assert_eq!(RoomShell::default().floor(), None);
    }

    #[test]
    fn builds_furnished_room() {
        let root = scratch_dir("build");
        let cfg = config(&root);
        let mut graph = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(4);

        let shell = build_room(&mut graph, &mut rng, &SlabLoader, &BoxRoomConstructor::default(), &cfg)
            .unwrap();
        assert_eq!(shell.walls().len(), 4);
        assert_eq!(shell.ceilings().len(), 1);
        assert_eq!(shell.interior().len(), 2);

        let floor = graph.world_aabb(shell.floor().unwrap()).unwrap();
        let area = floor.extent().x * floor.extent().y;
        assert!((area - 20.0).abs() < 1e-2);

        for &id in shell.interior() {
            let obj = graph.get(id).unwrap();
            // Normalized, baked and resting on the floor.
            let longest = obj.dimensions().max();
            assert!((1.0 - 1e-4..=1.1 + 1e-4).contains(&longest));
            assert_eq!(obj.scale, Vector3::new(1.0, 1.0, 1.0));
            assert!(obj.world_aabb().unwrap().min.z.abs() < 1e-4);
            assert_eq!(
                obj.get_cp("source"),
                Some(&crate::scene::scene_object::PropertyValue::Str("room_furniture".into()))
            );
        }

        let ceiling = graph.get(shell.ceilings()[0]).unwrap();
        let emission = ceiling.mesh_data().unwrap().materials[0]
            .node_tree
            .as_ref()
            .and_then(|t| t.emission);
        assert!(emission.is_some_and(|e| (1.0..=2.0).contains(&e.strength)));

        // The floor is usable by the upper-region sampler.
        let sampler = UpperRegionSampler {
            surface: shell.floor().unwrap(),
            min_height: 1.4,
            max_height: 1.7,
            use_ray_trace_check: false,
        };
        assert!(sampler.sample(&graph, &mut rng).is_some());
        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn density_budget_removes_surplus() {
        let mut graph = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(2);
        let interior: Vec<ObjectId> = (0..5)
            .map(|i| graph.add(SceneObject::new_mesh(&format!("f{i}"), Mesh::create_cube(0.5), vec![])))
            .collect();
        let layout = RoomLayout {
            floor_area: 4.0,
            wall_height: 2.5,
            amount_of_extrusions: 0,
            corridor_width: 0.9,
            objects_per_sq_meter: 0.5,
        };
        let shell = BoxRoomConstructor::default()
            .construct(&mut graph, &mut rng, &interior, &[Material::default()], &layout)
            .unwrap();
        assert_eq!(shell.interior().len(), 2);
        assert!(!graph.contains(interior[4]));
    }

    #[test]
    fn missing_furniture_is_reported() {
        let root = scratch_dir("nofurniture");
        let mut cfg = config(&root);
        cfg.furniture_root = root.join("empty");
        fs::create_dir_all(&cfg.furniture_root).unwrap();
        let mut graph = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(0);
        let result = build_room(&mut graph, &mut rng, &SlabLoader, &BoxRoomConstructor::default(), &cfg);
        assert!(matches!(result, Err(SceneError::NoMeshFiles(_))));
        fs::remove_dir_all(root).ok();
    }
}
