use crate::error::{Result, SceneError};
use crate::io::category_map::CategoryEntry;
use crate::io::obj_loader::MeshLoader;
use crate::scene::graph::SceneGraph;
use crate::scene::scene_object::{ObjectId, SceneObject};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// File extensions the aggregator hands to the mesh loader.
pub const MESH_EXTENSIONS: [&str; 2] = ["obj", "blend"];

/// Meshes that came from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetGroup {
    /// Placement units. A fused group holds exactly one.
    pub objects: Vec<ObjectId>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub dataset: String,
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub assign_metadata: bool,
    /// Clear previously accumulated groups before appending.
    pub reset: bool,
    /// Merge all meshes of a file into its first mesh.
    pub fuse_parts: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            category_id: None,
            category_name: None,
            assign_metadata: true,
            reset: false,
            fuse_parts: true,
        }
    }
}

impl LoadOptions {
    /// These options stamped with the id and name of a category map entry.
    pub fn for_category(&self, entry: &CategoryEntry) -> Self {
        Self {
            category_id: Some(entry.class_id),
            category_name: Some(entry.class_name.clone()),
            ..self.clone()
        }
    }
}

/// Accumulates loaded asset files into placement groups across calls.
pub struct AssetAggregator {
    base_dir: Option<PathBuf>,
    dataset: String,
    loader: Box<dyn MeshLoader>,
    groups: Vec<AssetGroup>,
}

impl AssetAggregator {
    pub fn new(base_dir: Option<PathBuf>, loader: Box<dyn MeshLoader>) -> Self {
        Self {
            base_dir,
            dataset: "trash".to_string(),
            loader,
            groups: Vec::new(),
        }
    }

    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    pub fn groups(&self) -> &[AssetGroup] {
        &self.groups
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Every placement unit, in group order.
    pub fn mesh_units(&self) -> Vec<ObjectId> {
        self.groups.iter().flat_map(|g| g.objects.iter().copied()).collect()
    }

    /// Loads every mesh file under `source` (or the base directory) and
    /// returns the accumulated groups.
    pub fn load(
        &mut self,
        graph: &mut SceneGraph,
        source: Option<&Path>,
        opts: &LoadOptions,
    ) -> Result<&[AssetGroup]> {
        let dir = match (source, &self.base_dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, Some(base)) => base.clone(),
            (None, None) => {
                return Err(SceneError::Config(
                    "no source directory given and no base directory configured".into(),
                ));
            }
        };

        let files = discover_mesh_files(&dir)?;
        info!("Found {} mesh file(s) under {}", files.len(), dir.display());

        if opts.reset {
            self.groups.clear();
        }

        let stamp = opts.assign_metadata && (opts.category_id.is_some() || opts.category_name.is_some());
        for file in files {
            let objects = match self.loader.load(&file) {
                Ok(objects) => objects,
                Err(e) => {
                    warn!("Skipping '{}': {}", file.display(), e);
                    continue;
                }
            };

            let mut ids = Vec::new();
            for mut obj in objects.into_iter().filter(SceneObject::is_mesh) {
                if stamp {
                    if let Some(id) = opts.category_id {
                        obj.set_cp("category_id", id);
                    }
                    if let Some(name) = &opts.category_name {
                        obj.set_cp("category_name", name.as_str());
                    }
                }
                obj.set_cp("dataset", self.dataset.as_str());
                ids.push(graph.add(obj));
            }
            if ids.is_empty() {
                debug!("'{}' holds no meshes", file.display());
                continue;
            }

            if opts.fuse_parts
                && ids.len() > 1
                && let Some(unit) = fuse_objects(graph, &ids)
            {
                debug!("Fused {} parts of '{}'", ids.len(), file.display());
                ids = vec![unit];
            }

            self.groups.push(AssetGroup {
                objects: ids,
                category_id: opts.category_id,
                category_name: opts.category_name.clone(),
                dataset: self.dataset.clone(),
                source: file,
            });
        }

        Ok(&self.groups)
    }

    /// Loads `base_dir/class_dir` for each entry, in map order.
    ///
    /// `template` supplies every option but the category; `reset` clears the
    /// collection once, before the first class.
    pub fn load_categories(
        &mut self,
        graph: &mut SceneGraph,
        entries: &[CategoryEntry],
        template: &LoadOptions,
    ) -> Result<&[AssetGroup]> {
        let base = self.base_dir.clone().ok_or_else(|| {
            SceneError::Config("a category map needs an asset base directory".into())
        })?;
        if template.reset {
            self.groups.clear();
        }
        let template = LoadOptions {
            reset: false,
            ..template.clone()
        };
        for entry in entries {
            let dir = base.join(&entry.class_dir);
            info!("Loading class {} '{}' from {}", entry.class_id, entry.class_name, dir.display());
            self.load(graph, Some(&dir), &template.for_category(entry))?;
        }
        Ok(&self.groups)
    }
}

/// Recursively collects files with a mesh extension, sorted by path.
pub fn discover_mesh_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.retain(|p| has_mesh_extension(p));
    files.sort();
    Ok(files)
}

/// Every regular file below `dir`, unsorted.
pub(crate) fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn has_mesh_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MESH_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(e)))
}

/// Merges the meshes of `ids[1..]` into `ids[0]` and removes the absorbed
/// objects. Returns the representative.
pub fn fuse_objects(graph: &mut SceneGraph, ids: &[ObjectId]) -> Option<ObjectId> {
    let (&first, rest) = ids.split_first()?;
    let to_local = graph.get(first)?.local_to_world().try_inverse()?;

    for &id in rest {
        let Some(part) = graph.remove(id) else {
            continue;
        };
        let to_world = part.local_to_world();
        let Some(part_data) = part.mesh_data() else {
            continue;
        };
        let mut mesh = part_data.mesh.clone();
        mesh.transform(&(to_local * to_world));

        if let Some(data) = graph.get_mut(first).and_then(SceneObject::mesh_data_mut) {
            data.mesh.merge(&mesh);
            data.materials.extend(part_data.materials.iter().cloned());
        }
    }
    Some(first)
}
