//! `scene.json`: everything an external renderer and annotation writer need
//! to reproduce a composed scene.

use crate::error::{Result, SceneError};
use crate::io::config::RenderConfig;
use crate::scene::graph::SceneGraph;
use crate::scene::light::Light;
use crate::scene::material::Material;
use crate::scene::modifier::{Lattice, Modifier};
use crate::scene::scene_object::{ObjectId, ObjectKind, PropertyValue};
use crate::weathering::aging::Skipped;
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "scene.json";

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

#[derive(Debug, Serialize)]
pub struct ObjectEntry<'a> {
    pub id: ObjectId,
    pub name: &'a str,
    pub kind: &'static str,
    pub location: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    /// Location, rotation and scale are relative to this object when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    pub properties: &'a BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "is_empty")]
    pub modifiers: &'a [Modifier],
    #[serde(skip_serializing_if = "is_empty")]
    pub materials: &'a [Material],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triangles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<&'a Light>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lattice: Option<&'a Lattice>,
}

#[derive(Debug, Serialize)]
pub struct WorldEntry<'a> {
    pub background: Option<&'a Path>,
    pub strength: f32,
}

#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub generated_at: String,
    pub seed: Option<u64>,
    pub render: &'a RenderConfig,
    pub world: WorldEntry<'a>,
    pub objects: Vec<ObjectEntry<'a>>,
    /// Row-major camera-to-world matrices.
    pub camera_poses: Vec<[[f32; 4]; 4]>,
    pub diagnostics: &'a [Skipped],
}

impl<'a> Manifest<'a> {
    pub fn from_graph(
        graph: &'a SceneGraph,
        render: &'a RenderConfig,
        seed: Option<u64>,
        diagnostics: &'a [Skipped],
    ) -> Self {
        let objects = graph
            .iter()
            .map(|(id, obj)| {
                let mut entry = ObjectEntry {
                    id,
                    name: &obj.name,
                    kind: obj.kind.name(),
                    location: obj.location.into(),
                    rotation: obj.rotation.into(),
                    scale: obj.scale.into(),
                    parent: obj.parent,
                    properties: &obj.properties,
                    modifiers: &[],
                    materials: &[],
                    triangles: None,
                    light: None,
                    lattice: None,
                };
                match &obj.kind {
                    ObjectKind::Mesh(data) => {
                        entry.modifiers = &data.modifiers;
                        entry.materials = &data.materials;
                        entry.triangles = Some(data.mesh.triangle_count());
                    }
                    ObjectKind::Light(light) => entry.light = Some(light),
                    ObjectKind::Lattice(lattice) => entry.lattice = Some(lattice),
                }
                entry
            })
            .collect();

        Self {
            generated_at: Utc::now().to_rfc3339(),
            seed,
            render,
            world: WorldEntry {
                background: graph.world.background.as_deref(),
                strength: graph.world.strength,
            },
            objects,
            camera_poses: graph.camera_poses().iter().map(|p| p.to_rows()).collect(),
            diagnostics,
        }
    }

    /// Writes the manifest into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, self).map_err(SceneError::Manifest)?;
        info!(
            "Wrote {} ({} object(s), {} camera pose(s))",
            path.display(),
            self.objects.len(),
            self.camera_poses.len()
        );
        Ok(path)
    }
}
