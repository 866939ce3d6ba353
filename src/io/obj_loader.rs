use crate::core::geometry::Vertex;
use crate::error::LoadError;
use crate::scene::deform::recompute_normals;
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::scene::scene_object::SceneObject;
use log::{info, warn};
use nalgebra::{Point3, Vector2, Vector3};
use std::path::Path;

/// Turns one asset file into scene objects.
pub trait MeshLoader {
    fn load(&self, path: &Path) -> Result<Vec<SceneObject>, LoadError>;
}

/// Default loader, dispatching on the file extension.
///
/// `.obj` files go through `tobj`; every model in the file becomes one mesh
/// object. `.blend` files are recognized but cannot be read here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl MeshLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Vec<SceneObject>, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "obj" => load_obj(path),
            _ => Err(LoadError::UnsupportedExtension(ext)),
        }
    }
}

/// Phong exponent to principled roughness.
fn roughness_from_shininess(ns: Option<f32>) -> f32 {
    match ns {
        Some(ns) => (1.0 - (ns.max(0.0) / 1000.0).sqrt()).clamp(0.0, 1.0),
        None => 0.5,
    }
}

fn convert_material(m: &tobj::Material) -> Material {
    let name = if m.name.is_empty() { "material" } else { m.name.as_str() };
    Material::new_principled(
        name,
        m.diffuse.unwrap_or([0.8, 0.8, 0.8]),
        roughness_from_shininess(m.shininess),
    )
}

/// Loads an OBJ file, one scene object per model.
///
/// OBJ is Y-up; positions and normals are rotated into the Z-up scene frame.
pub fn load_obj(path: &Path) -> Result<Vec<SceneObject>, LoadError> {
    info!("Loading OBJ file: {}", path.display());

    let load_options = tobj::LoadOptions {
        triangulate: true,
        single_index: true, // Unifies indices for Position/Normal/UV
        ..Default::default()
    };
    let (models, materials) = tobj::load_obj(path, &load_options)?;
    let materials: Vec<Material> = match materials {
        Ok(mats) => mats.iter().map(convert_material).collect(),
        Err(e) => {
            warn!("No usable MTL for '{}': {}", path.display(), e);
            Vec::new()
        }
    };

    let y_up_to_z_up = |x: f32, y: f32, z: f32| (x, -z, y);
    let mut objects = Vec::with_capacity(models.len());

    for model in models {
        let mesh = &model.mesh;
        let num_vertices = mesh.positions.len() / 3;
        let has_normals = mesh.normals.len() == mesh.positions.len();
        let has_texcoords = mesh.texcoords.len() / 2 == num_vertices;

        let vertices = (0..num_vertices)
            .map(|i| {
                let (px, py, pz) = y_up_to_z_up(
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                );
                let (nx, ny, nz) = if has_normals {
                    y_up_to_z_up(
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    )
                } else {
                    (0.0, 0.0, 1.0)
                };
                let (u, v) = if has_texcoords {
                    (mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1])
                } else {
                    (0.0, 0.0)
                };
                Vertex::new(Point3::new(px, py, pz), Vector3::new(nx, ny, nz), Vector2::new(u, v))
            })
            .collect();

        let mut geometry = Mesh::new(vertices, mesh.indices.clone());
        if !has_normals {
            recompute_normals(&mut geometry);
        }

        let material = mesh
            .material_id
            .and_then(|id| materials.get(id).cloned())
            .unwrap_or_default();
        let name = if model.name.is_empty() { "mesh" } else { model.name.as_str() };
        objects.push(SceneObject::new_mesh(name, geometry, vec![material]));
    }

    info!(
        "OBJ loaded: {} object(s) from {}",
        objects.len(),
        path.display()
    );
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trash_scenes_obj_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const TWO_PARTS: &str = "\
o lid
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o body
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 4 5 6 7
";

    #[test]
    fn loads_one_object_per_model() {
        let dir = scratch_dir("parts");
        let path = dir.join("can.obj");
        fs::write(&path, TWO_PARTS).unwrap();

        let objects = FileLoader.load(&path).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "lid");
        assert!(objects.iter().all(SceneObject::is_mesh));
        // The quad is triangulated.
        assert_eq!(objects[1].mesh_data().unwrap().mesh.triangle_count(), 2);
        // Y-up (0, 1, 0) ends up on +Z.
        let lid = objects[0].mesh_data().unwrap().mesh.bounds().unwrap();
        assert!((lid.max.z - 1.0).abs() < 1e-6);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_and_unsupported_files() {
        let dir = scratch_dir("errors");
        assert!(matches!(
            FileLoader.load(&dir.join("nope.obj")),
            Err(LoadError::NotFound(_))
        ));
        let blend = dir.join("chair.BLEND");
        fs::write(&blend, b"BLENDER").unwrap();
        assert!(matches!(
            FileLoader.load(&blend),
            Err(LoadError::UnsupportedExtension(ext)) if ext == "blend"
        ));
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn shininess_maps_to_roughness() {
        assert_eq!(roughness_from_shininess(None), 0.5);
        assert_eq!(roughness_from_shininess(Some(0.0)), 1.0);
        assert!(roughness_from_shininess(Some(1000.0)).abs() < 1e-6);
        assert!(roughness_from_shininess(Some(5000.0)) >= 0.0);
    }
}
