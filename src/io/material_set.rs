use crate::error::{Result, SceneError};
use crate::scene::material::Material;
use crate::scene::texture::Texture;
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "tga"];

/// File-name hints for the color map inside a material folder.
const COLOR_HINTS: [&str; 4] = ["color", "diffuse", "albedo", "basecolor"];

pub(crate) fn is_image(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "material".to_string())
}

/// The color texture of a material folder: the first image whose name hints
/// at color, otherwise the first image.
fn color_texture(dir: &Path) -> Option<PathBuf> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p, &IMAGE_EXTENSIONS))
        .collect();
    images.sort();
    let hinted = images.iter().find(|p| {
        let name = stem_of(p).to_ascii_lowercase();
        COLOR_HINTS.iter().any(|h| name.contains(h))
    });
    hinted.or(images.first()).cloned()
}

/// Builds one principled material per sub-folder (or loose image) of `dir`,
/// colored by the mean of its color texture.
///
/// Textures are decoded in parallel; the result follows sorted path order.
pub fn load_material_set(dir: &Path) -> Result<Vec<Material>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let sources: Vec<(String, PathBuf)> = entries
        .into_iter()
        .filter_map(|p| {
            if p.is_dir() {
                color_texture(&p).map(|tex| (stem_of(&p), tex))
            } else if is_image(&p, &IMAGE_EXTENSIONS) {
                Some((stem_of(&p), p))
            } else {
                None
            }
        })
        .collect();

    let materials: Vec<Material> = sources
        .par_iter()
        .filter_map(|(name, path)| match Texture::load(path) {
            Ok(tex) => {
                let c = tex.average_color();
                Some(Material::new_principled(name, [c.x, c.y, c.z], 0.5))
            }
            Err(e) => {
                warn!("Skipping material texture '{}': {}", path.display(), e);
                None
            }
        })
        .collect();

    if materials.is_empty() {
        return Err(SceneError::NoMaterials(dir.to_path_buf()));
    }
    info!("Loaded {} material(s) from {}", materials.len(), dir.display());
    Ok(materials)
}
