use crate::error::{Result, SceneError};
use crate::io::material_set::is_image;
use log::{info, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fs;
use std::path::{Path, PathBuf};

pub const BACKGROUND_EXTENSIONS: [&str; 5] = ["hdr", "exr", "png", "jpg", "jpeg"];

/// Readable environment images directly inside `dir`, sorted by path.
///
/// Files whose header cannot be decoded are skipped with a warning.
pub fn list_backgrounds(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image(p, &BACKGROUND_EXTENSIONS))
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .filter(|p| match image::image_dimensions(p) {
            Ok(_) => true,
            Err(e) => {
                warn!("Ignoring background '{}': {}", p.display(), e);
                false
            }
        })
        .collect())
}

pub fn choose_background<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Result<PathBuf> {
    let candidates = list_backgrounds(dir)?;
    let chosen = candidates
        .choose(rng)
        .cloned()
        .ok_or_else(|| SceneError::NoBackgrounds(dir.to_path_buf()))?;
    info!(
        "Background: {} (1 of {})",
        chosen.display(),
        candidates.len()
    );
    Ok(chosen)
}
