use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a scene-generation run.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A required directory or path could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no mesh files found under {0}")]
    NoMeshFiles(PathBuf),
    /// No mesh contributed a bounding box.
    #[error("no mesh objects with bounding boxes were loaded; check the asset folder and loader")]
    EmptyScene,
    #[error("no floor part found; build a room before placing interior cameras or objects")]
    NoFloor,
    #[error("no background images found in {0}")]
    NoBackgrounds(PathBuf),
    #[error("no usable materials found in {0}")]
    NoMaterials(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("failed to parse category map: {0}")]
    CategoryMap(#[from] serde_json::Error),
    #[error("failed to write scene manifest: {0}")]
    Manifest(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;

/// Per-asset failures. These are logged and the asset is skipped.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("unsupported asset extension '{0}'")]
    UnsupportedExtension(String),
    #[error("failed to load OBJ: {0}")]
    Obj(#[from] tobj::LoadError),
}
