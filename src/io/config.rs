use crate::error::Result;
use crate::scene::camera::{InteriorCamera, OrbitSampler};
use crate::scene::placement::{FreePlacement, RotationMode, SurfacePlacement};
use crate::scene::room::RoomConfig;
use crate::weathering::WeatheringParams;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Generation settings, read from a TOML file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Seed of the shared generator; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub room: RoomSection,
    #[serde(default)]
    pub weathering: WeatheringConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub light: LightConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn default_true() -> bool {
    true
}

// --- Assets ---

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// JSON list of `{class_id, class_dir, class_name}` below `base_dir`.
    #[serde(default)]
    pub category_map: Option<PathBuf>,
    #[serde(default = "default_dataset")]
    pub dataset: String,
    #[serde(default = "default_true")]
    pub fuse_parts: bool,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            category_map: None,
            dataset: default_dataset(),
            fuse_parts: true,
        }
    }
}

fn default_dataset() -> String {
    "trash".to_string()
}

// --- Free placement ---

#[derive(Debug, Clone, Deserialize)]
pub struct PlacementConfig {
    #[serde(default = "default_placement_min")]
    pub min: [f32; 3],
    #[serde(default = "default_placement_max")]
    pub max: [f32; 3],
    #[serde(default = "default_rotation")]
    pub rotation: RotationMode,
    #[serde(default = "default_free_tries")]
    pub max_tries: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min: default_placement_min(),
            max: default_placement_max(),
            rotation: default_rotation(),
            max_tries: default_free_tries(),
        }
    }
}

impl PlacementConfig {
    pub fn free_placement(&self) -> FreePlacement {
        FreePlacement {
            min: Vector3::from(self.min),
            max: Vector3::from(self.max),
            rotation: self.rotation,
            max_tries: self.max_tries,
        }
    }
}

fn default_placement_min() -> [f32; 3] {
    [-5.0, -5.0, 0.0]
}
fn default_placement_max() -> [f32; 3] {
    [5.0, 5.0, 5.0]
}
fn default_rotation() -> RotationMode {
    RotationMode::Half
}
fn default_free_tries() -> usize {
    1000
}

// --- Camera ---

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_num_views")]
    pub num_views: usize,
    #[serde(default = "default_distance_factor")]
    pub distance_factor: f32,
    #[serde(default = "default_radius_jitter")]
    pub radius_jitter: (f32, f32),
    #[serde(default = "default_azimuth")]
    pub azimuth_deg: (f32, f32),
    #[serde(default = "default_elevation")]
    pub elevation_deg: (f32, f32),
    #[serde(default = "default_interior_height")]
    pub interior_height: (f32, f32),
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            num_views: default_num_views(),
            distance_factor: default_distance_factor(),
            radius_jitter: default_radius_jitter(),
            azimuth_deg: default_azimuth(),
            elevation_deg: default_elevation(),
            interior_height: default_interior_height(),
        }
    }
}

impl CameraConfig {
    pub fn orbit(&self) -> OrbitSampler {
        OrbitSampler {
            radius_jitter: self.radius_jitter,
            azimuth_deg: self.azimuth_deg,
            elevation_deg: self.elevation_deg,
        }
    }

    pub fn interior(&self) -> InteriorCamera {
        InteriorCamera {
            height: self.interior_height,
            ..InteriorCamera::default()
        }
    }
}

fn default_num_views() -> usize {
    5
}
fn default_distance_factor() -> f32 {
    1.5
}
fn default_radius_jitter() -> (f32, f32) {
    (0.9, 1.2)
}
fn default_azimuth() -> (f32, f32) {
    (0.0, 360.0)
}
fn default_elevation() -> (f32, f32) {
    (10.0, 45.0)
}
fn default_interior_height() -> (f32, f32) {
    (1.4, 1.7)
}

// --- Room ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomSection {
    pub enabled: bool,
    pub materials_dir: PathBuf,
    pub furniture_root: PathBuf,
    pub target_count: usize,
    pub floor_area: f32,
    pub wall_height: f32,
    pub target_size_range: (f32, f32),
    pub amount_of_extrusions: u32,
    pub corridor_width: f32,
    pub objects_per_sq_meter: f32,
    pub ceiling_emission: Option<(f32, f32)>,
    // Trash dropped on the floor.
    pub trash_min_height: f32,
    pub trash_max_height: f32,
    pub trash_min_distance: f32,
    pub trash_max_distance: f32,
}

impl Default for RoomSection {
    fn default() -> Self {
        Self {
            enabled: false,
            materials_dir: PathBuf::from("assets/cc_textures"),
            furniture_root: PathBuf::from("assets/furniture"),
            target_count: 10,
            floor_area: 25.0,
            wall_height: 2.8,
            target_size_range: (0.6, 1.6),
            amount_of_extrusions: 0,
            corridor_width: 0.9,
            objects_per_sq_meter: 0.3,
            ceiling_emission: Some((2.0, 6.0)),
            trash_min_height: 0.0,
            trash_max_height: 0.3,
            trash_min_distance: 0.1,
            trash_max_distance: 2.0,
        }
    }
}

impl RoomSection {
    pub fn room_config(&self, dataset: &str) -> RoomConfig {
        RoomConfig {
            materials_dir: self.materials_dir.clone(),
            furniture_root: self.furniture_root.clone(),
            target_count: self.target_count,
            floor_area: self.floor_area,
            wall_height: self.wall_height,
            target_size_range: self.target_size_range,
            amount_of_extrusions: self.amount_of_extrusions,
            corridor_width: self.corridor_width,
            objects_per_sq_meter: self.objects_per_sq_meter,
            ceiling_emission: self.ceiling_emission,
            dataset: dataset.to_string(),
        }
    }

    pub fn trash_placement(&self) -> SurfacePlacement {
        SurfacePlacement {
            min_height: self.trash_min_height,
            max_height: self.trash_max_height,
            min_distance: self.trash_min_distance,
            max_distance: self.trash_max_distance,
            ..SurfacePlacement::default()
        }
    }
}

// --- Weathering ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatheringConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: WeatheringParams,
}

// --- Background / light ---

#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_background_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_background_strength")]
    pub strength: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_background_dir(),
            strength: default_background_strength(),
        }
    }
}

fn default_background_dir() -> PathBuf {
    PathBuf::from("assets/backgrounds")
}
fn default_background_strength() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    #[serde(default = "default_light_location")]
    pub location: [f32; 3],
    #[serde(default = "default_light_energy")]
    pub energy: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            location: default_light_location(),
            energy: default_light_energy(),
        }
    }
}

fn default_light_location() -> [f32; 3] {
    [0.0, 0.0, 5.0]
}
fn default_light_energy() -> f32 {
    5.0
}

// --- Render / output ---

/// Passed through to the external renderer via the manifest.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_true")]
    pub denoiser: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            max_samples: default_max_samples(),
            device: default_device(),
            denoiser: true,
        }
    }
}

fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_max_samples() -> u32 {
    128
}
fn default_device() -> String {
    "cpu".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
