use serde::Serialize;

/// Represents a light source in the scene. Position and orientation live on
/// the owning scene object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Light {
    /// A light source that is infinitely far away. Rays are parallel.
    Sun { color: [f32; 3], energy: f32 },
}

impl Light {
    pub fn new_sun(energy: f32) -> Self {
        Self::Sun {
            color: [1.0, 1.0, 1.0],
            energy,
        }
    }
}
