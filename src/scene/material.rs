use serde::Serialize;
use thiserror::Error;

/// A shader input. A linked socket is driven by another node and its default
/// value has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Socket<T> {
    pub value: T,
    pub linked: bool,
}

impl<T> Socket<T> {
    pub fn unlinked(value: T) -> Self {
        Self {
            value,
            linked: false,
        }
    }

    pub fn linked(value: T) -> Self {
        Self {
            value,
            linked: true,
        }
    }
}

/// Parameters of a Principled BSDF node (Metallic-Roughness workflow).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrincipledBsdf {
    /// Base color, RGBA.
    pub base_color: Socket<[f32; 4]>,
    /// Roughness (0.0 = smooth, 1.0 = rough).
    pub roughness: Socket<f32>,
    /// Metallic (0.0 = dielectric, 1.0 = metal).
    pub metallic: Socket<f32>,
}

impl Default for PrincipledBsdf {
    fn default() -> Self {
        Self {
            base_color: Socket::unlinked([0.8, 0.8, 0.8, 1.0]),
            roughness: Socket::unlinked(0.5),
            metallic: Socket::unlinked(0.0),
        }
    }
}

/// Procedural dust mixed on top of the surface shader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DustLayer {
    pub strength: f32,
    pub texture_scale: f32,
}

/// Light emitted by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Emission {
    pub color: [f32; 3],
    pub strength: f32,
}

/// Why a dust layer could not be mixed in.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DustError {
    #[error("material does not use nodes")]
    NoNodeTree,
    #[error("no Principled BSDF to mix dust into")]
    NoPrincipled,
}

/// The subset of a shader node tree that scene composition touches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeTree {
    pub principled: Option<PrincipledBsdf>,
    pub dust: Option<DustLayer>,
    pub emission: Option<Emission>,
}

/// Defines how an object interacts with light.
///
/// Materials without a node tree are legacy/fixed-function materials and are
/// never aged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub node_tree: Option<NodeTree>,
}

impl Default for Material {
    fn default() -> Self {
        Material::new_principled("default", [0.8, 0.8, 0.8], 0.5)
    }
}

impl Material {
    pub fn new_principled(name: &str, base_color: [f32; 3], roughness: f32) -> Self {
        let [r, g, b] = base_color;
        Self {
            name: name.to_string(),
            node_tree: Some(NodeTree {
                principled: Some(PrincipledBsdf {
                    base_color: Socket::unlinked([r, g, b, 1.0]),
                    roughness: Socket::unlinked(roughness.clamp(0.0, 1.0)),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }

    pub fn without_nodes(name: &str) -> Self {
        Self {
            name: name.to_string(),
            node_tree: None,
        }
    }

    pub fn uses_nodes(&self) -> bool {
        self.node_tree.is_some()
    }

    pub fn principled(&self) -> Option<&PrincipledBsdf> {
        self.node_tree.as_ref()?.principled.as_ref()
    }

    pub fn principled_mut(&mut self) -> Option<&mut PrincipledBsdf> {
        self.node_tree.as_mut()?.principled.as_mut()
    }

    /// Mixes a dust layer into the surface shader.
    pub fn add_dust(&mut self, strength: f32, texture_scale: f32) -> Result<(), DustError> {
        let tree = self.node_tree.as_mut().ok_or(DustError::NoNodeTree)?;
        if tree.principled.is_none() {
            return Err(DustError::NoPrincipled);
        }
        tree.dust = Some(DustLayer {
            strength,
            texture_scale,
        });
        Ok(())
    }

    /// Turns the surface into an area emitter tinted by its base color.
    pub fn make_emissive(&mut self, strength: f32) {
        let color = self
            .principled()
            .map(|p| {
                let [r, g, b, _] = p.base_color.value;
                [r, g, b]
            })
            .unwrap_or([1.0, 1.0, 1.0]);
        let tree = self.node_tree.get_or_insert_with(NodeTree::default);
        tree.emission = Some(Emission { color, strength });
    }
}
