use crate::core::math::sampling::uniform;
use crate::scene::material::{DustError, Material};
use crate::weathering::WeatheringParams;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

/// What aging did to one material.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied {
    pub material: String,
    /// New roughness, when the socket was free to change.
    pub roughness: Option<f32>,
    /// Base-color multiplier, when the socket was free to change.
    pub base_color_mult: Option<f32>,
    pub dust_strength: f32,
    pub dust_scale: f32,
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("material does not use nodes")]
    NotNodeBased,
    #[error("dust not applied: {0}")]
    Dust(#[from] DustError),
}

/// A material the aging pass could not fully handle. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("material '{material}' on '{object}' skipped: {reason}")]
pub struct Skipped {
    pub object: String,
    pub material: String,
    pub reason: SkipReason,
}

/// Jitters roughness, darkens the base color and adds dust.
///
/// Linked sockets are left alone. Roughness always stays in `[0, 1]`.
pub fn age_material<R: Rng + ?Sized>(
    material: &mut Material,
    object: &str,
    rng: &mut R,
    params: &WeatheringParams,
) -> Result<Applied, Skipped> {
    let skipped = |material: &Material, reason| Skipped {
        object: object.to_string(),
        material: material.name.clone(),
        reason,
    };
    if !material.uses_nodes() {
        return Err(skipped(material, SkipReason::NotNodeBased));
    }

    let mut roughness = None;
    let mut base_color_mult = None;
    if let Some(bsdf) = material.principled_mut() {
        if !bsdf.roughness.linked {
            let cur = bsdf.roughness.value;
            let aged = (cur * (1.0 + uniform(rng, params.roughness_jitter))).clamp(0.0, 1.0);
            bsdf.roughness.value = aged;
            roughness = Some(aged);
        }
        if !bsdf.base_color.linked {
            let mult = uniform(rng, params.basecolor_mult);
            let [r, g, b, a] = bsdf.base_color.value;
            bsdf.base_color.value = [r * mult, g * mult, b * mult, a];
            base_color_mult = Some(mult);
        }
    }

    let dust_strength = uniform(rng, params.dust_strength);
    let dust_scale = uniform(rng, params.dust_scale);
    material
        .add_dust(dust_strength, dust_scale)
        .map_err(|e| skipped(material, e.into()))?;

    Ok(Applied {
        material: material.name.clone(),
        roughness,
        base_color_mult,
        dust_strength,
        dust_scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::{NodeTree, Socket};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn roughness_never_leaves_unit_range() {
        let params = WeatheringParams::default();
        let mut rng = StdRng::seed_from_u64(99);
        for start in [0.0, 0.5, 0.95, 1.0] {
            for _ in 0..200 {
                let mut mat = Material::new_principled("m", [0.5; 3], start);
                let applied = age_material(&mut mat, "obj", &mut rng, &params).unwrap();
                let r = applied.roughness.unwrap();
                assert!((0.0..=1.0).contains(&r));
                assert_eq!(mat.principled().unwrap().roughness.value, r);
            }
        }
    }

    #[test]
    fn base_color_darkens_and_keeps_alpha() {
        let params = WeatheringParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut mat = Material::new_principled("m", [1.0, 1.0, 1.0], 0.5);
        let applied = age_material(&mut mat, "obj", &mut rng, &params).unwrap();
        let [r, g, b, a] = mat.principled().unwrap().base_color.value;
        let mult = applied.base_color_mult.unwrap();
        assert!((0.85..0.95).contains(&mult));
        assert_eq!([r, g, b], [mult; 3]);
        assert_eq!(a, 1.0);
        assert!(mat.node_tree.unwrap().dust.is_some());
    }

    #[test]
    fn linked_sockets_are_untouched() {
        let params = WeatheringParams::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut mat = Material::new_principled("m", [0.4; 3], 0.3);
        if let Some(bsdf) = mat.principled_mut() {
            bsdf.roughness = Socket::linked(0.3);
            bsdf.base_color = Socket::linked([0.4, 0.4, 0.4, 1.0]);
        }
        let applied = age_material(&mut mat, "obj", &mut rng, &params).unwrap();
        assert_eq!(applied.roughness, None);
        assert_eq!(applied.base_color_mult, None);
        assert_eq!(mat.principled().unwrap().roughness.value, 0.3);
    }

    #[test]
    fn unsupported_materials_are_skipped() {
        let params = WeatheringParams::default();
        let mut rng = StdRng::seed_from_u64(1);

        let mut legacy = Material::without_nodes("legacy");
        let err = age_material(&mut legacy, "can", &mut rng, &params).unwrap_err();
        assert_eq!(err.reason, SkipReason::NotNodeBased);
        assert_eq!(err.object, "can");

        let mut bare = Material {
            name: "bare".into(),
            node_tree: Some(NodeTree::default()),
        };
        let err = age_material(&mut bare, "can", &mut rng, &params).unwrap_err();
        assert_eq!(err.reason, SkipReason::Dust(DustError::NoPrincipled));
        assert!(err.to_string().contains("bare"));
    }
}
