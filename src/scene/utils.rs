use crate::core::math::sampling::uniform;
use crate::scene::scene_object::SceneObject;
use rand::Rng;

/// Longest sides at or below this are treated as degenerate and left alone.
const DEGENERATE_SIZE: f32 = 1e-6;

/// Scales `obj` uniformly so its longest bounding-box side equals `target`.
///
/// Returns the applied factor, or `None` when the object has no usable size.
pub fn normalize_to_size(obj: &mut SceneObject, target: f32) -> Option<f32> {
    let longest = obj.dimensions().max();
    if longest <= DEGENERATE_SIZE {
        return None;
    }
    let factor = target / longest;
    obj.scale *= factor;
    Some(factor)
}

/// Draws a target size from `range` and normalizes `obj` to it.
pub fn normalize_to_random_size<R: Rng + ?Sized>(
    obj: &mut SceneObject,
    rng: &mut R,
    range: (f32, f32),
) -> Option<f32> {
    if obj.dimensions().max() <= DEGENERATE_SIZE {
        return None;
    }
    let target = uniform(rng, range);
    normalize_to_size(obj, target)
}
