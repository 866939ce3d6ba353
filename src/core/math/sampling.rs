use nalgebra::Vector3;
use rand::Rng;

/// Uniform draw from `[lo, hi)`. Degenerate or inverted ranges return `lo`.
#[inline]
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Per-axis uniform draw inside the box spanned by `min` and `max`.
pub fn uniform_vec3<R: Rng + ?Sized>(rng: &mut R, min: &Vector3<f32>, max: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(
        uniform(rng, (min.x, max.x)),
        uniform(rng, (min.y, max.y)),
        uniform(rng, (min.z, max.z)),
    )
}

/// Bernoulli gate.
#[inline]
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f32) -> bool {
    rng.random::<f32>() < p
}
