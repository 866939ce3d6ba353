//! Geometry kernels behind the modifier stack.
//!
//! All functions work in the mesh's local space unless a matrix says otherwise.

use crate::core::math::transform::transform_point;
use crate::scene::mesh::Mesh;
use crate::scene::modifier::{Axis, DeformMethod, Lattice};
use nalgebra::{Matrix4, Point3, Vector3};

//=================================
// Noise
//=================================

#[inline]
fn hash3(ix: i32, iy: i32, iz: i32, seed: u32) -> f32 {
    let mut h = (ix as u32).wrapping_mul(0x8da6_b343)
        ^ (iy as u32).wrapping_mul(0xd816_3841)
        ^ (iz as u32).wrapping_mul(0xcb1a_b31f)
        ^ seed.wrapping_mul(0x1656_67b1);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^= h >> 15;
    (h & 0x00ff_ffff) as f32 / 16_777_215.0
}

#[inline]
fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Lattice value noise in `[0, 1]`.
pub fn value_noise(p: &Point3<f32>, seed: u32) -> f32 {
    let base = p.map(f32::floor);
    let f = p - base;
    let (ix, iy, iz) = (base.x as i32, base.y as i32, base.z as i32);
    let (u, v, w) = (smoothstep(f.x), smoothstep(f.y), smoothstep(f.z));

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let corner = |dx: i32, dy: i32, dz: i32| hash3(ix + dx, iy + dy, iz + dz, seed);

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), u);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), u);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), u);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), u);
    lerp(lerp(x00, x10, v), lerp(x01, x11, v), w)
}

/// Three-octave fractal of [`value_noise`], normalized back to `[0, 1]`.
pub fn cloud_noise(p: &Point3<f32>, seed: u32) -> f32 {
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;
    for octave in 0..3u32 {
        sum += value_noise(&(p * frequency), seed.wrapping_add(octave)) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    sum / norm
}

//=================================
// Deformations
//=================================

/// Moves every vertex along its normal by `(noise - mid_level) * strength`.
pub fn displace(mesh: &mut Mesh, noise_scale: f32, strength: f32, mid_level: f32, seed: u32) {
    let inv_scale = 1.0 / noise_scale.max(1e-6);
    for vertex in &mut mesh.vertices {
        let n = cloud_noise(&(vertex.position * inv_scale), seed);
        vertex.position += vertex.normal * ((n - mid_level) * strength);
    }
}

/// Bend, twist, taper or stretch along `axis`, measured over the mesh bounds.
pub fn simple_deform(mesh: &mut Mesh, method: DeformMethod, axis: Axis, amount: f32) {
    let Some(bb) = mesh.bounds() else {
        return;
    };
    let a = axis.index();
    let b = (a + 1) % 3;
    let c = (a + 2) % 3;
    let center = bb.center();
    let extent = bb.extent();
    if extent[a] < 1e-9 {
        return;
    }

    match method {
        DeformMethod::Twist => {
            for vertex in &mut mesh.vertices {
                let p = &mut vertex.position;
                let t = (p[a] - center[a]) / extent[a];
                let (s, co) = (amount * t).sin_cos();
                let (db, dc) = (p[b] - center[b], p[c] - center[c]);
                p[b] = center[b] + db * co - dc * s;
                p[c] = center[c] + db * s + dc * co;
            }
        }
        DeformMethod::Bend => {
            // The coordinate along `b` is wrapped onto an arc around `axis`
            // whose total angle is `amount`.
            if amount.abs() < 1e-6 || extent[b] < 1e-9 {
                return;
            }
            let r = extent[b] / amount;
            for vertex in &mut mesh.vertices {
                let p = &mut vertex.position;
                let s = p[b] - center[b];
                let d = p[c] - center[c];
                let theta = s / r;
                p[b] = center[b] + (r - d) * theta.sin();
                p[c] = center[c] + r - (r - d) * theta.cos();
            }
        }
        DeformMethod::Taper => {
            for vertex in &mut mesh.vertices {
                let p = &mut vertex.position;
                let t = (p[a] - center[a]) / extent[a];
                let k = 1.0 + 2.0 * amount * t;
                p[b] = center[b] + (p[b] - center[b]) * k;
                p[c] = center[c] + (p[c] - center[c]) * k;
            }
        }
        DeformMethod::Stretch => {
            let s = 1.0 + amount;
            if s <= 1e-6 {
                return;
            }
            let side = 1.0 / s.sqrt();
            for vertex in &mut mesh.vertices {
                let p = &mut vertex.position;
                p[a] = center[a] + (p[a] - center[a]) * s;
                p[b] = center[b] + (p[b] - center[b]) * side;
                p[c] = center[c] + (p[c] - center[c]) * side;
            }
        }
    }
}

/// Free-form deformation of a mesh by a lattice helper.
pub fn lattice_deform(
    mesh: &mut Mesh,
    object_to_world: &Matrix4<f32>,
    lattice_to_world: &Matrix4<f32>,
    lattice: &Lattice,
) {
    let (Some(world_to_object), Some(world_to_lattice)) =
        (object_to_world.try_inverse(), lattice_to_world.try_inverse())
    else {
        return;
    };
    let lattice_linear = lattice_to_world.fixed_view::<3, 3>(0, 0).into_owned();
    let object_linear_inv = world_to_object.fixed_view::<3, 3>(0, 0).into_owned();

    for vertex in &mut mesh.vertices {
        let world = transform_point(object_to_world, &vertex.position);
        let in_lattice = transform_point(&world_to_lattice, &world);
        let offset_world = lattice_linear * lattice.offset_at(&in_lattice);
        vertex.position += object_linear_inv * offset_world;
    }
}

/// Area-weighted vertex normals from the triangle list.
pub fn recompute_normals(mesh: &mut Mesh) {
    let mut acc = vec![Vector3::zeros(); mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= acc.len() || i1 >= acc.len() || i2 >= acc.len() {
            continue;
        }
        let p0 = mesh.vertices[i0].position;
        let n = (mesh.vertices[i1].position - p0).cross(&(mesh.vertices[i2].position - p0));
        acc[i0] += n;
        acc[i1] += n;
        acc[i2] += n;
    }
    for (vertex, n) in mesh.vertices.iter_mut().zip(acc) {
        if n.norm() > 1e-12 {
            vertex.normal = n.normalize();
        }
    }
}
