use crate::scene::scene_object::ObjectId;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// Simple-deform methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeformMethod {
    Bend,
    Twist,
    Taper,
    Stretch,
}

impl DeformMethod {
    pub const ALL: [DeformMethod; 4] = [
        DeformMethod::Bend,
        DeformMethod::Twist,
        DeformMethod::Taper,
        DeformMethod::Stretch,
    ];

    /// Bend and twist take an angle, taper and stretch a factor.
    pub fn is_angular(self) -> bool {
        matches!(self, DeformMethod::Bend | DeformMethod::Twist)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// A non-destructive entry in an object's modifier stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Modifier {
    /// Offsets vertices along their normals by a cloud-noise texture.
    Displace {
        noise_scale: f32,
        strength: f32,
        mid_level: f32,
        seed: u32,
    },
    /// `amount` is an angle in radians for bend/twist and a factor otherwise.
    SimpleDeform {
        method: DeformMethod,
        axis: Axis,
        amount: f32,
    },
    /// Free-form deformation driven by a lattice helper object.
    Lattice { lattice: ObjectId },
}

impl Modifier {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Modifier::Displace { .. } => "displace",
            Modifier::SimpleDeform { .. } => "simple_deform",
            Modifier::Lattice { .. } => "lattice",
        }
    }
}

/// Control grid of a lattice deformer.
///
/// Control points rest on a regular grid spanning the unit cube
/// `[-0.5, 0.5]^3` in lattice space; `offsets` holds each point's displacement
/// from its rest position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lattice {
    pub resolution: [usize; 3],
    pub offsets: Vec<Vector3<f32>>,
}

impl Lattice {
    /// Resolution components are clamped to at least 2.
    pub fn new(resolution: [usize; 3]) -> Self {
        let resolution = resolution.map(|r| r.max(2));
        let count = resolution.iter().product();
        Self {
            resolution,
            offsets: vec![Vector3::zeros(); count],
        }
    }

    pub fn point_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn index(&self, u: usize, v: usize, w: usize) -> usize {
        let [nu, nv, _] = self.resolution;
        (w * nv + v) * nu + u
    }

    pub fn rest_position(&self, u: usize, v: usize, w: usize) -> Point3<f32> {
        let coord = |i: usize, n: usize| i as f32 / (n - 1) as f32 - 0.5;
        let [nu, nv, nw] = self.resolution;
        Point3::new(coord(u, nu), coord(v, nv), coord(w, nw))
    }

    /// Trilinear interpolation of control offsets at a lattice-space point.
    /// Points outside the unit cube take the offset of the nearest cell.
    pub fn offset_at(&self, p: &Point3<f32>) -> Vector3<f32> {
        let mut cell = [0usize; 3];
        let mut frac = [0.0f32; 3];
        for axis in 0..3 {
            let n = self.resolution[axis];
            let t = ((p[axis] + 0.5).clamp(0.0, 1.0)) * (n - 1) as f32;
            let i = (t.floor() as usize).min(n - 2);
            cell[axis] = i;
            frac[axis] = t - i as f32;
        }

        let mut acc = Vector3::zeros();
        for dw in 0..2 {
            for dv in 0..2 {
                for du in 0..2 {
                    let weight = (if du == 1 { frac[0] } else { 1.0 - frac[0] })
                        * (if dv == 1 { frac[1] } else { 1.0 - frac[1] })
                        * (if dw == 1 { frac[2] } else { 1.0 - frac[2] });
                    let idx = self.index(cell[0] + du, cell[1] + dv, cell[2] + dw);
                    acc += self.offsets[idx] * weight;
                }
            }
        }
        acc
    }
}
