use crate::core::math::transform::transform_point;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

/// Represents a single vertex in 3D space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in local object space.
    pub position: Point3<f32>,
    /// Normal vector, used as the displacement direction.
    pub normal: Vector3<f32>,
    /// Texture coordinates (UV).
    pub texcoord: Vector2<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, texcoord: Vector2<f32>) -> Self {
        Self {
            position,
            normal,
            texcoord,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Tight box around a point set. `None` when the set is empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Aabb::new(first, first);
        for p in iter {
            bb.min = bb.min.inf(p);
            bb.max = bb.max.sup(p);
        }
        Some(bb)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// The 8 corner points, in the order min-x/min-y/min-z first.
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(b.x, b.y, b.z),
            Point3::new(b.x, b.y, a.z),
        ]
    }

    /// Box around this box's corners mapped through `m`.
    pub fn transformed(&self, m: &Matrix4<f32>) -> Option<Aabb> {
        let corners = self.corners().map(|c| transform_point(m, &c));
        Aabb::from_points(corners.iter())
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f32 {
        diagonal_length(&self.extent())
    }

    pub fn longest_side(&self) -> f32 {
        self.extent().max()
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Slab test. Returns the entry distance along `dir` when the ray hits.
    pub fn ray_hit(&self, origin: &Point3<f32>, dir: &Vector3<f32>) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-12 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Aggregates boxes into a single scene-wide box.
pub fn aggregate_bounds<I>(boxes: I) -> Option<Aabb>
where
    I: IntoIterator<Item = Aabb>,
{
    boxes.into_iter().reduce(|acc, bb| acc.union(&bb))
}

/// Length of a box diagonal given its per-axis dimensions.
pub fn diagonal_length(dimensions: &Vector3<f32>) -> f32 {
    (dimensions.x * dimensions.x + dimensions.y * dimensions.y + dimensions.z * dimensions.z).sqrt()
}

/// Spherical to Cartesian, with elevation measured from the horizontal plane.
pub fn sph_to_cart(radius: f32, az_deg: f32, el_deg: f32) -> Vector3<f32> {
    let az = az_deg.to_radians();
    let el = el_deg.to_radians();
    Vector3::new(
        radius * el.cos() * az.cos(),
        radius * el.cos() * az.sin(),
        radius * el.sin(),
    )
}
