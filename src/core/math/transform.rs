use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

//=================================
// Transform Matrix Factory
//=================================

/// Factory for creating various transformation matrices.
/// Manually implemented to keep the convention explicit: right-handed, Z up,
/// Euler angles applied X first, then Y, then Z.
pub struct TransformFactory;

#[rustfmt::skip]
impl TransformFactory {
    /// Creates a rotation matrix around the X-axis.
    pub fn rotation_x(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c,  -s,   0.0,
            0.0, s,   c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a rotation matrix around the Y-axis.
    pub fn rotation_y(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            c,   0.0, s,   0.0,
            0.0, 1.0, 0.0, 0.0,
           -s,   0.0, c,   0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a rotation matrix around the Z-axis.
    pub fn rotation_z(angle_rad: f32) -> Matrix4<f32> {
        let c = angle_rad.cos();
        let s = angle_rad.sin();
        Matrix4::new(
            c,  -s,   0.0, 0.0,
            s,   c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a translation matrix.
    pub fn translation(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            1.0, 0.0, 0.0, translation.x,
            0.0, 1.0, 0.0, translation.y,
            0.0, 0.0, 1.0, translation.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Creates a non-uniform scaling matrix.
    pub fn scaling_nonuniform(scale: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new(
            scale.x, 0.0,     0.0,     0.0,
            0.0,     scale.y, 0.0,     0.0,
            0.0,     0.0,     scale.z, 0.0,
            0.0,     0.0,     0.0,     1.0,
        )
    }
}

impl TransformFactory {
    /// XYZ Euler rotation: `Rz * Ry * Rx`.
    pub fn euler_xyz(rotation_rad: &Vector3<f32>) -> Matrix4<f32> {
        Self::rotation_z(rotation_rad.z)
            * Self::rotation_y(rotation_rad.y)
            * Self::rotation_x(rotation_rad.x)
    }

    /// Full local-to-world matrix: `T * Rz * Ry * Rx * S`.
    pub fn compose(
        location: &Vector3<f32>,
        rotation_rad: &Vector3<f32>,
        scale: &Vector3<f32>,
    ) -> Matrix4<f32> {
        Self::translation(location) * Self::euler_xyz(rotation_rad) * Self::scaling_nonuniform(scale)
    }

    /// Camera orientation for a look direction.
    ///
    /// The camera looks down its local -Z with local +Y kept as close to world +Z
    /// as possible, then it is rolled by `inplane_rot` about its view axis.
    pub fn rotation_from_forward(forward: &Vector3<f32>, inplane_rot: f32) -> Matrix3<f32> {
        let z_axis = -forward.normalize();
        let mut up = Vector3::z();
        if up.cross(&z_axis).norm() < 1e-6 {
            // Looking straight up or down: world Y acts as the up hint.
            up = Vector3::y();
        }
        let x_axis = up.cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis);

        let look = Matrix3::from_columns(&[x_axis, y_axis, z_axis]);
        let roll = Self::rotation_z(inplane_rot).fixed_view::<3, 3>(0, 0).into_owned();
        look * roll
    }

    /// Rigid 4x4 transform from a position and a 3x3 rotation.
    pub fn build_transformation(location: &Point3<f32>, rotation: &Matrix3<f32>) -> Matrix4<f32> {
        let mut m = rotation.to_homogeneous();
        m[(0, 3)] = location.x;
        m[(1, 3)] = location.y;
        m[(2, 3)] = location.z;
        m
    }
}

/// Location, XYZ Euler rotation (radians) and an optional scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub location: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Option<Vector3<f32>>,
}

impl Transform {
    pub fn new(location: Vector3<f32>, rotation: Vector3<f32>) -> Self {
        Self {
            location,
            rotation,
            scale: None,
        }
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn is_finite(&self) -> bool {
        let finite = |v: &Vector3<f32>| v.iter().all(|c| c.is_finite());
        finite(&self.location) && finite(&self.rotation) && self.scale.as_ref().is_none_or(finite)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }
}

/// Applies a 4x4 transform to a point.
#[inline]
pub fn transform_point(m: &Matrix4<f32>, p: &Point3<f32>) -> Point3<f32> {
    Point3::from_homogeneous(m * p.to_homogeneous()).unwrap_or(*p)
}
