use crate::core::geometry::{aggregate_bounds, sph_to_cart};
use crate::core::math::sampling::uniform;
use crate::core::math::transform::TransformFactory;
use crate::error::{Result, SceneError};
use crate::scene::graph::SceneGraph;
use crate::scene::loader::AssetGroup;
use crate::scene::placement::UpperRegionSampler;
use crate::scene::room::RoomShell;
use log::{debug, warn};
use nalgebra::{Matrix4, Point3, Vector3};
use rand::Rng;
use std::f32::consts::TAU;

/// A camera-to-world rigid transform. The camera looks down its local -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub matrix: Matrix4<f32>,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }
}

impl CameraPose {
    /// Pose at `position` looking along `forward`, rolled by `inplane_rot`.
    pub fn look_along(position: &Point3<f32>, forward: &Vector3<f32>, inplane_rot: f32) -> Self {
        let rotation = TransformFactory::rotation_from_forward(forward, inplane_rot);
        Self {
            matrix: TransformFactory::build_transformation(position, &rotation),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// World-space view direction.
    pub fn forward(&self) -> Vector3<f32> {
        -self.matrix.fixed_view::<3, 1>(0, 2).into_owned()
    }

    /// Row-major nested arrays.
    pub fn to_rows(&self) -> [[f32; 4]; 4] {
        let m = &self.matrix;
        std::array::from_fn(|r| std::array::from_fn(|c| m[(r, c)]))
    }
}

//=================================
// Orbit framing
//=================================

/// Bounding sphere of every mesh in `groups`.
///
/// Returns the center of the aggregated box and a radius of
/// `max(longest extent, 1) * distance_factor`.
pub fn find_camera_radius(
    graph: &SceneGraph,
    groups: &[AssetGroup],
    distance_factor: f32,
) -> Result<(Point3<f32>, f32)> {
    let mut boxes = Vec::new();
    for &id in groups.iter().flat_map(|g| g.objects.iter()) {
        let Some(obj) = graph.get(id) else {
            continue;
        };
        match graph.world_aabb(id) {
            Some(bb) => boxes.push(bb),
            None => warn!("Skipping non-mesh object '{}' ({})", obj.name, obj.kind.name()),
        }
    }

    let scene = aggregate_bounds(boxes).ok_or(SceneError::EmptyScene)?;
    let radius = scene.longest_side().max(1.0) * distance_factor;
    debug!("Scene bounds {:?}..{:?}, camera radius {:.3}", scene.min, scene.max, radius);
    Ok((scene.center(), radius))
}

/// Ranges for orbit camera sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitSampler {
    /// Multiplier on the base radius.
    pub radius_jitter: (f32, f32),
    pub azimuth_deg: (f32, f32),
    pub elevation_deg: (f32, f32),
}

impl Default for OrbitSampler {
    fn default() -> Self {
        Self {
            radius_jitter: (0.9, 1.2),
            azimuth_deg: (0.0, 360.0),
            elevation_deg: (10.0, 45.0),
        }
    }
}

/// Adds one camera on a jittered sphere around `center`, looking at it.
pub fn add_orbit_camera_pose<R: Rng + ?Sized>(
    graph: &mut SceneGraph,
    rng: &mut R,
    center: &Point3<f32>,
    base_radius: f32,
    params: &OrbitSampler,
) -> CameraPose {
    let radius = base_radius * uniform(rng, params.radius_jitter);
    let az = uniform(rng, params.azimuth_deg);
    let el = uniform(rng, params.elevation_deg);
    let position = center + sph_to_cart(radius, az, el);

    let forward = center - position;
    let pose = CameraPose::look_along(&position, &forward, uniform(rng, (0.0, TAU)));
    graph.add_camera_pose(pose);
    pose
}

//=================================
// Interior framing
//=================================

#[derive(Debug, Clone, PartialEq)]
pub struct InteriorCamera {
    /// Height band above the floor.
    pub height: (f32, f32),
    pub use_ray_trace_check: bool,
}

impl Default for InteriorCamera {
    fn default() -> Self {
        Self {
            height: (1.4, 1.7),
            use_ray_trace_check: true,
        }
    }
}

/// Direction from `position` toward `target`, or straight down when the two
/// coincide.
pub fn interior_forward(position: &Point3<f32>, target: &Point3<f32>) -> Vector3<f32> {
    let forward = target - position;
    if forward.norm() < 1e-6 {
        Vector3::new(0.0, 0.0, -1.0)
    } else {
        forward
    }
}

/// Adds one camera standing inside the room, aimed at the floor center.
pub fn add_interior_camera_pose<R: Rng + ?Sized>(
    graph: &mut SceneGraph,
    shell: &RoomShell,
    rng: &mut R,
    params: &InteriorCamera,
) -> Result<CameraPose> {
    let floor = shell.floor().ok_or(SceneError::NoFloor)?;
    let floor_box = graph.world_aabb(floor).ok_or(SceneError::NoFloor)?;

    let sampler = UpperRegionSampler {
        surface: floor,
        min_height: params.height.0,
        max_height: params.height.1,
        use_ray_trace_check: params.use_ray_trace_check,
    };
    let position = sampler.sample(graph, rng).ok_or(SceneError::NoFloor)?;
    let forward = interior_forward(&position, &floor_box.center());

    let pose = CameraPose::look_along(&position, &forward, uniform(rng, (0.0, TAU)));
    graph.add_camera_pose(pose);
    Ok(pose)
}
