//! Randomized, constraint-checked object poses.
//!
//! Candidates that fail a constraint are redrawn until the per-object budget
//! runs out. An exhausted object keeps its last candidate; the run goes on and
//! the shortfall shows up in [`PlacementStats`].

use crate::core::geometry::Aabb;
use crate::core::math::sampling::{uniform, uniform_vec3};
use crate::core::math::transform::Transform;
use crate::error::{Result, SceneError};
use crate::scene::graph::SceneGraph;
use crate::scene::loader::AssetGroup;
use crate::scene::scene_object::{ObjectId, SceneObject};
use log::debug;
use nalgebra::{Point3, Vector2, Vector3};
use rand::Rng;
use serde::Deserialize;
use std::f32::consts::{PI, TAU};

/// Attempts before the upper-region sampler gives up on the ray check.
const UPPER_REGION_MAX_TRIES: usize = 1000;

/// Outcome counters of one placement call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementStats {
    pub placed: usize,
    /// Objects left at their last candidate after the budget ran out.
    pub exhausted: usize,
    pub attempts: usize,
}

/// Range of sampled Euler angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationMode {
    /// `[0, π]` on every axis.
    Half,
    /// `[0, 2π]` on every axis.
    Full,
    /// `[0, 2π]` about Z only.
    Yaw,
}

impl RotationMode {
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Vector3<f32> {
        match self {
            RotationMode::Half => uniform_vec3(rng, &Vector3::zeros(), &Vector3::repeat(PI)),
            RotationMode::Full => uniform_vec3(rng, &Vector3::zeros(), &Vector3::repeat(TAU)),
            RotationMode::Yaw => Vector3::new(0.0, 0.0, uniform(rng, (0.0, TAU))),
        }
    }
}

//=================================
// Generic pose sampler
//=================================

/// Places `ids` one by one with poses drawn from `sampler`, rejecting any
/// candidate whose world AABB overlaps an object placed earlier in the call.
///
/// Boxes cover the evaluated modifier stack. Non-finite candidates are always
/// rejected. Non-mesh objects are placed without a collision check.
pub fn sample_poses<R, F>(
    graph: &mut SceneGraph,
    ids: &[ObjectId],
    rng: &mut R,
    max_tries: usize,
    mut sampler: F,
) -> PlacementStats
where
    R: Rng + ?Sized,
    F: FnMut(&mut R, &SceneObject) -> Transform,
{
    let max_tries = max_tries.max(1);
    let mut stats = PlacementStats::default();
    let mut placed: Vec<Aabb> = Vec::new();

    for &id in ids {
        if !graph.contains(id) {
            continue;
        }
        let local = graph.local_bounds(id);
        let mut accepted = false;
        for _ in 0..max_tries {
            stats.attempts += 1;
            let candidate = match graph.get(id) {
                Some(obj) => sampler(&mut *rng, obj),
                None => break,
            };
            if !candidate.is_finite() {
                continue;
            }
            let Some(obj) = graph.get_mut(id) else {
                break;
            };
            obj.set_transform(&candidate);
            match posed_bounds(graph, id, local.as_ref()) {
                Some(bb) if placed.iter().any(|other| other.overlaps(&bb)) => continue,
                _ => {
                    accepted = true;
                    break;
                }
            }
        }

        if accepted {
            stats.placed += 1;
        } else {
            stats.exhausted += 1;
            debug!("Object {} kept its last pose after {} tries", id, max_tries);
        }
        if let Some(bb) = posed_bounds(graph, id, local.as_ref()) {
            placed.push(bb);
        }
    }
    stats
}

/// World box of `id` at its current pose from precomputed local bounds.
fn posed_bounds(graph: &SceneGraph, id: ObjectId, local: Option<&Aabb>) -> Option<Aabb> {
    local?.transformed(&graph.world_matrix(id)?)
}

//=================================
// Free placement
//=================================

#[derive(Debug, Clone, PartialEq)]
pub struct FreePlacement {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
    pub rotation: RotationMode,
    pub max_tries: usize,
}

impl Default for FreePlacement {
    fn default() -> Self {
        Self {
            min: Vector3::new(-5.0, -5.0, 0.0),
            max: Vector3::new(5.0, 5.0, 5.0),
            rotation: RotationMode::Half,
            max_tries: 1000,
        }
    }
}

/// Scatters every mesh unit of `groups`, in group order, inside the placement
/// cuboid.
pub fn place_objects_randomly<R: Rng + ?Sized>(
    graph: &mut SceneGraph,
    groups: &[AssetGroup],
    rng: &mut R,
    params: &FreePlacement,
) -> PlacementStats {
    let ids: Vec<ObjectId> = groups
        .iter()
        .flat_map(|g| g.objects.iter().copied())
        .filter(|&id| graph.get(id).is_some_and(SceneObject::is_mesh))
        .collect();

    let stats = sample_poses(graph, &ids, rng, params.max_tries, |rng, _| {
        Transform::new(
            uniform_vec3(rng, &params.min, &params.max),
            params.rotation.sample(rng),
        )
    });
    debug!(
        "Free placement: {} placed, {} exhausted, {} attempts",
        stats.placed, stats.exhausted, stats.attempts
    );
    stats
}

//=================================
// Upper-region sampler
//=================================

/// Samples points in the slab above the top face of a surface object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpperRegionSampler {
    pub surface: ObjectId,
    pub min_height: f32,
    pub max_height: f32,
    /// Only accept points whose downward ray hits `surface` first.
    pub use_ray_trace_check: bool,
}

impl UpperRegionSampler {
    /// `None` when the surface has no bounding box.
    pub fn sample<R: Rng + ?Sized>(&self, graph: &SceneGraph, rng: &mut R) -> Option<Point3<f32>> {
        self.sample_excluding(graph, rng, &[])
    }

    /// Like [`sample`](Self::sample), ignoring `exclude` in the ray check.
    pub fn sample_excluding<R: Rng + ?Sized>(
        &self,
        graph: &SceneGraph,
        rng: &mut R,
        exclude: &[ObjectId],
    ) -> Option<Point3<f32>> {
        let surface = graph.world_aabb(self.surface)?;
        let mut point = Point3::origin();
        for _ in 0..UPPER_REGION_MAX_TRIES {
            point = Point3::new(
                uniform(rng, (surface.min.x, surface.max.x)),
                uniform(rng, (surface.min.y, surface.max.y)),
                surface.max.z + uniform(rng, (self.min_height, self.max_height)),
            );
            if !self.use_ray_trace_check || self.first_hit_is_surface(graph, &point, exclude) {
                return Some(point);
            }
        }
        debug!("Upper-region sampler exhausted above object {}", self.surface);
        Some(point)
    }

    fn first_hit_is_surface(&self, graph: &SceneGraph, origin: &Point3<f32>, exclude: &[ObjectId]) -> bool {
        let down = -Vector3::z();
        let first = graph
            .iter()
            .filter(|(id, _)| !exclude.contains(id))
            .filter_map(|(id, _)| graph.world_aabb(id)?.ray_hit(origin, &down).map(|t| (id, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        matches!(first, Some((id, _)) if id == self.surface)
    }
}

//=================================
// Surface placement
//=================================

#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePlacement {
    pub min_height: f32,
    pub max_height: f32,
    /// Minimum planar distance to every placed object.
    pub min_distance: f32,
    /// Maximum planar distance to the nearest placed object.
    pub max_distance: f32,
    pub use_ray_trace_check: bool,
    pub rotation: RotationMode,
    pub max_tries: usize,
}

impl Default for SurfacePlacement {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 0.3,
            min_distance: 0.1,
            max_distance: 2.0,
            use_ray_trace_check: true,
            rotation: RotationMode::Full,
            max_tries: 100,
        }
    }
}

impl SurfacePlacement {
    fn spacing_ok(&self, candidate: &Vector2<f32>, placed: &[Vector2<f32>]) -> bool {
        if placed.is_empty() {
            return true;
        }
        let mut nearest = f32::INFINITY;
        for p in placed {
            let d = (candidate - p).norm();
            if d < self.min_distance {
                return false;
            }
            nearest = nearest.min(d);
        }
        nearest <= self.max_distance
    }
}

/// Drops `ids` onto the top face of `surface` with spacing constraints.
///
/// Every object ends up resting with its lowest point at the sampled height.
pub fn sample_poses_on_surface<R: Rng + ?Sized>(
    graph: &mut SceneGraph,
    ids: &[ObjectId],
    surface: ObjectId,
    rng: &mut R,
    params: &SurfacePlacement,
) -> Result<PlacementStats> {
    if graph.world_aabb(surface).is_none() {
        return Err(SceneError::NoFloor);
    }
    let region = UpperRegionSampler {
        surface,
        min_height: params.min_height,
        max_height: params.max_height,
        use_ray_trace_check: params.use_ray_trace_check,
    };
    let max_tries = params.max_tries.max(1);
    let mut stats = PlacementStats::default();
    let mut placed: Vec<Vector2<f32>> = Vec::new();

    for &id in ids {
        if !graph.contains(id) || id == surface {
            continue;
        }
        let local = graph.local_bounds(id);
        let mut accepted = false;
        for _ in 0..max_tries {
            stats.attempts += 1;
            let Some(point) = region.sample_excluding(graph, rng, ids) else {
                break;
            };
            let rotation = params.rotation.sample(rng);
            let Some(obj) = graph.get_mut(id) else {
                break;
            };
            obj.set_transform(&Transform::new(point.coords, rotation));
            let drop = posed_bounds(graph, id, local.as_ref()).map_or(0.0, |bb| point.z - bb.min.z);
            let Some(obj) = graph.get_mut(id) else {
                break;
            };
            obj.location.z += drop;

            if params.spacing_ok(&obj.location.xy(), &placed) {
                accepted = true;
                break;
            }
        }

        if accepted {
            stats.placed += 1;
        } else {
            stats.exhausted += 1;
            debug!("Object {} kept its last surface pose after {} tries", id, max_tries);
        }
        if let Some(obj) = graph.get(id) {
            placed.push(obj.location.xy());
        }
    }
    debug!(
        "Surface placement on {}: {} placed, {} exhausted",
        surface, stats.placed, stats.exhausted
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::Material;
    use crate::scene::mesh::Mesh;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    fn add_cubes(graph: &mut SceneGraph, n: usize, size: f32) -> Vec<ObjectId> {
        (0..n)
            .map(|i| {
                graph.add(SceneObject::new_mesh(
                    &format!("cube_{i}"),
                    Mesh::create_cube(size),
                    vec![Material::default()],
                ))
            })
            .collect()
    }

    fn add_floor(graph: &mut SceneGraph) -> ObjectId {
        graph.add(SceneObject::new_mesh(
            "floor",
            Mesh::create_box(Point3::new(-5.0, -5.0, -0.1), Point3::new(5.0, 5.0, 0.0)),
            vec![],
        ))
    }

    fn group(objects: Vec<ObjectId>) -> AssetGroup {
        AssetGroup {
            objects,
            category_id: None,
            category_name: None,
            dataset: "trash".into(),
            source: PathBuf::from("mem"),
        }
    }

    #[test]
    fn free_placement_stays_in_bounds_without_overlap() {
        let mut graph = SceneGraph::new();
        let ids = add_cubes(&mut graph, 5, 0.5);
        let mut rng = StdRng::seed_from_u64(3);
        let stats =
            place_objects_randomly(&mut graph, &[group(ids.clone())], &mut rng, &FreePlacement::default());
        assert_eq!(stats.placed + stats.exhausted, 5);
        assert_eq!(stats.exhausted, 0);

        let boxes: Vec<Aabb> = ids.iter().map(|&id| graph.world_aabb(id).unwrap()).collect();
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
        for &id in &ids {
            let loc = graph.get(id).unwrap().location;
            assert!((-5.0..=5.0).contains(&loc.x) && (0.0..=5.0).contains(&loc.z));
            let rot = graph.get(id).unwrap().rotation;
            assert!(rot.iter().all(|r| (0.0..=PI).contains(r)));
        }
    }

    #[test]
    fn placement_is_deterministic_under_seed() {
        let run = |seed| {
            let mut graph = SceneGraph::new();
            let ids = add_cubes(&mut graph, 4, 0.3);
            let mut rng = StdRng::seed_from_u64(seed);
            place_objects_randomly(&mut graph, &[group(ids.clone())], &mut rng, &FreePlacement::default());
            ids.iter().map(|&id| graph.get(id).unwrap().transform()).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn impossible_constraint_keeps_last_candidate() {
        let mut graph = SceneGraph::new();
        let ids = add_cubes(&mut graph, 2, 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let stats = sample_poses(&mut graph, &ids, &mut rng, 5, |_, _| Transform::default());
        assert_eq!(stats.placed, 1);
        assert_eq!(stats.exhausted, 1);
        assert_eq!(stats.attempts, 6);
        assert_eq!(graph.get(ids[1]).unwrap().location, Vector3::zeros());
    }

    #[test]
    fn non_finite_candidates_are_never_accepted() {
        let mut graph = SceneGraph::new();
        let ids = add_cubes(&mut graph, 1, 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        let stats = sample_poses(&mut graph, &ids, &mut rng, 3, |_, _| {
            Transform::new(Vector3::new(f32::NAN, 0.0, 0.0), Vector3::zeros())
        });
        assert_eq!(stats.exhausted, 1);
        assert!(graph.get(ids[0]).unwrap().transform().is_finite());
    }

    #[test]
    fn upper_region_samples_lie_in_height_band() {
        let mut graph = SceneGraph::new();
        let floor = add_floor(&mut graph);
        let sampler = UpperRegionSampler {
            surface: floor,
            min_height: 1.4,
            max_height: 1.7,
            use_ray_trace_check: true,
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let p = sampler.sample(&graph, &mut rng).unwrap();
            assert!((1.4..=1.7).contains(&p.z));
            assert!((-5.0..=5.0).contains(&p.x) && (-5.0..=5.0).contains(&p.y));
        }
    }

    #[test]
    fn ray_check_rejects_points_above_obstacles() {
        let mut graph = SceneGraph::new();
        let floor = add_floor(&mut graph);
        // Table covering the x > 0 half of the floor.
        graph.add(SceneObject::new_mesh(
            "table",
            Mesh::create_box(Point3::new(0.0, -5.0, 0.0), Point3::new(5.0, 5.0, 1.0)),
            vec![],
        ));
        let sampler = UpperRegionSampler {
            surface: floor,
            min_height: 1.5,
            max_height: 2.0,
            use_ray_trace_check: true,
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            assert!(sampler.sample(&graph, &mut rng).unwrap().x < 0.0);
        }
    }

    #[test]
    fn surface_placement_respects_spacing_and_rests_on_floor() {
        let mut graph = SceneGraph::new();
        let floor = add_floor(&mut graph);
        let ids = add_cubes(&mut graph, 4, 0.2);
        let params = SurfacePlacement {
            max_height: 0.0,
            min_distance: 0.5,
            max_distance: 3.0,
            ..SurfacePlacement::default()
        };
        let mut rng = StdRng::seed_from_u64(21);
        let stats = sample_poses_on_surface(&mut graph, &ids, floor, &mut rng, &params).unwrap();
        assert_eq!(stats.placed + stats.exhausted, 4);

        for &id in &ids {
            let bb = graph.world_aabb(id).unwrap();
            assert!(bb.min.z.abs() < 1e-4);
        }
        if stats.exhausted == 0 {
            let xy: Vec<_> = ids.iter().map(|&id| graph.get(id).unwrap().location.xy()).collect();
            for (i, a) in xy.iter().enumerate() {
                for b in &xy[i + 1..] {
                    assert!((a - b).norm() >= 0.5);
                }
            }
        }
    }

    #[test]
    fn surface_without_bounds_is_an_error() {
        let mut graph = SceneGraph::new();
        let empty = graph.add(SceneObject::new_mesh("empty", Mesh::default(), vec![]));
        let mut rng = StdRng::seed_from_u64(0);
        let result = sample_poses_on_surface(&mut graph, &[], empty, &mut rng, &SurfacePlacement::default());
        assert!(matches!(result, Err(SceneError::NoFloor)));
    }
}
