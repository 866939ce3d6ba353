//! Stochastic wear: geometric deformation and material aging, scaled by
//! object size.

pub mod aging;

use crate::core::geometry::diagonal_length;
use crate::core::math::sampling::{chance, uniform};
use crate::scene::graph::SceneGraph;
use crate::scene::loader::AssetGroup;
use crate::scene::modifier::{Axis, DeformMethod, Lattice, Modifier};
use crate::scene::scene_object::{ObjectId, ObjectKind, SceneObject};
use aging::{Skipped, age_material};
use log::{debug, info};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

const LATTICE_RESOLUTIONS: [usize; 3] = [2, 3, 4];

/// Probabilities and ranges of the weathering pass. Ranges are `(lo, hi)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatheringParams {
    pub p_displace: f32,
    pub p_simple: f32,
    pub p_lattice: f32,
    pub p_axis_scale: f32,

    pub disp_noise_scale: (f32, f32),
    /// Displacement strength as a fraction of the object diagonal.
    pub disp_strength_per_diag: (f32, f32),
    pub simple_angle_deg: (f32, f32),
    pub simple_factor: (f32, f32),
    pub lattice_jitter_per_diag: f32,
    pub axis_scale_delta: (f32, f32),

    pub dust_strength: (f32, f32),
    pub dust_scale: (f32, f32),
    pub roughness_jitter: (f32, f32),
    pub basecolor_mult: (f32, f32),

    /// Bake modifiers right away instead of leaving them on the stack.
    pub apply_modifiers: bool,
    pub min_diag: f32,
    pub max_diag: Option<f32>,
    pub seed: Option<u64>,
}

impl Default for WeatheringParams {
    fn default() -> Self {
        Self {
            p_displace: 0.65,
            p_simple: 0.45,
            p_lattice: 0.25,
            p_axis_scale: 0.60,
            disp_noise_scale: (0.2, 1.0),
            disp_strength_per_diag: (0.003, 0.02),
            simple_angle_deg: (5.0, 15.0),
            simple_factor: (-0.10, 0.10),
            lattice_jitter_per_diag: 0.03,
            axis_scale_delta: (-0.07, 0.05),
            dust_strength: (0.12, 0.28),
            dust_scale: (0.02, 0.08),
            roughness_jitter: (-0.20, 0.20),
            basecolor_mult: (0.85, 0.95),
            apply_modifiers: false,
            min_diag: 0.05,
            max_diag: None,
            seed: None,
        }
    }
}

/// Counters and diagnostics of a weathering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatheringReport {
    pub processed: usize,
    pub skipped_by_size: usize,
    pub modifiers_added: usize,
    pub materials_aged: usize,
    pub diagnostics: Vec<Skipped>,
}

pub struct Weathering {
    params: WeatheringParams,
}

impl Weathering {
    /// Reseeds `rng` once when the parameters carry a seed.
    pub fn new(params: WeatheringParams, rng: &mut StdRng) -> Self {
        if let Some(seed) = params.seed {
            *rng = StdRng::seed_from_u64(seed);
        }
        Self { params }
    }

    /// Weathers every mesh unit of `groups`, in group order.
    pub fn apply_to_groups<R: Rng + ?Sized>(
        &self,
        graph: &mut SceneGraph,
        groups: &[AssetGroup],
        rng: &mut R,
    ) -> WeatheringReport {
        let ids: Vec<ObjectId> = groups.iter().flat_map(|g| g.objects.iter().copied()).collect();
        self.apply_to(graph, &ids, rng)
    }

    /// Weathers every mesh currently in the graph.
    pub fn apply_to_all_scene_meshes<R: Rng + ?Sized>(
        &self,
        graph: &mut SceneGraph,
        rng: &mut R,
    ) -> WeatheringReport {
        let ids = graph.mesh_ids();
        self.apply_to(graph, &ids, rng)
    }

    fn apply_to<R: Rng + ?Sized>(
        &self,
        graph: &mut SceneGraph,
        ids: &[ObjectId],
        rng: &mut R,
    ) -> WeatheringReport {
        let mut report = WeatheringReport::default();
        for &id in ids {
            self.process(graph, id, rng, &mut report);
        }
        info!(
            "Weathering: {} processed, {} skipped by size, {} modifier(s), {} material diagnostic(s)",
            report.processed,
            report.skipped_by_size,
            report.modifiers_added,
            report.diagnostics.len()
        );
        report
    }

    /// Weathers one mesh object. Non-meshes are ignored.
    pub fn process<R: Rng + ?Sized>(
        &self,
        graph: &mut SceneGraph,
        id: ObjectId,
        rng: &mut R,
        report: &mut WeatheringReport,
    ) {
        let p = &self.params;
        let Some(obj) = graph.get(id).filter(|o| o.is_mesh()) else {
            return;
        };
        let dims = obj.dimensions();
        let diag = diagonal_length(&dims);
        if diag < p.min_diag || p.max_diag.is_some_and(|max| diag > max) {
            debug!("'{}' skipped, diagonal {:.4}", obj.name, diag);
            report.skipped_by_size += 1;
            return;
        }
        let name = obj.name.clone();
        let local_extent = obj
            .mesh_data()
            .and_then(|d| d.mesh.bounds())
            .map_or_else(Vector3::zeros, |bb| bb.extent());

        let mut modifiers = Vec::new();

        if chance(rng, p.p_displace) {
            modifiers.push(Modifier::Displace {
                noise_scale: uniform(rng, p.disp_noise_scale),
                strength: uniform(rng, p.disp_strength_per_diag) * diag,
                mid_level: 0.5,
                seed: rng.random(),
            });
        }

        if chance(rng, p.p_simple) {
            let method = DeformMethod::ALL.choose(rng).copied().unwrap_or(DeformMethod::Twist);
            let axis = Axis::ALL.choose(rng).copied().unwrap_or(Axis::Z);
            let size = diag.clamp(0.3, 1.0);
            let amount = if method.is_angular() {
                (uniform(rng, p.simple_angle_deg) * size).to_radians()
            } else {
                uniform(rng, p.simple_factor) * size
            };
            modifiers.push(Modifier::SimpleDeform {
                method,
                axis,
                amount,
            });
        }

        if chance(rng, p.p_lattice) {
            let mut resolution = [2usize; 3];
            for r in &mut resolution {
                *r = LATTICE_RESOLUTIONS.choose(rng).copied().unwrap_or(2);
            }
            let mut lattice = Lattice::new(resolution);
            let j = p.lattice_jitter_per_diag * diag;
            for offset in &mut lattice.offsets {
                *offset = Vector3::new(
                    uniform(rng, (-j, j)),
                    uniform(rng, (-j, j)),
                    uniform(rng, (-j, j)),
                );
            }

            // Sits on the owner's origin and spans 0.6 of its box; the owner's
            // scale comes in through the parent link.
            let mut helper = SceneObject::new(&format!("{name}_lattice"), ObjectKind::Lattice(lattice));
            helper.parent = Some(id);
            helper.scale = (local_extent * 0.6).map(|s| s.max(1e-4));
            modifiers.push(Modifier::Lattice {
                lattice: graph.add(helper),
            });
        }

        let added = modifiers.len();
        for modifier in modifiers {
            let Some(data) = graph.get_mut(id).and_then(SceneObject::mesh_data_mut) else {
                return;
            };
            data.modifiers.push(modifier);
            let index = data.modifiers.len() - 1;
            if p.apply_modifiers {
                graph.apply_modifier(id, index);
            }
        }

        let Some(obj) = graph.get_mut(id) else {
            return;
        };

        if chance(rng, p.p_axis_scale) {
            let factors = Vector3::new(
                1.0 + uniform(rng, p.axis_scale_delta),
                1.0 + uniform(rng, p.axis_scale_delta),
                1.0 + uniform(rng, p.axis_scale_delta),
            );
            obj.scale.component_mul_assign(&factors);
        }

        if let Some(data) = obj.mesh_data_mut() {
            for material in &mut data.materials {
                match age_material(material, &name, rng, p) {
                    Ok(_) => report.materials_aged += 1,
                    Err(skip) => {
                        debug!("{}", skip);
                        report.diagnostics.push(skip);
                    }
                }
            }
        }

        report.processed += 1;
        report.modifiers_added += added;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::material::Material;
    use crate::scene::mesh::Mesh;
    use std::path::PathBuf;

    fn always() -> WeatheringParams {
        WeatheringParams {
            p_displace: 1.0,
            p_simple: 1.0,
            p_lattice: 1.0,
            p_axis_scale: 1.0,
            ..WeatheringParams::default()
        }
    }

    fn cube(graph: &mut SceneGraph, size: f32) -> ObjectId {
        graph.add(SceneObject::new_mesh(
            "can",
            Mesh::create_cube(size),
            vec![Material::new_principled("tin", [0.8, 0.8, 0.8], 0.4)],
        ))
    }

    #[test]
    fn tiny_objects_are_left_alone() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph, 0.01);
        let mut rng = StdRng::seed_from_u64(0);
        let weathering = Weathering::new(always(), &mut rng);
        let report = weathering.apply_to_all_scene_meshes(&mut graph, &mut rng);

        assert_eq!(report.skipped_by_size, 1);
        assert_eq!(report.processed, 0);
        let obj = graph.get(id).unwrap();
        let data = obj.mesh_data().unwrap();
        assert!(data.modifiers.is_empty());
        let bsdf = data.materials[0].principled().unwrap();
        assert_eq!(bsdf.roughness.value, 0.4);
        assert_eq!(bsdf.base_color.value, [0.8, 0.8, 0.8, 1.0]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn max_diag_caps_processing() {
        let mut graph = SceneGraph::new();
        cube(&mut graph, 10.0);
        let mut rng = StdRng::seed_from_u64(0);
        let params = WeatheringParams {
            max_diag: Some(1.0),
            ..always()
        };
        let report = Weathering::new(params, &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);
        assert_eq!(report.skipped_by_size, 1);
    }

    #[test]
    fn all_gates_open_adds_full_stack() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let report = Weathering::new(always(), &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);

        assert_eq!(report.processed, 1);
        assert_eq!(report.modifiers_added, 3);
        assert_eq!(report.materials_aged, 1);
        let obj = graph.get(id).unwrap();
        let kinds: Vec<_> = obj.mesh_data().unwrap().modifiers.iter().map(Modifier::kind_name).collect();
        assert_eq!(kinds, vec!["displace", "simple_deform", "lattice"]);
        // Per-axis rescale stays within the delta range.
        assert!(obj.scale.iter().all(|s| (0.93..=1.05).contains(s)));
        // The lattice helper lives in the graph, parented to the mesh.
        assert_eq!(graph.len(), 2);
        let helper = graph.iter().find(|(h, _)| *h != id).map(|(_, o)| o).unwrap();
        assert_eq!(helper.parent, Some(id));
        assert_eq!(helper.location, Vector3::zeros());
        assert!(graph.evaluated_mesh(id).is_some());
    }

    #[test]
    fn simple_deform_amount_scales_with_size() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph, 0.1);
        let params = WeatheringParams {
            p_simple: 1.0,
            p_displace: 0.0,
            p_lattice: 0.0,
            p_axis_scale: 0.0,
            ..WeatheringParams::default()
        };
        let mut rng = StdRng::seed_from_u64(12);
        Weathering::new(params, &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);
        let obj = graph.get(id).unwrap();
        match obj.mesh_data().unwrap().modifiers[0] {
            Modifier::SimpleDeform { method, amount, .. } => {
                // diag ~0.17 is clamped up to a size factor of 0.3.
                if method.is_angular() {
                    assert!(amount >= (5.0f32 * 0.3).to_radians() - 1e-6);
                    assert!(amount <= (15.0f32 * 0.3).to_radians() + 1e-6);
                } else {
                    assert!(amount.abs() <= 0.1 * 0.3 + 1e-6);
                }
            }
            ref other => panic!("unexpected modifier {other:?}"),
        }
    }

    #[test]
    fn bake_mode_leaves_no_stack_or_helpers() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph, 1.0);
        let params = WeatheringParams {
            apply_modifiers: true,
            ..always()
        };
        let mut rng = StdRng::seed_from_u64(5);
        Weathering::new(params, &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);
        assert!(graph.get(id).unwrap().mesh_data().unwrap().modifiers.is_empty());
        assert_eq!(graph.len(), 1);
        assert_ne!(graph.get(id).unwrap().mesh_data().unwrap().mesh, Mesh::create_cube(1.0));
    }

    #[test]
    fn baking_matches_the_live_stack() {
        let weather = |apply_modifiers| {
            let mut graph = SceneGraph::new();
            let id = cube(&mut graph, 1.0);
            let params = WeatheringParams {
                apply_modifiers,
                axis_scale_delta: (0.2, 0.3),
                ..always()
            };
            let mut rng = StdRng::seed_from_u64(21);
            Weathering::new(params, &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);
            let obj = graph.get(id).unwrap();
            (graph.evaluated_mesh(id).unwrap(), obj.scale)
        };
        let (live, live_scale) = weather(false);
        let (baked, baked_scale) = weather(true);
        assert_eq!(live_scale, baked_scale);
        assert!(live_scale.iter().all(|s| *s >= 1.2 - 1e-6));
        for (a, b) in live.vertices.iter().zip(&baked.vertices) {
            assert!((a.position - b.position).norm() < 1e-4);
        }
    }

    #[test]
    fn seed_in_params_makes_runs_repeatable() {
        let run = |outer_seed| {
            let mut graph = SceneGraph::new();
            let id = cube(&mut graph, 1.0);
            let mut rng = StdRng::seed_from_u64(outer_seed);
            let params = WeatheringParams {
                seed: Some(77),
                ..always()
            };
            Weathering::new(params, &mut rng).apply_to_all_scene_meshes(&mut graph, &mut rng);
            graph.get(id).unwrap().mesh_data().unwrap().modifiers.clone()
        };
        assert_eq!(run(1), run(2));
    }

    #[test]
    fn materials_without_nodes_land_in_diagnostics() {
        let mut graph = SceneGraph::new();
        let id = graph.add(SceneObject::new_mesh(
            "bag",
            Mesh::create_cube(1.0),
            vec![Material::without_nodes("plastic"), Material::default()],
        ));
        let groups = vec![AssetGroup {
            objects: vec![id],
            category_id: None,
            category_name: None,
            dataset: "trash".into(),
            source: PathBuf::from("bag.obj"),
        }];
        let mut rng = StdRng::seed_from_u64(3);
        let report = Weathering::new(WeatheringParams::default(), &mut rng)
            .apply_to_groups(&mut graph, &groups, &mut rng);
        assert_eq!(report.processed, 1);
        assert_eq!(report.materials_aged, 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].material, "plastic");
    }
}
