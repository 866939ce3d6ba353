use crate::core::geometry::Aabb;
use crate::scene::camera::CameraPose;
use crate::scene::deform;
use crate::scene::mesh::Mesh;
use crate::scene::modifier::Modifier;
use crate::scene::scene_object::{ObjectId, ObjectKind, SceneObject};
use log::debug;
use nalgebra::Matrix4;
use std::path::{Path, PathBuf};

/// World (environment) settings.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    /// Environment image used as background and ambient light.
    pub background: Option<PathBuf>,
    pub strength: f32,
}

impl Default for World {
    fn default() -> Self {
        Self {
            background: None,
            strength: 1.0,
        }
    }
}

/// Arena holding every object of the scene being composed.
///
/// Ids stay valid after removals; removed slots are never reused, so an id
/// handed out once always refers to the same object or to nothing.
#[derive(Debug, Default)]
pub struct SceneGraph {
    objects: Vec<Option<SceneObject>>,
    camera_poses: Vec<CameraPose>,
    pub world: World,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(Some(object));
        self.objects.len() - 1
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.get_mut(id).and_then(Option::take)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(id, obj)| obj.as_ref().map(|o| (id, o)))
    }

    pub fn mesh_ids(&self) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, obj)| obj.is_mesh())
            .map(|(id, _)| id)
            .collect()
    }

    /// Local-to-world matrix of `id`, composed through its parent chain.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Matrix4<f32>> {
        let mut obj = self.get(id)?;
        let mut m = obj.local_to_world();
        // A chain longer than the arena is a cycle.
        for _ in 0..self.objects.len() {
            let Some(parent) = obj.parent.and_then(|p| self.get(p)) else {
                break;
            };
            m = parent.local_to_world() * m;
            obj = parent;
        }
        Some(m)
    }

    /// Bounds of the evaluated mesh of `id`, in its local frame.
    ///
    /// Independent of the object's own pose: lattice helpers are parented to
    /// their owner, so the stack evaluates the same wherever the owner sits.
    pub fn local_bounds(&self, id: ObjectId) -> Option<Aabb> {
        let data = self.get(id)?.mesh_data()?;
        if data.modifiers.is_empty() {
            data.mesh.bounds()
        } else {
            self.evaluated_mesh(id)?.bounds()
        }
    }

    /// World box of the evaluated mesh of `id`.
    pub fn world_aabb(&self, id: ObjectId) -> Option<Aabb> {
        self.local_bounds(id)?.transformed(&self.world_matrix(id)?)
    }

    //=================================
    // Cameras & world
    //=================================

    pub fn add_camera_pose(&mut self, pose: CameraPose) -> usize {
        self.camera_poses.push(pose);
        self.camera_poses.len() - 1
    }

    pub fn camera_poses(&self) -> &[CameraPose] {
        &self.camera_poses
    }

    pub fn set_world_background(&mut self, image: &Path, strength: f32) {
        self.world.background = Some(image.to_path_buf());
        self.world.strength = strength;
    }

    //=================================
    // Modifier stack
    //=================================

    /// The mesh of `id` with its whole modifier stack evaluated, in local space.
    pub fn evaluated_mesh(&self, id: ObjectId) -> Option<Mesh> {
        let obj = self.get(id)?;
        let data = obj.mesh_data()?;
        let mut mesh = data.mesh.clone();
        for modifier in &data.modifiers {
            self.run_modifier(id, obj, &mut mesh, modifier);
            deform::recompute_normals(&mut mesh);
        }
        Some(mesh)
    }

    fn run_modifier(&self, id: ObjectId, obj: &SceneObject, mesh: &mut Mesh, modifier: &Modifier) {
        match *modifier {
            Modifier::Displace {
                noise_scale,
                strength,
                mid_level,
                seed,
            } => deform::displace(mesh, noise_scale, strength, mid_level, seed),
            Modifier::SimpleDeform {
                method,
                axis,
                amount,
            } => deform::simple_deform(mesh, method, axis, amount),
            Modifier::Lattice { lattice } => {
                let Some(helper) = self.get(lattice) else {
                    debug!("Lattice helper {} of '{}' is gone, skipping", lattice, obj.name);
                    return;
                };
                if let (ObjectKind::Lattice(grid), Some(object_to_world), Some(lattice_to_world)) =
                    (&helper.kind, self.world_matrix(id), self.world_matrix(lattice))
                {
                    deform::lattice_deform(mesh, &object_to_world, &lattice_to_world, grid);
                }
            }
        }
    }

    /// Bakes the modifier at `index` into the base mesh and drops it from the
    /// stack.
    ///
    /// A lattice helper that no other modifier references is removed from the
    /// graph. Returns `false` when there is no such modifier.
    pub fn apply_modifier(&mut self, id: ObjectId, index: usize) -> bool {
        let Some(obj) = self.get(id) else {
            return false;
        };
        let Some(data) = obj.mesh_data() else {
            return false;
        };
        let Some(modifier) = data.modifiers.get(index).cloned() else {
            return false;
        };

        let mut mesh = data.mesh.clone();
        self.run_modifier(id, obj, &mut mesh, &modifier);
        deform::recompute_normals(&mut mesh);

        if let Some(data) = self.get_mut(id).and_then(SceneObject::mesh_data_mut) {
            data.mesh = mesh;
            data.modifiers.remove(index);
        }

        if let Modifier::Lattice { lattice } = modifier
            && !self.lattice_in_use(lattice)
        {
            self.remove(lattice);
        }
        true
    }

    pub fn apply_first_modifier(&mut self, id: ObjectId) -> bool {
        self.apply_modifier(id, 0)
    }

    /// Bakes the whole stack in order. Returns how many modifiers were applied.
    pub fn apply_all_modifiers(&mut self, id: ObjectId) -> usize {
        let mut applied = 0;
        while self.apply_first_modifier(id) {
            applied += 1;
        }
        applied
    }

    fn lattice_in_use(&self, lattice: ObjectId) -> bool {
        self.iter().any(|(_, obj)| {
            obj.mesh_data().is_some_and(|d| {
                d.modifiers
                    .iter()
                    .any(|m| matches!(m, Modifier::Lattice { lattice: l } if *l == lattice))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::light::Light;
    use crate::scene::material::Material;
    use crate::scene::modifier::{Axis, DeformMethod, Lattice};
    use nalgebra::Vector3;

    fn cube(graph: &mut SceneGraph) -> ObjectId {
        graph.add(SceneObject::new_mesh(
            "cube",
            Mesh::create_cube(1.0),
            vec![Material::default()],
        ))
    }

    #[test]
    fn ids_survive_removal() {
        let mut graph = SceneGraph::new();
        let a = cube(&mut graph);
        let b = graph.add(SceneObject::new("sun", ObjectKind::Light(Light::new_sun(5.0))));
        assert!(graph.remove(a).is_some());
        assert!(!graph.contains(a));
        assert_eq!(graph.get(b).map(|o| o.name.as_str()), Some("sun"));
        assert_eq!(graph.len(), 1);
        assert!(graph.mesh_ids().is_empty());
    }

    #[test]
    fn evaluated_mesh_leaves_base_untouched() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph);
        graph
            .get_mut(id)
            .and_then(SceneObject::mesh_data_mut)
            .unwrap()
            .modifiers
            .push(Modifier::SimpleDeform {
                method: DeformMethod::Stretch,
                axis: Axis::Z,
                amount: 0.1,
            });
        let evaluated = graph.evaluated_mesh(id).unwrap();
        let base = &graph.get(id).unwrap().mesh_data().unwrap().mesh;
        assert_eq!(*base, Mesh::create_cube(1.0));
        assert!((evaluated.bounds().unwrap().extent().z - 1.1).abs() < 1e-5);
    }

    #[test]
    fn baking_lattice_removes_modifier_and_helper() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph);
        let mut grid = Lattice::new([2, 2, 2]);
        for o in &mut grid.offsets {
            *o = Vector3::new(0.05, 0.0, 0.0);
        }
        let mut helper = SceneObject::new("lattice", ObjectKind::Lattice(grid));
        helper.scale = Vector3::new(0.6, 0.6, 0.6);
        let lattice = graph.add(helper);
        graph
            .get_mut(id)
            .and_then(SceneObject::mesh_data_mut)
            .unwrap()
            .modifiers
            .push(Modifier::Lattice { lattice });

        let expected = graph.evaluated_mesh(id).unwrap();
        assert_eq!(graph.apply_all_modifiers(id), 1);
        let data = graph.get(id).unwrap().mesh_data().unwrap();
        assert!(data.modifiers.is_empty());
        assert!(!graph.contains(lattice));
        for (a, b) in expected.vertices.iter().zip(&data.mesh.vertices) {
            assert!((a.position - b.position).norm() < 1e-6);
        }
    }

    #[test]
    fn parented_lattice_follows_its_owner() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph);
        let mut grid = Lattice::new([2, 2, 2]);
        grid.offsets[0] = Vector3::new(0.2, -0.1, 0.1);
        let mut helper = SceneObject::new("lattice", ObjectKind::Lattice(grid));
        helper.scale = Vector3::new(0.6, 0.6, 0.6);
        helper.parent = Some(id);
        let lattice = graph.add(helper);
        graph
            .get_mut(id)
            .and_then(SceneObject::mesh_data_mut)
            .unwrap()
            .modifiers
            .push(Modifier::Lattice { lattice });

        let at_origin = graph.evaluated_mesh(id).unwrap();
        let owner = graph.get_mut(id).unwrap();
        owner.location = Vector3::new(4.0, -2.0, 1.0);
        owner.rotation = Vector3::new(0.3, 0.0, 1.2);
        let moved = graph.evaluated_mesh(id).unwrap();
        for (a, b) in at_origin.vertices.iter().zip(&moved.vertices) {
            assert!((a.position - b.position).norm() < 1e-4);
        }

        let m = graph.world_matrix(lattice).unwrap();
        let helper_origin = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        assert!((helper_origin - Vector3::new(4.0, -2.0, 1.0)).norm() < 1e-5);
    }

    #[test]
    fn world_aabb_sees_the_evaluated_stack() {
        let mut graph = SceneGraph::new();
        let id = cube(&mut graph);
        graph.get_mut(id).unwrap().location = Vector3::new(0.0, 0.0, 2.0);
        graph
            .get_mut(id)
            .and_then(SceneObject::mesh_data_mut)
            .unwrap()
            .modifiers
            .push(Modifier::SimpleDeform {
                method: DeformMethod::Stretch,
                axis: Axis::Z,
                amount: 0.5,
            });
        let bb = graph.world_aabb(id).unwrap();
        assert!((bb.extent().z - 1.5).abs() < 1e-5);
        assert!((bb.center().z - 2.0).abs() < 1e-5);
        // The object's own box still reports the base mesh.
        let base = graph.get(id).unwrap().world_aabb().unwrap();
        assert!((base.extent().z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn camera_poses_are_append_only() {
        let mut graph = SceneGraph::new();
        assert_eq!(graph.add_camera_pose(CameraPose::default()), 0);
        assert_eq!(graph.add_camera_pose(CameraPose::default()), 1);
        assert_eq!(graph.camera_poses().len(), 2);
    }
}
