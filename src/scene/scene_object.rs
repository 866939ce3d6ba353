use crate::core::geometry::Aabb;
use crate::core::math::transform::{Transform, TransformFactory, transform_point};
use crate::scene::light::Light;
use crate::scene::material::Material;
use crate::scene::mesh::Mesh;
use crate::scene::modifier::{Lattice, Modifier};
use nalgebra::{Matrix4, Point3, Vector3};
use serde::Serialize;
use std::collections::BTreeMap;

/// Index of an object inside a [`SceneGraph`](crate::scene::graph::SceneGraph).
pub type ObjectId = usize;

/// Geometry, materials and the live modifier stack of a mesh object.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub mesh: Mesh,
    pub materials: Vec<Material>,
    pub modifiers: Vec<Modifier>,
}

/// What an object is. Only meshes carry bounding boxes and materials.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    Mesh(MeshData),
    Light(Light),
    /// Deformation helper referenced by lattice modifiers.
    Lattice(Lattice),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(_) => "mesh",
            ObjectKind::Light(_) => "light",
            ObjectKind::Lattice(_) => "lattice",
        }
    }
}

/// Custom property value attached to an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f32),
    Str(String),
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

/// Represents a single object instance in the scene.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub location: Vector3<f32>,
    /// XYZ Euler angles in radians.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// When set, location/rotation/scale are relative to this object.
    pub parent: Option<ObjectId>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl SceneObject {
    pub fn new(name: &str, kind: ObjectKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            location: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            parent: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn new_mesh(name: &str, mesh: Mesh, materials: Vec<Material>) -> Self {
        Self::new(
            name,
            ObjectKind::Mesh(MeshData {
                mesh,
                materials,
                modifiers: Vec::new(),
            }),
        )
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh(_))
    }

    pub fn mesh_data(&self) -> Option<&MeshData> {
        match &self.kind {
            ObjectKind::Mesh(data) => Some(data),
            _ => None,
        }
    }

    pub fn mesh_data_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.kind {
            ObjectKind::Mesh(data) => Some(data),
            _ => None,
        }
    }

    pub fn set_transform(&mut self, transform: &Transform) {
        self.location = transform.location;
        self.rotation = transform.rotation;
        if let Some(scale) = transform.scale {
            self.scale = scale;
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.location, self.rotation).with_scale(self.scale)
    }

    /// Combined matrix: `T * Rz * Ry * Rx * S`.
    pub fn local_to_world(&self) -> Matrix4<f32> {
        TransformFactory::compose(&self.location, &self.rotation, &self.scale)
    }

    /// Box of the base mesh under the object's own transform. Meshes only;
    /// parents and modifiers are not considered.
    pub fn world_aabb(&self) -> Option<Aabb> {
        self.mesh_data()?.mesh.bounds()?.transformed(&self.local_to_world())
    }

    /// Local bounding-box extent times the object scale; zero for non-meshes.
    pub fn dimensions(&self) -> Vector3<f32> {
        self.mesh_data()
            .and_then(|d| d.mesh.bounds())
            .map(|bb| bb.extent().component_mul(&self.scale.abs()))
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn set_cp(&mut self, key: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn get_cp(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Bakes rotation and scale into the mesh vertices and resets them to identity,
    /// so later transform queries see the final geometry directly.
    pub fn persist_rotation_and_scale(&mut self) {
        let m = TransformFactory::euler_xyz(&self.rotation)
            * TransformFactory::scaling_nonuniform(&self.scale);
        if let ObjectKind::Mesh(data) = &mut self.kind {
            data.mesh.transform(&m);
            self.rotation = Vector3::zeros();
            self.scale = Vector3::new(1.0, 1.0, 1.0);
        }
    }

    /// Moves the origin to the bottom-center of the local bounding box while
    /// keeping the object in place in world space.
    pub fn set_origin_to_bottom_center(&mut self) {
        let linear = TransformFactory::euler_xyz(&self.rotation)
            * TransformFactory::scaling_nonuniform(&self.scale);
        if let ObjectKind::Mesh(data) = &mut self.kind {
            let Some(bb) = data.mesh.bounds() else {
                return;
            };
            let center = bb.center();
            let pivot = Vector3::new(center.x, center.y, bb.min.z);
            data.mesh.translate(&-pivot);
            self.location += transform_point(&linear, &Point3::from(pivot)).coords;
        }
    }
}
