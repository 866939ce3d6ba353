use crate::core::geometry::{Aabb, Vertex};
use crate::core::math::transform::transform_point;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

/// A collection of vertices and indices representing a 3D object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// List of vertices.
    pub vertices: Vec<Vertex>,
    /// List of indices defining triangles (3 indices per triangle).
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Local-space bounding box, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Transforms positions by `m` and normals by its inverse transpose.
    pub fn transform(&mut self, m: &Matrix4<f32>) {
        let linear = m.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|inv| inv.transpose())
            .unwrap_or(linear);

        for vertex in &mut self.vertices {
            vertex.position = transform_point(m, &vertex.position);
            let n = normal_matrix * vertex.normal;
            vertex.normal = if n.norm() > 1e-12 { n.normalize() } else { vertex.normal };
        }
    }

    pub fn translate(&mut self, offset: &Vector3<f32>) {
        for vertex in &mut self.vertices {
            vertex.position += *offset;
        }
    }

    /// Appends `other`, offsetting its indices.
    pub fn merge(&mut self, other: &Mesh) {
        let index_offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices
            .extend(other.indices.iter().map(|i| i + index_offset));
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned box with 24 vertices (flat normals per face).
    pub fn create_box(min: Point3<f32>, max: Point3<f32>) -> Self {
        let faces: [(Vector3<f32>, [Point3<f32>; 4]); 6] = [
            (
                Vector3::x(),
                [
                    Point3::new(max.x, min.y, min.z),
                    Point3::new(max.x, max.y, min.z),
                    Point3::new(max.x, max.y, max.z),
                    Point3::new(max.x, min.y, max.z),
                ],
            ),
            (
                -Vector3::x(),
                [
                    Point3::new(min.x, max.y, min.z),
                    Point3::new(min.x, min.y, min.z),
                    Point3::new(min.x, min.y, max.z),
                    Point3::new(min.x, max.y, max.z),
                ],
            ),
            (
                Vector3::y(),
                [
                    Point3::new(max.x, max.y, min.z),
                    Point3::new(min.x, max.y, min.z),
                    Point3::new(min.x, max.y, max.z),
                    Point3::new(max.x, max.y, max.z),
                ],
            ),
            (
                -Vector3::y(),
                [
                    Point3::new(min.x, min.y, min.z),
                    Point3::new(max.x, min.y, min.z),
                    Point3::new(max.x, min.y, max.z),
                    Point3::new(min.x, min.y, max.z),
                ],
            ),
            (
                Vector3::z(),
                [
                    Point3::new(min.x, min.y, max.z),
                    Point3::new(max.x, min.y, max.z),
                    Point3::new(max.x, max.y, max.z),
                    Point3::new(min.x, max.y, max.z),
                ],
            ),
            (
                -Vector3::z(),
                [
                    Point3::new(min.x, max.y, min.z),
                    Point3::new(max.x, max.y, min.z),
                    Point3::new(max.x, min.y, min.z),
                    Point3::new(min.x, min.y, min.z),
                ],
            ),
        ];

        let uvs = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];

        let mut mesh = Mesh::default();
        for (normal, corners) in faces {
            let base = mesh.vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                mesh.vertices.push(Vertex::new(*corner, normal, uv));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Axis-aligned cube of edge `size` centered on the origin.
    pub fn create_cube(size: f32) -> Self {
        let h = size * 0.5;
        Self::create_box(Point3::new(-h, -h, -h), Point3::new(h, h, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::transform::TransformFactory;

    #[test]
    fn cube_has_24_vertices_and_12_triangles() {
        let cube = Mesh::create_cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        let bb = cube.bounds().unwrap();
        assert_eq!(bb.extent(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Mesh::default().bounds().is_none());
    }

    #[test]
    fn merge_offsets_indices() {
        let mut a = Mesh::create_cube(1.0);
        let b = Mesh::create_cube(1.0);
        a.merge(&b);
        assert_eq!(a.vertices.len(), 48);
        assert_eq!(*a.indices.iter().max().unwrap(), 47);
    }

    #[test]
    fn transform_scales_bounds() {
        let mut cube = Mesh::create_cube(1.0);
        cube.transform(&TransformFactory::scaling_nonuniform(&Vector3::new(2.0, 3.0, 4.0)));
        let bb = cube.bounds().unwrap();
        assert!((bb.extent() - Vector3::new(2.0, 3.0, 4.0)).norm() < 1e-5);
        assert!(cube.vertices.iter().all(|v| (v.normal.norm() - 1.0).abs() < 1e-5));
    }
}
