//! Renderable geometry and materials

use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::{Point3f, Vector3f};

/// Indexed triangle geometry shared by the mesh nodes that reference it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub colors: Option<Vec<[f32; 3]>>,
}

impl Geometry {
    /// Create a new empty geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a geometry from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            colors: None,
        }
    }

    /// Create a non-indexed geometry where every three vertices form a triangle
    pub fn from_triangle_soup(vertices: Vec<Point3f>) -> Self {
        let faces = (0..vertices.len() as u32 / 3)
            .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
            .collect();
        Self::from_vertices_and_faces(vertices, faces)
    }

    /// Number of vertex positions
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the geometry has nothing to draw
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex, returning its index
    pub fn add_vertex(&mut self, vertex: Point3f) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    /// Add a face
    pub fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    /// Check that every face references an existing vertex
    pub fn faces_in_range(&self) -> bool {
        let count = self.vertices.len() as u32;
        self.faces.iter().all(|face| face.iter().all(|&i| i < count))
    }

    /// Area-weighted vertex normals
    pub fn compute_vertex_normals(&self) -> Vec<Vector3f> {
        let mut normals = vec![Vector3f::zeros(); self.vertices.len()];
        for face in &self.faces {
            let [a, b, c] = face.map(|i| i as usize);
            let (Some(v0), Some(v1), Some(v2)) =
                (self.vertices.get(a), self.vertices.get(b), self.vertices.get(c))
            else {
                continue;
            };
            let face_normal = (v1 - v0).cross(&(v2 - v0));
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }
        for normal in &mut normals {
            *normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3f::z);
        }
        normals
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set vertex colors
    pub fn set_colors(&mut self, colors: Vec<[f32; 3]>) {
        if colors.len() == self.vertices.len() {
            self.colors = Some(colors);
        }
    }

    /// Bounding box of the vertices in geometry space
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }
}

/// Surface appearance of a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Material {
    /// Opaque material of the given color
    pub fn with_color(color: [f32; 3]) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    /// Convert a packed `0xRRGGBB` color
    pub fn color_from_hex(hex: u32) -> [f32; 3] {
        [
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        ]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: [0.8, 0.8, 0.8],
            opacity: 1.0,
        }
    }
}
