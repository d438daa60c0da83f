//! CPU-side preparation of scene data for upload

use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::f32::consts::FRAC_1_PI;

use sceneview_core::{Light, Scene};

/// Maps OpenGL clip-space depth (-1..1) to wgpu's 0..1
#[rustfmt::skip]
pub fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Vertex data for mesh rendering, already in world space
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl SceneVertex {
    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Every visible mesh of a scene merged into one indexed triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMesh {
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u32>,
}

impl SceneMesh {
    /// Bake world transforms and colors into a single buffer pair.
    ///
    /// Highlighted meshes take `highlight_color` instead of their own colors.
    pub fn from_scene(scene: &Scene, highlight_color: [f32; 3]) -> Self {
        let mut mesh = SceneMesh::default();
        for draw in scene.mesh_draws() {
            let geometry = &draw.mesh.geometry;
            if geometry.is_empty() {
                continue;
            }
            let base = mesh.vertices.len() as u32;
            mesh.vertices.reserve(geometry.vertex_count());
            let normal_matrix = normal_matrix(&draw.world);
            let computed;
            let normals = match &geometry.normals {
                Some(normals) if normals.len() == geometry.vertices.len() => normals,
                _ => {
                    computed = geometry.compute_vertex_normals();
                    &computed
                }
            };

            for (i, vertex) in geometry.vertices.iter().enumerate() {
                let position = draw.world.transform_point(vertex);
                let normal = normals
                    .get(i)
                    .map(|n| (normal_matrix * n).try_normalize(f32::EPSILON).unwrap_or(*n))
                    .unwrap_or_else(Vector3::y);
                let color = if draw.highlighted {
                    highlight_color
                } else {
                    let vertex_color = geometry
                        .colors
                        .as_ref()
                        .and_then(|colors| colors.get(i))
                        .copied()
                        .unwrap_or([1.0, 1.0, 1.0]);
                    let material = draw.mesh.material.color;
                    [
                        vertex_color[0] * material[0],
                        vertex_color[1] * material[1],
                        vertex_color[2] * material[2],
                    ]
                };
                mesh.vertices.push(SceneVertex {
                    position: [position.x, position.y, position.z],
                    normal: [normal.x, normal.y, normal.z],
                    color,
                });
            }
            mesh.indices
                .extend(geometry.faces.iter().flatten().map(|index| base + index));
        }
        mesh
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Inverse-transpose of the upper 3x3, for transforming normals
fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let linear: Matrix3<f32> = world.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

/// Uniform block shared by the vertex and fragment stages
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
}

impl SceneUniforms {
    /// Build uniforms from an OpenGL-convention view-projection matrix.
    ///
    /// Light intensities are divided by pi, the Lambertian normalization, so
    /// a white surface under the default lights does not saturate.
    pub fn new(view_proj: &Matrix4<f32>, eye: &Point3<f32>, lights: &[Light]) -> Self {
        let mut light_dir = Vector3::new(0.0, 1.0, 0.0);
        let mut light_color = [0.0f32; 3];
        let mut ambient = [0.0f32; 3];

        for light in lights {
            match light {
                Light::Directional {
                    color,
                    intensity,
                    position,
                    ..
                } => {
                    // Only the first directional light is shaded.
                    if light_color == [0.0; 3] {
                        light_dir = position.coords.try_normalize(f32::EPSILON).unwrap_or(light_dir);
                        light_color = color.map(|c| c * intensity * FRAC_1_PI);
                    }
                }
                Light::Ambient { color, intensity } => {
                    for (sum, c) in ambient.iter_mut().zip(color) {
                        *sum += c * intensity * FRAC_1_PI;
                    }
                }
            }
        }

        Self {
            view_proj: (opengl_to_wgpu() * view_proj).into(),
            eye: [eye.x, eye.y, eye.z, 1.0],
            light_dir: [light_dir.x, light_dir.y, light_dir.z, 0.0],
            light_color: [light_color[0], light_color[1], light_color[2], 1.0],
            ambient: [ambient[0], ambient[1], ambient[2], 1.0],
        }
    }
}
