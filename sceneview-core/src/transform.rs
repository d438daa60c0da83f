//! Local transforms of scene nodes

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A node's placement relative to its parent, as a homogeneous matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Pure offset by `offset`
    pub fn translation(offset: Vector3<f32>) -> Self {
        Self {
            matrix: Matrix4::new_translation(&offset),
        }
    }

    /// Rotation of `angle` radians about the X axis
    pub fn rotation_x(angle: f32) -> Self {
        Self {
            matrix: UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle).to_homogeneous(),
        }
    }

    /// Build a transform from 16 values in column-major order, the element
    /// order scene descriptions serialize matrices in.
    pub fn from_column_major(values: &[f32]) -> Result<Self> {
        if values.len() != 16 {
            return Err(Error::InvalidData(format!(
                "matrix needs 16 elements, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData("matrix contains non-finite values".to_string()));
        }
        Ok(Self {
            matrix: Matrix4::from_column_slice(values),
        })
    }

    /// Map a point from local to parent space
    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::from_homogeneous(self.matrix * point.to_homogeneous()).unwrap_or(*point)
    }

    /// Map a direction from local to parent space, ignoring translation
    pub fn transform_vector(&self, vector: &Vector3<f32>) -> Vector3<f32> {
        self.matrix.fixed_view::<3, 3>(0, 0) * vector
    }

    /// Origin of the local frame in parent space
    pub fn position(&self) -> Point3<f32> {
        Point3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Rotate about the local X axis; the rotation happens before the
    /// existing placement, so the translation is kept.
    pub fn rotate_x(&mut self, angle: f32) {
        self.matrix *= Self::rotation_x(angle).matrix;
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}
