//! Scene lighting

use serde::{Deserialize, Serialize};

use crate::Point3f;

/// Shadow-casting parameters of a directional light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 2048,
            near: 0.5,
            far: 50.0,
        }
    }
}

/// A light owned by the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Light {
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: Point3f,
        shadow: Option<ShadowSettings>,
    },
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
}

impl Light {
    /// White directional light at `position`, shining towards the origin
    pub fn directional(position: Point3f, intensity: f32) -> Self {
        Light::Directional {
            color: [1.0, 1.0, 1.0],
            intensity,
            position,
            shadow: None,
        }
    }

    /// White ambient light
    pub fn ambient(intensity: f32) -> Self {
        Light::Ambient {
            color: [1.0, 1.0, 1.0],
            intensity,
        }
    }

    /// Enable shadows on a directional light; no-op for other kinds
    pub fn with_shadow(mut self, settings: ShadowSettings) -> Self {
        if let Light::Directional { shadow, .. } = &mut self {
            *shadow = Some(settings);
        }
        self
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Directional { intensity, .. } | Light::Ambient { intensity, .. } => *intensity,
        }
    }
}
