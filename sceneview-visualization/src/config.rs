//! Viewer configuration

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use sceneview_core::{Light, Material, Point3f, ShadowSettings};

use crate::controls::ControlsConfig;
use crate::labels::LabelLayerStyle;

/// Model document the viewer loads when no other source is configured
pub const DEFAULT_MODEL_URL: &str =
    "https://storage.yandexcloud.net/lahta.contextmachine.online/files/pretty_ceiling_props.json";

/// Initial camera pose and projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [10.0, 10.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: [5.0, 10.0, 15.0],
            cast_shadow: true,
            shadow: ShadowSettings::default(),
        }
    }
}

impl DirectionalLightConfig {
    pub fn to_light(&self) -> Light {
        let [x, y, z] = self.position;
        let light = Light::Directional {
            color: self.color,
            intensity: self.intensity,
            position: Point3f::new(x, y, z),
            shadow: None,
        };
        if self.cast_shadow {
            light.with_shadow(self.shadow)
        } else {
            light
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.5,
        }
    }
}

impl AmbientLightConfig {
    pub fn to_light(&self) -> Light {
        Light::Ambient {
            color: self.color,
            intensity: self.intensity,
        }
    }
}

/// Everything a viewer needs to know before it is built.
///
/// All fields have defaults, so a partial JSON document deserializes into a
/// complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model_url: String,
    pub background: [f32; 3],
    pub camera: CameraConfig,
    pub directional_light: DirectionalLightConfig,
    pub ambient_light: AmbientLightConfig,
    pub controls: ControlsConfig,
    pub label_layer: LabelLayerStyle,
    /// Rotation about X applied to every loaded model, in radians
    pub model_rotation_x: f32,
    /// Frame the loaded model with an animated camera move
    pub animate_fit: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            background: Material::color_from_hex(0x333333),
            camera: CameraConfig::default(),
            directional_light: DirectionalLightConfig::default(),
            ambient_light: AmbientLightConfig::default(),
            controls: ControlsConfig::default(),
            label_layer: LabelLayerStyle::default(),
            // Model files are Z-up; the viewer is Y-up.
            model_rotation_x: -FRAC_PI_2,
            animate_fit: false,
        }
    }
}

impl ViewerConfig {
    pub fn with_model_url(mut self, url: impl Into<String>) -> Self {
        self.model_url = url.into();
        self
    }

    pub fn with_background(mut self, background: [f32; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_controls(mut self, controls: ControlsConfig) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_model_rotation_x(mut self, angle: f32) -> Self {
        self.model_rotation_x = angle;
        self
    }

    /// Lights added to every new scene
    pub fn lights(&self) -> [Light; 2] {
        [
            self.directional_light.to_light(),
            self.ambient_light.to_light(),
        ]
    }
}
