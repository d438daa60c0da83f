//! Camera controllers
//!
//! A controller turns pointer and wheel input into camera motion. Input only
//! moves the controller's goal pose; [`CameraController::update`] eases the
//! camera towards that goal once per frame and reports whether it moved.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use sceneview_core::Aabb;

use crate::camera::Camera;
use crate::viewport::Viewport;

/// Below this, current and goal pose count as equal
const SETTLE_EPSILON: f32 = 1e-4;

/// Keeps the polar angle off the poles, where the up vector degenerates
const POLAR_MARGIN: f32 = 1e-3;

const MIN_DISTANCE: f32 = 1e-3;

/// What a pointer button or the wheel does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    None,
    Rotate,
    Truck,
    Dolly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// Input forwarded from the host surface, in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    PointerDown { button: PointerButton, x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp { button: PointerButton },
    /// Positive `delta` zooms out
    Wheel { delta: f32, x: f32, y: f32 },
}

/// Tuning for [`OrbitControls`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub dolly_speed: f32,
    /// Zoom towards the point under the cursor instead of the orbit target
    pub dolly_to_cursor: bool,
    /// Seconds to approach the goal pose; zero snaps immediately
    pub smooth_time: f32,
    /// Smooth time used while a drag is in progress
    pub dragging_smooth_time: f32,
    pub left_button: ControlAction,
    pub middle_button: ControlAction,
    pub right_button: ControlAction,
    pub wheel: ControlAction,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            dolly_speed: 0.4,
            dolly_to_cursor: true,
            smooth_time: 0.0,
            dragging_smooth_time: 0.0,
            left_button: ControlAction::None,
            middle_button: ControlAction::Dolly,
            right_button: ControlAction::Rotate,
            wheel: ControlAction::Dolly,
        }
    }
}

impl ControlsConfig {
    pub fn action_for(&self, button: PointerButton) -> ControlAction {
        match button {
            PointerButton::Left => self.left_button,
            PointerButton::Middle => self.middle_button,
            PointerButton::Right => self.right_button,
        }
    }
}

/// Damped input-to-camera-motion translator
pub trait CameraController {
    /// Advance by `dt` seconds and write the result into `camera`.
    ///
    /// Returns true when the camera changed.
    fn update(&mut self, camera: &mut Camera, dt: f32) -> bool;

    /// Move so that `bounds` fills the view; without `animate` the next
    /// update jumps straight to the framed pose.
    fn fit_to_box(&mut self, camera: &Camera, bounds: &Aabb, animate: bool);

    /// Feed one input event; returns true if the controller used it
    fn handle_input(&mut self, camera: &Camera, viewport: Viewport, input: ControlInput) -> bool;

    /// Detach from input; later input and updates are ignored
    fn dispose(&mut self);
}

/// Orbit pose in spherical coordinates around a target, Y up
#[derive(Debug, Clone, Copy, PartialEq)]
struct Orbit {
    target: Point3<f32>,
    radius: f32,
    /// Angle from +Y
    polar: f32,
    /// Angle about +Y, measured from +Z towards +X
    azimuth: f32,
}

impl Orbit {
    fn from_camera(camera: &Camera) -> Self {
        let offset = camera.position - camera.target;
        let radius = offset.norm().max(MIN_DISTANCE);
        Self {
            target: camera.target,
            radius,
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            azimuth: offset.x.atan2(offset.z),
        }
    }

    fn offset(&self) -> Vector3<f32> {
        let sin_polar = self.polar.sin();
        Vector3::new(
            self.radius * sin_polar * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * sin_polar * self.azimuth.cos(),
        )
    }

    fn position(&self) -> Point3<f32> {
        self.target + self.offset()
    }

    /// Camera right and up axes for this pose
    fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = -self.offset().normalize();
        let right = forward.cross(&Vector3::y()).normalize();
        let up = right.cross(&forward);
        (right, up)
    }

    fn approach(&mut self, goal: &Orbit, t: f32) {
        self.target += (goal.target - self.target) * t;
        self.radius += (goal.radius - self.radius) * t;
        self.polar += (goal.polar - self.polar) * t;
        self.azimuth += (goal.azimuth - self.azimuth) * t;
    }

    fn settled_at(&self, goal: &Orbit) -> bool {
        (goal.target - self.target).norm() < SETTLE_EPSILON
            && (goal.radius - self.radius).abs() < SETTLE_EPSILON
            && (goal.polar - self.polar).abs() < SETTLE_EPSILON
            && (goal.azimuth - self.azimuth).abs() < SETTLE_EPSILON
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    action: ControlAction,
    button: PointerButton,
    last: (f32, f32),
}

/// Orbit, truck and dolly controls around a target point
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    current: Orbit,
    goal: Orbit,
    drag: Option<Drag>,
    /// Camera must be rewritten on the next update even if settled
    needs_sync: bool,
    enabled: bool,
}

impl OrbitControls {
    /// Attach to `camera`, starting from its current pose
    pub fn new(camera: &Camera, config: ControlsConfig) -> Self {
        let orbit = Orbit::from_camera(camera);
        Self {
            config,
            current: orbit,
            goal: orbit,
            drag: None,
            needs_sync: false,
            enabled: true,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Point the camera orbits around, once settled
    pub fn goal_target(&self) -> Point3<f32> {
        self.goal.target
    }

    /// Camera distance from the target, once settled
    pub fn goal_distance(&self) -> f32 {
        self.goal.radius
    }

    fn smooth_time(&self) -> f32 {
        if self.drag.is_some() {
            self.config.dragging_smooth_time
        } else {
            self.config.smooth_time
        }
    }

    fn rotate(&mut self, dx: f32, dy: f32, viewport: Viewport) {
        let height = viewport.height.max(1) as f32;
        self.goal.azimuth -= 2.0 * PI * dx / height;
        self.goal.polar =
            (self.goal.polar - 2.0 * PI * dy / height).clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
    }

    fn truck(&mut self, camera: &Camera, dx: f32, dy: f32, viewport: Viewport) {
        // World units per pixel at the target's depth.
        let scale = 2.0 * self.goal.radius * (camera.fov / 2.0).tan() / viewport.height.max(1) as f32;
        let (right, up) = self.goal.basis();
        self.goal.target += (-right * dx + up * dy) * scale;
    }

    fn dolly(&mut self, camera: &Camera, viewport: Viewport, delta: f32, cursor: (f32, f32)) {
        let scale = 0.95f32.powf(-delta * self.config.dolly_speed);
        let radius = (self.goal.radius * scale).max(MIN_DISTANCE);

        if self.config.dolly_to_cursor && !viewport.is_empty() {
            // Slide the target towards the point under the cursor on the
            // plane through the target, so that point stays put on screen.
            let ndc_x = cursor.0 / viewport.width as f32 * 2.0 - 1.0;
            let ndc_y = 1.0 - cursor.1 / viewport.height as f32 * 2.0;
            let half_height = self.goal.radius * (camera.fov / 2.0).tan();
            let half_width = half_height * camera.aspect_ratio;
            let (right, up) = self.goal.basis();
            let under_cursor = right * (ndc_x * half_width) + up * (ndc_y * half_height);
            self.goal.target += under_cursor * (1.0 - radius / self.goal.radius);
        }
        self.goal.radius = radius;
    }
}

impl CameraController for OrbitControls {
    fn update(&mut self, camera: &mut Camera, dt: f32) -> bool {
        if !self.enabled {
            return false;
        }
        let settled = self.current.settled_at(&self.goal);
        if settled && !self.needs_sync {
            return false;
        }

        let smooth_time = self.smooth_time();
        if settled || smooth_time <= 0.0 {
            self.current = self.goal;
        } else {
            let t = 1.0 - (-dt.max(0.0) * 4.0 / smooth_time).exp();
            self.current.approach(&self.goal, t);
            if self.current.settled_at(&self.goal) {
                self.current = self.goal;
            }
        }

        camera.position = self.current.position();
        camera.target = self.current.target;
        camera.up = Vector3::y();
        self.needs_sync = false;
        true
    }

    fn fit_to_box(&mut self, camera: &Camera, bounds: &Aabb, animate: bool) {
        if bounds.is_empty() {
            return;
        }
        let radius = bounds.bounding_radius().max(MIN_DISTANCE);
        let vertical = camera.fov / 2.0;
        let horizontal = (vertical.tan() * camera.aspect_ratio).atan();
        let distance = radius / vertical.min(horizontal).sin();

        self.goal.target = bounds.center();
        self.goal.radius = distance;
        if !animate {
            self.current = self.goal;
        }
        self.needs_sync = true;
    }

    fn handle_input(&mut self, camera: &Camera, viewport: Viewport, input: ControlInput) -> bool {
        if !self.enabled {
            return false;
        }
        match input {
            ControlInput::PointerDown { button, x, y } => {
                let action = self.config.action_for(button);
                if action == ControlAction::None {
                    return false;
                }
                self.drag = Some(Drag {
                    action,
                    button,
                    last: (x, y),
                });
                true
            }
            ControlInput::PointerMove { x, y } => {
                let Some(drag) = self.drag else {
                    return false;
                };
                let (dx, dy) = (x - drag.last.0, y - drag.last.1);
                match drag.action {
                    ControlAction::Rotate => self.rotate(dx, dy, viewport),
                    ControlAction::Truck => self.truck(camera, dx, dy, viewport),
                    ControlAction::Dolly => self.dolly(camera, viewport, dy * 0.1, drag.last),
                    ControlAction::None => {}
                }
                self.drag = Some(Drag {
                    last: (x, y),
                    ..drag
                });
                true
            }
            ControlInput::PointerUp { button } => {
                if self.drag.is_some_and(|drag| drag.button == button) {
                    self.drag = None;
                    true
                } else {
                    false
                }
            }
            ControlInput::Wheel { delta, x, y } => match self.config.wheel {
                ControlAction::Dolly => {
                    self.dolly(camera, viewport, delta, (x, y));
                    true
                }
                _ => false,
            },
        }
    }

    fn dispose(&mut self) {
        self.enabled = false;
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sceneview_core::Point3f;

    fn setup() -> (Camera, OrbitControls) {
        let camera = Camera::default();
        let controls = OrbitControls::new(&camera, ControlsConfig::default());
        (camera, controls)
    }

    #[test]
    fn test_idle_update_reports_no_change() {
        let (mut camera, mut controls) = setup();
        let before = camera.clone();
        assert!(!controls.update(&mut camera, 0.016));
        assert_eq!(camera, before);
    }

    #[test]
    fn test_spherical_round_trip() {
        let (camera, controls) = setup();
        let position = controls.current.position();
        assert_relative_eq!(position, camera.position, epsilon = 1e-4);
    }

    #[test]
    fn test_left_button_is_inert() {
        let (mut camera, mut controls) = setup();
        let viewport = Viewport::new(800, 600);
        let down = ControlInput::PointerDown { button: PointerButton::Left, x: 10.0, y: 10.0 };
        assert!(!controls.handle_input(&camera, viewport, down));
        assert!(!controls.handle_input(&camera, viewport, ControlInput::PointerMove { x: 90.0, y: 50.0 }));
        assert!(!controls.update(&mut camera, 0.016));
    }

    #[test]
    fn test_right_drag_rotates_once_per_change() {
        let (mut camera, mut controls) = setup();
        let viewport = Viewport::new(800, 600);
        let distance = camera.distance();
        controls.handle_input(&camera, viewport, ControlInput::PointerDown { button: PointerButton::Right, x: 0.0, y: 0.0 });
        controls.handle_input(&camera, viewport, ControlInput::PointerMove { x: 60.0, y: 0.0 });

        let before = camera.position;
        assert!(controls.update(&mut camera, 0.016));
        assert!((camera.position - before).norm() > 0.1);
        assert_relative_eq!(camera.distance(), distance, epsilon = 1e-3);
        assert!(!controls.update(&mut camera, 0.016));
    }

    #[test]
    fn test_wheel_dollies_in() {
        let mut config = ControlsConfig::default();
        config.dolly_to_cursor = false;
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera, config);
        let distance = camera.distance();
        let wheel = ControlInput::Wheel { delta: -5.0, x: 400.0, y: 300.0 };
        assert!(controls.handle_input(&camera, Viewport::new(800, 600), wheel));
        controls.update(&mut camera, 0.016);
        assert!(camera.distance() < distance);
        assert_relative_eq!(camera.target, Point3f::origin(), epsilon = 1e-5);
    }

    #[test]
    fn test_fit_to_box_without_animation() {
        let (mut camera, mut controls) = setup();
        let bounds = Aabb::new(Point3f::new(9.0, -1.0, -1.0), Point3f::new(11.0, 1.0, 1.0));
        controls.fit_to_box(&camera, &bounds, false);
        assert!(controls.update(&mut camera, 0.0));
        assert_relative_eq!(camera.target, Point3f::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(controls.goal_target(), camera.target);

        let radius = bounds.bounding_radius();
        let ndc = camera.project(&(camera.target + Vector3::new(0.0, radius, 0.0))).unwrap();
        assert!(ndc.y.abs() <= 1.0);
        assert!(!controls.update(&mut camera, 0.016));
    }

    #[test]
    fn test_smoothing_eases_towards_goal() {
        let mut config = ControlsConfig::default();
        config.smooth_time = 0.25;
        let mut camera = Camera::default();
        let mut controls = OrbitControls::new(&camera, config);
        let bounds = Aabb::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0));
        controls.fit_to_box(&camera, &bounds, true);

        let goal = controls.goal_distance();
        assert!(controls.update(&mut camera, 0.016));
        assert!((camera.distance() - goal).abs() > 1e-3);
        for _ in 0..600 {
            controls.update(&mut camera, 0.016);
        }
        assert_relative_eq!(camera.distance(), goal, epsilon = 1e-3);
    }

    #[test]
    fn test_dispose_ignores_input() {
        let (mut camera, mut controls) = setup();
        controls.dispose();
        let wheel = ControlInput::Wheel { delta: 3.0, x: 0.0, y: 0.0 };
        assert!(!controls.handle_input(&camera, Viewport::new(10, 10), wheel));
        assert!(!controls.update(&mut camera, 0.016));
        assert!(!controls.is_enabled());
    }
}
