//! Camera controls and orbit navigation (Y-up)

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bimview_core::OrbitPose;

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Angle around +Y, measured from +X toward +Z
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 20.0,
            target_distance: 20.0,
            min_distance: 0.5,
            max_distance: 200.0,
            azimuth: 0.96,
            elevation: 0.35,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }
}

impl CameraSettings {
    /// Jump to a camera position looking at `target`
    pub fn look_from(&mut self, position: Vec3, target: Vec3) {
        let pose = OrbitPose::from_offset(position - target);
        let distance = pose.distance.max(0.01);

        self.azimuth = pose.azimuth;
        self.elevation = pose.elevation.clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
        self.distance = distance;
        self.target_distance = distance;
        self.min_distance = distance * 0.02;
        self.max_distance = distance * 20.0;
        self.target = target;
        self.target_focus = target;
    }

    /// Camera position for the current orbit state
    pub fn eye(&self) -> Vec3 {
        let pose = OrbitPose {
            azimuth: self.azimuth,
            elevation: self.elevation,
            distance: self.distance,
        };
        self.target + pose.to_offset()
    }

    fn zoom(&mut self, factor: f32) {
        self.target_distance = (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    fn orbit(&mut self, delta: Vec2) {
        self.azimuth += delta.x * self.sensitivity;
        self.elevation = (self.elevation + delta.y * self.sensitivity).clamp(-ELEVATION_LIMIT, ELEVATION_LIMIT);
    }
}

const ELEVATION_LIMIT: f32 = 1.5;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Update, update_camera);
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Leave the pointer to the category panel while it is hovered
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);

    let motion = mouse_motion.delta;

    if !egui_wants_pointer {
        if mouse_button.pressed(MouseButton::Left) {
            settings.orbit(motion);
        }

        if mouse_button.pressed(MouseButton::Right) || mouse_button.pressed(MouseButton::Middle) {
            // Screen-space pan: right vector on the ground plane, up is +Y
            let right = Vec3::new(settings.azimuth.sin(), 0.0, -settings.azimuth.cos());
            let pan_speed = settings.distance * 0.002;
            settings.target_focus -= right * motion.x * pan_speed;
            settings.target_focus += Vec3::Y * motion.y * pan_speed;
        }

        if mouse_scroll.delta.y != 0.0 {
            let zoom_factor = 1.0 - mouse_scroll.delta.y * settings.zoom_speed * 0.3;
            settings.zoom(zoom_factor.max(0.1));
        }
    }

    // Touch: one finger orbits, two fingers pinch-zoom
    let touches: Vec<_> = touch_input.iter().collect();
    match touches.as_slice() {
        [touch] if !egui_wants_pointer => {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.orbit(delta);
            }
        }
        [t1, t2] => {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            settings.zoom(prev_dist / curr_dist.max(1.0));
        }
        _ => {}
    }

    // Smooth interpolation for zoom and target
    let settings = &mut *settings;
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    let focus = settings.target_focus;
    settings.target += (focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}
