//! Camera controls: orbit navigation plus director-driven transitions

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use quadview_core::config::CameraConfig;
use quadview_core::{CameraDirector, CameraGoal, OrbitRig};

use crate::app::{ViewerLifecycle, ViewerSet, ViewerSettings};

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Free orbit rig plus the Overview/Focused director
#[derive(Debug, Clone, Resource)]
pub struct CameraControl {
    pub rig: OrbitRig,
    pub director: CameraDirector,
}

impl CameraControl {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            rig: OrbitRig::new(config),
            director: CameraDirector::new(config),
        }
    }

    /// Pose the camera shows this frame
    pub fn current_goal(&self) -> CameraGoal {
        self.director
            .transition()
            .map(|t| t.sample())
            .unwrap_or_else(|| self.rig.goal())
    }
}

impl FromWorld for CameraControl {
    fn from_world(world: &mut World) -> Self {
        let config = world
            .get_resource::<ViewerSettings>()
            .map(|s| s.config.camera.clone())
            .unwrap_or_default();
        Self::new(&config)
    }
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraControl>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), reset_camera_control)
            .add_systems(
                Update,
                (orbit_controls, drive_camera).chain().in_set(ViewerSet::Camera),
            );
    }
}

fn reset_camera_control(settings: Res<ViewerSettings>, mut control: ResMut<CameraControl>) {
    *control = CameraControl::new(&settings.config.camera);
}

/// Pixels per scroll line when the browser reports pixel deltas
const PIXELS_PER_LINE: f32 = 100.0;

fn orbit_controls(
    mut control: ResMut<CameraControl>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut contexts: EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    // Transitions own the camera until they finish
    if egui_wants_pointer || control.director.is_animating() {
        return;
    }

    if mouse_button.pressed(MouseButton::Left) && mouse_motion.delta != Vec2::ZERO {
        control.rig.orbit(mouse_motion.delta);
    }

    if mouse_scroll.delta.y != 0.0 {
        let lines = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / PIXELS_PER_LINE,
        };
        control.rig.zoom(lines);
    }

    let active: Vec<_> = touches.iter().collect();
    match active.as_slice() {
        [touch] => {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                control.rig.orbit(delta);
            }
        }
        // Pinch to zoom
        [t1, t2] => {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            if curr_dist > 1.0 && prev_dist > 1.0 {
                control.rig.zoom_by(prev_dist / curr_dist);
            }
        }
        _ => {}
    }
}

/// Advance the active transition or the orbit rig, then place the camera
fn drive_camera(
    time: Res<Time>,
    mut control: ResMut<CameraControl>,
    mut cameras: Query<&mut Transform, With<MainCamera>>,
) {
    let dt = time.delta_secs();
    let control = &mut *control;

    let goal = match control.director.tick(dt) {
        Some(step) => {
            if step.finished {
                // Orbiting resumes from wherever the transition ended
                control.rig.sync_to(step.pose);
            }
            step.pose
        }
        None => {
            control.rig.step(dt, control.director.auto_rotate());
            control.rig.goal()
        }
    };

    for mut transform in &mut cameras {
        *transform = Transform::from_translation(goal.position).looking_at(goal.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadview_core::ViewerConfig;

    #[test]
    fn test_current_goal_follows_transition() {
        let config = ViewerConfig::default();
        let mut control = CameraControl::new(&config.camera);
        let start = control.current_goal();
        assert!(start.position.distance(Vec3::new(0.0, 1.0, 5.0)) < 1e-4);

        let goal = control.director.focus("camera-gimbal", Vec3::new(0.0, 0.0, 0.9), start);
        assert_eq!(control.current_goal(), start);

        control.director.tick(0.5);
        let midway = control.current_goal();
        assert!(midway.position.distance(start.position) > 0.0);
        assert!(midway.position.distance(goal.position) > 0.0);
    }
}
