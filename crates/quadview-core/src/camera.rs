//! Camera director and orbit rig
//!
//! The director owns the Overview/Focused state machine and the eased
//! transitions between goal poses. The orbit rig is the free camera used
//! between transitions (drag to orbit, scroll to zoom, auto-rotate).

use glam::{Vec2, Vec3};

use crate::config::CameraConfig;

/// Ease-out cubic on [0, 1]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Camera position and look-at target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraGoal {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraGoal {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    fn lerp(&self, other: &CameraGoal, t: f32) -> CameraGoal {
        CameraGoal {
            position: self.position.lerp(other.position, t),
            target: self.target.lerp(other.target, t),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraMode {
    Overview,
    Focused(String),
}

/// Time-boxed eased interpolation between two goals
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransition {
    pub from: CameraGoal,
    pub to: CameraGoal,
    elapsed: f32,
    duration: f32,
}

impl CameraTransition {
    pub fn new(from: CameraGoal, to: CameraGoal, duration: f32) -> Self {
        Self {
            from,
            to,
            elapsed: 0.0,
            duration: duration.max(f32::EPSILON),
        }
    }

    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn sample(&self) -> CameraGoal {
        self.from.lerp(&self.to, ease_out_cubic(self.progress()))
    }

    pub fn advance(&mut self, dt: f32) -> CameraGoal {
        self.elapsed += dt.max(0.0);
        self.sample()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// One frame of director output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionStep {
    pub pose: CameraGoal,
    pub finished: bool,
}

/// Overview/Focused state machine
#[derive(Debug, Clone)]
pub struct CameraDirector {
    mode: CameraMode,
    overview: CameraGoal,
    duration: f32,
    auto_rotate: bool,
    transition: Option<CameraTransition>,
}

impl Default for CameraDirector {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl CameraDirector {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            mode: CameraMode::Overview,
            overview: CameraGoal::new(
                Vec3::from_array(config.overview_position),
                Vec3::from_array(config.overview_target),
            ),
            duration: config.transition_secs,
            auto_rotate: true,
            transition: None,
        }
    }

    /// Goal pose that frames a part anchored at `anchor`
    pub fn focus_goal(anchor: Vec3) -> CameraGoal {
        CameraGoal::new(
            Vec3::new(anchor.x * 0.8, anchor.y * 0.8 + 0.5, anchor.z * 0.8 + 2.0),
            anchor,
        )
    }

    pub fn mode(&self) -> &CameraMode {
        &self.mode
    }

    pub fn overview(&self) -> CameraGoal {
        self.overview
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn transition(&self) -> Option<&CameraTransition> {
        self.transition.as_ref()
    }

    /// Start moving toward the part and stop auto-rotation. Returns the goal.
    pub fn focus(&mut self, part_id: &str, anchor: Vec3, current: CameraGoal) -> CameraGoal {
        let goal = Self::focus_goal(anchor);
        self.mode = CameraMode::Focused(part_id.to_string());
        self.auto_rotate = false;
        self.transition = Some(CameraTransition::new(current, goal, self.duration));
        tracing::debug!(part = part_id, "Camera focusing");
        goal
    }

    /// Return to Overview. A no-op when already there; returns whether a
    /// transition was started.
    pub fn reset(&mut self, current: CameraGoal) -> bool {
        if self.mode == CameraMode::Overview {
            return false;
        }
        self.mode = CameraMode::Overview;
        self.auto_rotate = true;
        self.transition = Some(CameraTransition::new(current, self.overview, self.duration));
        tracing::debug!("Camera returning to overview");
        true
    }

    /// Advance the active transition, if any
    pub fn tick(&mut self, dt: f32) -> Option<TransitionStep> {
        let transition = self.transition.as_mut()?;
        let pose = transition.advance(dt);
        let finished = transition.is_finished();
        if finished {
            self.transition = None;
        }
        Some(TransitionStep { pose, finished })
    }

    /// Drop any in-flight transition and return to the initial state
    pub fn restart(&mut self) {
        self.mode = CameraMode::Overview;
        self.auto_rotate = true;
        self.transition = None;
    }
}

/// Spherical orbit camera around a target, +Y up
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitRig {
    pub target: Vec3,
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_elevation: f32,
    pub max_elevation: f32,
    pub auto_rotate_speed: f32,
}

impl Default for OrbitRig {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl OrbitRig {
    pub fn new(config: &CameraConfig) -> Self {
        let mut rig = Self {
            target: Vec3::ZERO,
            distance: 1.0,
            target_distance: 1.0,
            azimuth: 0.0,
            elevation: 0.0,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            // Polar angle is measured from +Y
            min_elevation: std::f32::consts::FRAC_PI_2 - config.max_polar_angle,
            max_elevation: std::f32::consts::FRAC_PI_2 - 0.01,
            auto_rotate_speed: config.auto_rotate_speed,
        };
        rig.sync_to(CameraGoal::new(
            Vec3::from_array(config.overview_position),
            Vec3::from_array(config.overview_target),
        ));
        rig
    }

    pub fn position(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target + self.distance * Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az)
    }

    pub fn goal(&self) -> CameraGoal {
        CameraGoal::new(self.position(), self.target)
    }

    /// Adopt a pose reached by other means (e.g. a finished transition).
    /// Distance is not clamped so a close focus pose is kept as-is.
    pub fn sync_to(&mut self, goal: CameraGoal) {
        let offset = goal.position - goal.target;
        let distance = offset.length().max(f32::EPSILON);
        self.target = goal.target;
        self.distance = distance;
        self.target_distance = distance;
        self.azimuth = offset.x.atan2(offset.z);
        self.elevation = (offset.y / distance).clamp(-1.0, 1.0).asin();
    }

    /// Apply a drag in logical pixels
    pub fn orbit(&mut self, delta: Vec2) {
        self.azimuth -= delta.x * self.sensitivity;
        self.elevation = (self.elevation + delta.y * self.sensitivity)
            .clamp(self.min_elevation, self.max_elevation);
    }

    /// Apply a scroll step (positive = zoom in)
    pub fn zoom(&mut self, scroll: f32) {
        let zoom_factor = 1.0 - scroll * self.zoom_speed;
        self.target_distance =
            (self.target_distance * zoom_factor).clamp(self.min_distance, self.max_distance);
    }

    /// Scale the zoom goal directly (pinch)
    pub fn zoom_by(&mut self, factor: f32) {
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Damped distance update plus optional auto-rotation
    pub fn step(&mut self, dt: f32, auto_rotate: bool) {
        if auto_rotate {
            self.azimuth += self.auto_rotate_speed * dt;
        }
        let lerp_factor = 1.0 - (-self.smooth_factor * 60.0 * dt).exp();
        self.distance += (self.target_distance - self.distance) * lerp_factor;
    }
}
