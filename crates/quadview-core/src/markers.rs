//! Proximity and facing rules for part markers
//!
//! Every part owns a name marker and a "know more" affordance marker. Their
//! visibility, opacity and scale are a pure function of the camera pose and
//! the part anchor; the renderer only applies what is computed here.

use glam::{Mat3, Quat, Vec3};

use crate::catalog::PartCatalog;
use crate::config::MarkerConfig;

/// Camera position and orientation for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CameraPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` looking at `target` with +Y up
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let back = (position - target).normalize_or_zero();
        if back == Vec3::ZERO {
            return Self::new(position, Quat::IDENTITY);
        }
        let up = if back.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let right = up.cross(back).normalize();
        let up = back.cross(right);
        Self::new(position, Quat::from_mat3(&Mat3::from_cols(right, up, back)))
    }

    /// Unit view direction (-Z in camera space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// Visual state of one marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerVisual {
    pub visible: bool,
    pub opacity: f32,
    /// Multiplier on the marker's base scale
    pub scale: f32,
}

impl MarkerVisual {
    pub const HIDDEN: MarkerVisual = MarkerVisual {
        visible: false,
        opacity: 0.0,
        scale: 1.0,
    };
}

/// Per-part result of one marker pass
#[derive(Debug, Clone, PartialEq)]
pub struct PartMarkerState {
    pub part_id: String,
    pub name: MarkerVisual,
    pub affordance_visible: bool,
}

/// Thresholds and placement for markers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerRules {
    pub proximity_threshold: f32,
    pub facing_threshold: f32,
    pub label_offset: f32,
    pub affordance_offset: f32,
}

impl Default for MarkerRules {
    fn default() -> Self {
        Self::from(&MarkerConfig::default())
    }
}

impl From<&MarkerConfig> for MarkerRules {
    fn from(config: &MarkerConfig) -> Self {
        Self {
            proximity_threshold: config.proximity_threshold,
            facing_threshold: config.facing_threshold,
            label_offset: config.label_offset,
            affordance_offset: config.affordance_offset,
        }
    }
}

impl MarkerRules {
    /// Visibility, opacity and scale of a name marker anchored at `anchor`.
    ///
    /// With `force_visible` the distance/facing gate is bypassed but the
    /// fade and shrink still follow distance.
    pub fn evaluate(&self, pose: &CameraPose, anchor: Vec3, force_visible: bool) -> MarkerVisual {
        let offset = anchor - pose.position;
        let distance = offset.length();
        let facing = offset.normalize_or_zero().dot(pose.forward());

        let in_range = facing > self.facing_threshold && distance < self.proximity_threshold;
        let factor = (distance / self.proximity_threshold).clamp(0.0, 1.0);

        MarkerVisual {
            visible: in_range || force_visible,
            opacity: 1.0 - 0.7 * factor,
            scale: 1.0 - 0.4 * factor,
        }
    }

    pub fn name_position(&self, anchor: Vec3) -> Vec3 {
        anchor + Vec3::Y * self.label_offset
    }

    pub fn affordance_position(&self, anchor: Vec3) -> Vec3 {
        anchor + Vec3::Y * self.affordance_offset
    }

    /// Marker state for every cataloged part.
    ///
    /// The affordance of a part shows only while that part is hovered and its
    /// name marker is visible, so at most one affordance is ever visible.
    pub fn compute_frame(
        &self,
        pose: &CameraPose,
        catalog: &PartCatalog,
        hovered: Option<&str>,
        force_visible: bool,
    ) -> Vec<PartMarkerState> {
        catalog
            .list()
            .iter()
            .map(|part| {
                let name = self.evaluate(pose, part.anchor(), force_visible);
                PartMarkerState {
                    affordance_visible: name.visible && hovered == Some(part.id.as_str()),
                    part_id: part.id.clone(),
                    name,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_from(position: Vec3) -> CameraPose {
        CameraPose::looking_at(position, Vec3::ZERO)
    }

    #[test]
    fn test_looking_at_forward() {
        let pose = looking_from(Vec3::new(0.0, 1.0, 5.0));
        let expected = (Vec3::ZERO - pose.position).normalize();
        assert!(pose.forward().distance(expected) < 1e-5);

        // Straight down still yields a valid rotation
        let top = looking_from(Vec3::new(0.0, 4.0, 0.0));
        assert!(top.forward().distance(Vec3::NEG_Y) < 1e-5);
    }

    #[test]
    fn test_close_facing_marker_visible() {
        let rules = MarkerRules::default();
        let pose = looking_from(Vec3::new(0.0, 0.5, 2.0));
        let visual = rules.evaluate(&pose, Vec3::ZERO, false);

        assert!(visual.visible);
        let factor = pose.position.length() / 3.0;
        assert!((visual.opacity - (1.0 - 0.7 * factor)).abs() < 1e-5);
        assert!((visual.scale - (1.0 - 0.4 * factor)).abs() < 1e-5);
    }

    #[test]
    fn test_marker_behind_camera_hidden() {
        let rules = MarkerRules::default();
        let pose = looking_from(Vec3::new(0.0, 0.0, 1.0));
        let behind = Vec3::new(0.0, 0.0, 2.0);
        assert!(!rules.evaluate(&pose, behind, false).visible);
    }

    #[test]
    fn test_distant_markers_hidden_unless_forced() {
        let rules = MarkerRules::default();
        let catalog = PartCatalog::builtin();

        for step in 0..40 {
            let angle = step as f32 * 0.3;
            let radius = 3.5 + step as f32 * 0.25;
            let position = Vec3::new(angle.cos() * radius, 1.0, angle.sin() * radius);
            let pose = looking_from(position);

            for part in catalog.list() {
                let anchor = part.anchor();
                if anchor.distance(position) < rules.proximity_threshold {
                    continue;
                }
                assert!(!rules.evaluate(&pose, anchor, false).visible, "{}", part.id);

                let forced = rules.evaluate(&pose, anchor, true);
                assert!(forced.visible);
                // Fully faded state past the threshold
                assert!((forced.opacity - 0.3).abs() < 1e-5);
                assert!((forced.scale - 0.6).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_opacity_non_increasing_with_distance() {
        let rules = MarkerRules::default();
        let mut previous = f32::INFINITY;

        for step in 1..=30 {
            let distance = step as f32 * 0.1;
            let pose = looking_from(Vec3::new(0.0, 0.0, distance));
            let visual = rules.evaluate(&pose, Vec3::ZERO, true);
            assert!(visual.opacity <= previous);
            previous = visual.opacity;
        }
    }

    #[test]
    fn test_at_most_one_affordance_visible() {
        let rules = MarkerRules::default();
        let catalog = PartCatalog::builtin();

        for step in 0..60 {
            let angle = step as f32 * 0.21;
            let radius = 1.0 + (step % 6) as f32 * 0.4;
            let pose = looking_from(Vec3::new(angle.cos() * radius, 0.6, angle.sin() * radius));

            for hovered in catalog.list().iter().map(|p| Some(p.id.as_str())).chain([None]) {
                for force in [false, true] {
                    let frame = rules.compute_frame(&pose, &catalog, hovered, force);
                    let shown: Vec<_> = frame.iter().filter(|m| m.affordance_visible).collect();
                    assert!(shown.len() <= 1);
                    if let Some(state) = shown.first() {
                        assert_eq!(Some(state.part_id.as_str()), hovered);
                        assert!(state.name.visible);
                    }
                }
            }
        }
    }

    #[test]
    fn test_force_shows_affordance_for_hovered_part_only() {
        let rules = MarkerRules::default();
        let catalog = PartCatalog::builtin();
        let pose = looking_from(Vec3::new(0.0, 1.0, 8.0));

        let frame = rules.compute_frame(&pose, &catalog, Some("battery"), true);
        assert!(frame.iter().all(|m| m.name.visible));
        let battery = frame.iter().find(|m| m.part_id == "battery").unwrap();
        assert!(battery.affordance_visible);

        let frame = rules.compute_frame(&pose, &catalog, Some("battery"), false);
        assert!(frame.iter().all(|m| !m.affordance_visible));
    }

    #[test]
    fn test_marker_offsets() {
        let rules = MarkerRules::default();
        let anchor = Vec3::new(0.7, 0.15, 0.7);
        assert!((rules.name_position(anchor).y - 0.55).abs() < 1e-6);
        assert!((rules.affordance_position(anchor).y + 0.05).abs() < 1e-6);
    }
}
