//! Pointer routing: hover resolution, click priority and tap detection

use glam::{Vec2, Vec3};
use std::time::Duration;

use crate::catalog::PartCatalog;
use crate::config::InteractionConfig;

/// Cursor the host should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    /// Pointer is over a clickable affordance
    Actionable,
}

/// Last recorded pointer location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    /// Logical pixels from the top-left of the viewport
    pub screen: Vec2,
    /// Normalized device coordinates, +Y up
    pub ndc: Vec2,
}

impl PointerSample {
    pub fn new(screen: Vec2, viewport: Vec2) -> Self {
        let viewport = viewport.max(Vec2::ONE);
        let ndc = Vec2::new(
            screen.x / viewport.x * 2.0 - 1.0,
            1.0 - screen.y / viewport.y * 2.0,
        );
        Self { screen, ndc }
    }
}

/// Screen position of a visible affordance marker
#[derive(Debug, Clone, PartialEq)]
pub struct AffordanceSpot {
    pub part_id: String,
    pub screen: Vec2,
}

/// Nearest visible affordance within `radius` pixels of the pointer
pub fn affordance_under(pointer: Vec2, spots: &[AffordanceSpot], radius: f32) -> Option<&str> {
    spots
        .iter()
        .map(|s| (s, s.screen.distance(pointer)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(s, _)| s.part_id.as_str())
}

/// Result of one throttled hover pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoverOutcome {
    pub hovered: Option<String>,
    pub over_affordance: bool,
    pub cursor: CursorHint,
}

/// Hover resolution settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverRules {
    pub hit_tolerance: f32,
    pub affordance_radius: f32,
}

impl Default for HoverRules {
    fn default() -> Self {
        Self {
            hit_tolerance: 1.2,
            affordance_radius: 40.0,
        }
    }
}

impl From<&InteractionConfig> for HoverRules {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            hit_tolerance: config.hit_tolerance,
            affordance_radius: config.affordance_radius_px,
        }
    }
}

impl HoverRules {
    /// Turn the nearest ray hit into a hover outcome.
    ///
    /// `hit_point` is the closest surface intersection on the loaded model.
    /// While the pointer sits over the hit part's affordance the current
    /// hover is kept and the cursor turns actionable.
    pub fn resolve(
        &self,
        catalog: &PartCatalog,
        hit_point: Option<Vec3>,
        pointer: Vec2,
        spots: &[AffordanceSpot],
        current_hover: Option<&str>,
    ) -> HoverOutcome {
        let Some(part) = hit_point.and_then(|p| catalog.nearest_within(p, self.hit_tolerance)) else {
            return HoverOutcome::default();
        };

        let over_affordance = spots
            .iter()
            .any(|s| s.part_id == part.id && s.screen.distance(pointer) <= self.affordance_radius);

        if over_affordance {
            HoverOutcome {
                hovered: current_hover.map(str::to_string),
                over_affordance: true,
                cursor: CursorHint::Actionable,
            }
        } else {
            HoverOutcome {
                hovered: Some(part.id.clone()),
                over_affordance: false,
                cursor: CursorHint::Default,
            }
        }
    }
}

/// What a click does, decided in priority order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    OpenDetails(String),
    CloseDetails,
    Focus(String),
    ResetCamera,
}

/// Affordance first, then click-away dismissal, then focus, then reset
pub fn route_click(affordance: Option<&str>, detail_open: bool, hovered: Option<&str>) -> ClickAction {
    if let Some(id) = affordance {
        return ClickAction::OpenDetails(id.to_string());
    }
    if detail_open {
        return ClickAction::CloseDetails;
    }
    match hovered {
        Some(id) => ClickAction::Focus(id.to_string()),
        None => ClickAction::ResetCamera,
    }
}

/// Distinguishes clicks and taps from orbit drags
#[derive(Debug, Clone, Default)]
pub struct PressTracker {
    start_position: Option<Vec2>,
    start_time: Duration,
    is_dragging: bool,
}

impl PressTracker {
    pub fn press(&mut self, position: Vec2, now: Duration) {
        self.start_position = Some(position);
        self.start_time = now;
        self.is_dragging = false;
    }

    pub fn moved(&mut self, position: Vec2, drag_threshold: f32) {
        if let Some(start) = self.start_position {
            if position.distance(start) > drag_threshold {
                self.is_dragging = true;
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Finish the press; returns the press position if it counts as a click.
    /// `max_duration` bounds taps (touch); mice pass `None`.
    pub fn release(&mut self, now: Duration, max_duration: Option<Duration>) -> Option<Vec2> {
        let start = self.start_position.take()?;
        let dragged = std::mem::take(&mut self.is_dragging);
        if dragged {
            return None;
        }
        match max_duration {
            Some(max) if now.saturating_sub(self.start_time) >= max => None,
            _ => Some(start),
        }
    }

    pub fn cancel(&mut self) {
        self.start_position = None;
        self.is_dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(id: &str, x: f32, y: f32) -> AffordanceSpot {
        AffordanceSpot {
            part_id: id.to_string(),
            screen: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_pointer_ndc() {
        let sample = PointerSample::new(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0));
        assert_eq!(sample.ndc, Vec2::ZERO);

        let corner = PointerSample::new(Vec2::ZERO, Vec2::new(800.0, 600.0));
        assert_eq!(corner.ndc, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn test_affordance_under_picks_nearest() {
        let spots = vec![spot("battery", 100.0, 100.0), spot("main-body", 130.0, 100.0)];
        assert_eq!(affordance_under(Vec2::new(125.0, 100.0), &spots, 40.0), Some("main-body"));
        assert_eq!(affordance_under(Vec2::new(300.0, 100.0), &spots, 40.0), None);
    }

    #[test]
    fn test_hover_hit_sets_part() {
        let catalog = PartCatalog::builtin();
        let rules = HoverRules::default();
        let outcome = rules.resolve(
            &catalog,
            Some(Vec3::new(0.0, 0.0, 0.85)),
            Vec2::new(500.0, 500.0),
            &[],
            None,
        );
        assert_eq!(outcome.hovered.as_deref(), Some("camera-gimbal"));
        assert_eq!(outcome.cursor, CursorHint::Default);
        assert!(!outcome.over_affordance);
    }

    #[test]
    fn test_hover_miss_clears() {
        let catalog = PartCatalog::builtin();
        let rules = HoverRules::default();

        let outcome = rules.resolve(&catalog, None, Vec2::ZERO, &[], Some("battery"));
        assert_eq!(outcome, HoverOutcome::default());

        // A hit too far from every anchor is a miss
        let outcome = rules.resolve(&catalog, Some(Vec3::new(3.0, 0.0, 3.0)), Vec2::ZERO, &[], Some("battery"));
        assert!(outcome.hovered.is_none());
    }

    #[test]
    fn test_hover_over_affordance_keeps_part() {
        let catalog = PartCatalog::builtin();
        let rules = HoverRules::default();
        let spots = vec![spot("battery", 200.0, 220.0)];

        let outcome = rules.resolve(
            &catalog,
            Some(Vec3::new(0.0, -0.05, 0.05)),
            Vec2::new(210.0, 230.0),
            &spots,
            Some("battery"),
        );
        assert!(outcome.over_affordance);
        assert_eq!(outcome.cursor, CursorHint::Actionable);
        assert_eq!(outcome.hovered.as_deref(), Some("battery"));
    }

    #[test]
    fn test_click_priority() {
        assert_eq!(
            route_click(Some("battery"), true, Some("main-body")),
            ClickAction::OpenDetails("battery".to_string())
        );
        assert_eq!(route_click(None, true, Some("main-body")), ClickAction::CloseDetails);
        assert_eq!(
            route_click(None, false, Some("camera-gimbal")),
            ClickAction::Focus("camera-gimbal".to_string())
        );
        assert_eq!(route_click(None, false, None), ClickAction::ResetCamera);
    }

    #[test]
    fn test_press_tracker_click_and_drag() {
        let mut tracker = PressTracker::default();
        tracker.press(Vec2::new(10.0, 10.0), Duration::ZERO);
        tracker.moved(Vec2::new(14.0, 12.0), 10.0);
        assert_eq!(tracker.release(Duration::from_secs(2), None), Some(Vec2::new(10.0, 10.0)));

        tracker.press(Vec2::new(10.0, 10.0), Duration::ZERO);
        tracker.moved(Vec2::new(40.0, 10.0), 10.0);
        assert!(tracker.is_dragging());
        assert_eq!(tracker.release(Duration::from_millis(50), None), None);

        // Released without a press
        assert_eq!(tracker.release(Duration::from_millis(60), None), None);
    }

    #[test]
    fn test_long_touch_is_not_a_tap() {
        let mut tracker = PressTracker::default();
        let max = Some(Duration::from_millis(300));

        tracker.press(Vec2::new(5.0, 5.0), Duration::from_millis(1000));
        assert!(tracker.release(Duration::from_millis(1200), max).is_some());

        tracker.press(Vec2::new(5.0, 5.0), Duration::from_millis(2000));
        assert!(tracker.release(Duration::from_millis(2400), max).is_none());
    }
}
