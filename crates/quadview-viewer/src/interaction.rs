//! Pointer input, throttled hover ray cast and click dispatch

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use bevy_picking::prelude::{MeshRayCast, MeshRayCastSettings};
use quadview_core::{
    affordance_under, route_click, DisplayedModel, HoverRules, PointerSample, PressTracker, RateLimiter,
    ViewerIntent,
};
use std::time::Duration;

use crate::app::{Catalog, ViewerLifecycle, ViewerSet, ViewerSettings};
use crate::camera::{CameraControl, MainCamera};
use crate::markers::MarkerFrame;
use crate::scene::ModelSurface;
use crate::session::{PendingIntents, ViewerSession};

/// Press tracking for mouse and touch, kept separate
#[derive(Resource, Debug, Default)]
pub struct PointerInput {
    last_cursor: Option<Vec2>,
    mouse: PressTracker,
    touch: PressTracker,
}

/// Caps ray casts per second
#[derive(Resource, Debug)]
pub struct HoverThrottle(pub RateLimiter);

impl FromWorld for HoverThrottle {
    fn from_world(world: &mut World) -> Self {
        let hz = world
            .get_resource::<ViewerSettings>()
            .map(|s| s.config.interaction.raycast_hz)
            .unwrap_or(60.0);
        Self(RateLimiter::per_second(hz))
    }
}

pub struct InteractionPlugin;

impl Plugin for InteractionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerInput>()
            .init_resource::<HoverThrottle>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), reset_pointer_input)
            .add_systems(Update, record_pointer_input.in_set(ViewerSet::Input))
            .add_systems(
                Update,
                (update_hover, dispatch_click).chain().in_set(ViewerSet::Hover),
            );
    }
}

fn reset_pointer_input(
    mut input: ResMut<PointerInput>,
    mut throttle: ResMut<HoverThrottle>,
    settings: Res<ViewerSettings>,
) {
    *input = PointerInput::default();
    throttle.0 = RateLimiter::per_second(settings.config.interaction.raycast_hz);
}

/// Turn raw mouse/touch input into intents. Does not touch viewer state.
#[allow(clippy::too_many_arguments)]
fn record_pointer_input(
    windows: Query<&Window>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    time: Res<Time<Real>>,
    settings: Res<ViewerSettings>,
    mut input: ResMut<PointerInput>,
    mut intents: ResMut<PendingIntents>,
    mut contexts: EguiContexts,
) {
    let Ok(window) = windows.single() else { return };
    let viewport = Vec2::new(window.width(), window.height());
    let now = time.elapsed();
    let interaction = &settings.config.interaction;
    let drag_threshold = interaction.drag_threshold_px;

    // Panels and overlays swallow the pointer
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    let cursor = if egui_wants_pointer { None } else { window.cursor_position() };
    if cursor != input.last_cursor {
        match cursor {
            Some(position) => intents
                .0
                .push(ViewerIntent::PointerMoved(PointerSample::new(position, viewport))),
            None => intents.0.push(ViewerIntent::PointerLeft),
        }
        input.last_cursor = cursor;
    }

    // Mouse: a press that travels past the threshold is an orbit drag
    if let Some(position) = cursor {
        if mouse_button.just_pressed(MouseButton::Left) {
            input.mouse.press(position, now);
        } else if mouse_button.pressed(MouseButton::Left) {
            input.mouse.moved(position, drag_threshold);
        }
    }
    if mouse_button.just_released(MouseButton::Left) {
        if egui_wants_pointer {
            input.mouse.cancel();
        } else if let Some(position) = input.mouse.release(now, None) {
            intents.0.push(ViewerIntent::Click(position));
        }
    }

    // Touch: short taps without drag are clicks
    if !egui_wants_pointer {
        for touch in touches.iter_just_pressed() {
            input.touch.press(touch.position(), now);
        }
    }
    for touch in touches.iter() {
        input.touch.moved(touch.position(), drag_threshold);
    }
    // Pinch is never a tap
    if touches.iter().count() > 1 {
        input.touch.cancel();
    }
    let tap_max = Some(Duration::from_millis(interaction.tap_max_ms));
    for _ in touches.iter_just_released() {
        if let Some(position) = input.touch.release(now, tap_max) {
            // Hover must resolve where the finger was
            intents
                .0
                .push(ViewerIntent::PointerMoved(PointerSample::new(position, viewport)));
            intents.0.push(ViewerIntent::Click(position));
        }
    }
}

/// Ray cast the loaded model under the pointer, at most `raycast_hz` times a second
#[allow(clippy::too_many_arguments)]
fn update_hover(
    time: Res<Time<Real>>,
    mut throttle: ResMut<HoverThrottle>,
    mut session: ResMut<ViewerSession>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    frame: Res<MarkerFrame>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    surfaces: Query<(), With<ModelSurface>>,
    mut ray_cast: MeshRayCast,
) {
    // A click always sees fresh hover state
    if session.pending_click.is_some() {
        throttle.0.force();
    }
    if !throttle.0.ready(time.elapsed()) {
        return;
    }

    let Some(pointer) = session.pointer else { return };
    // The placeholder is not interactive
    if session.state.displayed() != DisplayedModel::Asset {
        if session.state.hovered().is_some() {
            session.state.clear_hover();
        }
        return;
    }
    let Ok((camera, camera_transform)) = cameras.single() else { return };

    let hit_point = camera
        .viewport_to_world(camera_transform, pointer.screen)
        .ok()
        .and_then(|ray| {
            let filter = |entity: Entity| surfaces.contains(entity);
            let cast_settings = MeshRayCastSettings::default().with_filter(&filter);
            ray_cast.cast_ray(ray, &cast_settings).first().map(|(_, hit)| hit.point)
        });

    let rules = HoverRules::from(&settings.config.interaction);
    let outcome = rules.resolve(
        &catalog.0,
        hit_point,
        pointer.screen,
        &frame.spots,
        session.state.hovered(),
    );

    if outcome.hovered.as_deref() != session.state.hovered() || outcome.cursor != session.state.cursor() {
        session.state.apply_hover(outcome);
    }
}

/// Route a confirmed click: affordance, dismissal, focus, reset
fn dispatch_click(
    mut session: ResMut<ViewerSession>,
    mut control: ResMut<CameraControl>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    frame: Res<MarkerFrame>,
) {
    let Some(position) = session.pending_click.take() else { return };

    let radius = settings.config.interaction.affordance_radius_px;
    let affordance = affordance_under(position, &frame.spots, radius);
    let action = route_click(affordance, session.state.detail_open(), session.state.hovered());
    tracing::debug!(?action, "Click routed");

    let current = control.current_goal();
    if let Some(goal) = session
        .state
        .apply_click(&action, &catalog.0, &mut control.director, current)
    {
        tracing::debug!(target = ?goal.target, "Camera transition started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadview_core::{PartCatalog, ViewerConfig};

    fn click_app() -> App {
        let config = ViewerConfig::default();
        let mut app = App::new();
        app.insert_resource(ViewerSettings {
            config: config.clone(),
            asset_root: String::new(),
        })
        .insert_resource(Catalog(PartCatalog::builtin()))
        .insert_resource(CameraControl::new(&config.camera))
        .init_resource::<ViewerSession>()
        .init_resource::<MarkerFrame>()
        .add_systems(Update, dispatch_click);
        app
    }

    #[test]
    fn test_click_on_affordance_opens_details() {
        let mut app = click_app();
        app.world_mut().resource_mut::<MarkerFrame>().spots = vec![quadview_core::AffordanceSpot {
            part_id: "battery".to_string(),
            screen: Vec2::new(300.0, 300.0),
        }];
        app.world_mut().resource_mut::<ViewerSession>().pending_click = Some(Vec2::new(320.0, 310.0));
        app.update();

        let session = app.world().resource::<ViewerSession>();
        assert!(session.pending_click.is_none());
        assert!(session.state.detail_open());
        assert_eq!(session.state.selected(), Some("battery"));
        assert!(!app.world().resource::<CameraControl>().director.is_animating());
    }

    #[test]
    fn test_click_on_empty_space_in_overview_does_nothing() {
        let mut app = click_app();
        app.world_mut().resource_mut::<ViewerSession>().pending_click = Some(Vec2::new(5.0, 5.0));
        app.update();

        let control = app.world().resource::<CameraControl>();
        assert!(!control.director.is_animating());
        assert!(control.director.auto_rotate());
    }
}
