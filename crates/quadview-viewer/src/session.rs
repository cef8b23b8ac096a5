//! Per-mount viewer session and the intent consumer

use bevy::prelude::*;
use quadview_core::{IntentQueue, PointerSample, ViewerIntent, ViewerState};

use crate::app::{ViewerLifecycle, ViewerSet, ViewerSettings};
use crate::camera::CameraControl;
use crate::loader::RetryModelLoad;

/// State owned by one mount
#[derive(Resource, Debug, Default)]
pub struct ViewerSession {
    pub state: ViewerState,
    /// Last pointer position over the canvas
    pub pointer: Option<PointerSample>,
    /// Confirmed click waiting for the hover pass
    pub pending_click: Option<Vec2>,
}

/// Intents recorded by input handlers and the UI
#[derive(Resource, Debug, Default)]
pub struct PendingIntents(pub IntentQueue);

/// Host-owned "show all labels" value. Survives remounts.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelPreference(pub bool);

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        let show_all = app
            .world()
            .get_resource::<ViewerSettings>()
            .map(|s| s.config.markers.show_all)
            .unwrap_or(false);

        app.insert_resource(LabelPreference(show_all))
            .init_resource::<ViewerSession>()
            .init_resource::<PendingIntents>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), start_session)
            .add_systems(Update, apply_viewer_intents.in_set(ViewerSet::Intents));
    }
}

fn start_session(
    mut session: ResMut<ViewerSession>,
    mut intents: ResMut<PendingIntents>,
    preference: Res<LabelPreference>,
) {
    *session = ViewerSession {
        state: ViewerState::new(preference.0),
        ..default()
    };
    let dropped = intents.0.drain().count();
    if dropped > 0 {
        tracing::debug!(dropped, "Discarded intents from previous mount");
    }
}

/// Single consumer of recorded intents
fn apply_viewer_intents(
    mut intents: ResMut<PendingIntents>,
    mut session: ResMut<ViewerSession>,
    mut preference: ResMut<LabelPreference>,
    mut control: ResMut<CameraControl>,
    mut retry: MessageWriter<RetryModelLoad>,
) {
    if session.state.show_all_labels() != preference.0 {
        session.state.set_show_all_labels(preference.0);
    }

    for intent in intents.0.drain() {
        match intent {
            ViewerIntent::PointerMoved(sample) => {
                session.pointer = Some(sample);
            }
            ViewerIntent::PointerLeft => {
                session.pointer = None;
                session.state.clear_hover();
            }
            ViewerIntent::Click(position) => {
                session.pending_click = Some(position);
            }
            ViewerIntent::SetShowAllLabels(show) => {
                session.state.set_show_all_labels(show);
                preference.0 = show;
            }
            ViewerIntent::CloseDetails => {
                session.state.close_details();
            }
            ViewerIntent::ResetView => {
                let current = control.current_goal();
                control.director.reset(current);
            }
            ViewerIntent::Retry => {
                retry.write(RetryModelLoad);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadview_core::{CameraMode, ViewerConfig};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_message::<RetryModelLoad>()
            .insert_resource(CameraControl::new(&ViewerConfig::default().camera))
            .insert_resource(LabelPreference(false))
            .init_resource::<ViewerSession>()
            .init_resource::<PendingIntents>()
            .add_systems(Update, apply_viewer_intents);
        app
    }

    #[test]
    fn test_label_toggle_updates_preference() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<PendingIntents>()
            .0
            .push(ViewerIntent::SetShowAllLabels(true));
        app.update();

        assert!(app.world().resource::<LabelPreference>().0);
        assert!(app.world().resource::<ViewerSession>().state.show_all_labels());
    }

    #[test]
    fn test_host_preference_reaches_state() {
        let mut app = test_app();
        app.world_mut().resource_mut::<LabelPreference>().0 = true;
        app.update();
        assert!(app.world().resource::<ViewerSession>().state.show_all_labels());
    }

    #[test]
    fn test_click_waits_for_hover_pass() {
        let mut app = test_app();
        {
            let mut intents = app.world_mut().resource_mut::<PendingIntents>();
            intents.0.push(ViewerIntent::PointerMoved(PointerSample::new(
                Vec2::new(10.0, 20.0),
                Vec2::new(100.0, 100.0),
            )));
            intents.0.push(ViewerIntent::Click(Vec2::new(10.0, 20.0)));
        }
        app.update();

        let session = app.world().resource::<ViewerSession>();
        assert_eq!(session.pending_click, Some(Vec2::new(10.0, 20.0)));
        assert_eq!(session.pointer.map(|p| p.screen), Some(Vec2::new(10.0, 20.0)));
        assert!(app.world().resource::<PendingIntents>().0.is_empty());
    }

    #[test]
    fn test_reset_view_from_focus() {
        let mut app = test_app();
        {
            let mut control = app.world_mut().resource_mut::<CameraControl>();
            let current = control.current_goal();
            control.director.focus("battery", Vec3::new(0.0, -0.1, 0.0), current);
        }
        app.world_mut()
            .resource_mut::<PendingIntents>()
            .0
            .push(ViewerIntent::ResetView);
        app.update();

        let control = app.world().resource::<CameraControl>();
        assert_eq!(control.director.mode(), &CameraMode::Overview);
        assert!(control.director.auto_rotate());
    }
}
