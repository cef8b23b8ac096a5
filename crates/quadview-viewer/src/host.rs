//! Bridge between the embedding page and a running viewer
//!
//! The page owns the "show all labels" preference and pushes changes in
//! through a [`HostBridge`]; the viewer reports load status back through a
//! [`StatusListener`].

use bevy::prelude::*;
use quadview_core::{ViewerIntent, ViewerStatus};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::app::ViewerLifecycle;
use crate::session::{LabelPreference, PendingIntents};

/// Commands queued by the host since the last frame
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HostCommands {
    pub show_all_labels: Option<bool>,
    pub retry: bool,
    /// Some(true) = mount, Some(false) = unmount
    pub mounted: Option<bool>,
}

/// Shared command cell written by the host, drained once per frame
#[derive(Resource, Clone, Default)]
pub struct HostBridge {
    commands: Arc<Mutex<HostCommands>>,
}

impl HostBridge {
    pub fn set_show_all_labels(&self, show: bool) {
        self.update(|c| c.show_all_labels = Some(show));
    }

    pub fn request_retry(&self) {
        self.update(|c| c.retry = true);
    }

    pub fn request_unmount(&self) {
        self.update(|c| c.mounted = Some(false));
    }

    pub fn request_mount(&self) {
        self.update(|c| c.mounted = Some(true));
    }

    /// Take everything queued so far
    pub fn take(&self) -> HostCommands {
        match self.commands.try_lock() {
            Ok(mut commands) => std::mem::take(&mut *commands),
            Err(_) => HostCommands::default(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut HostCommands)) {
        if let Ok(mut commands) = self.commands.lock() {
            f(&mut commands);
        }
    }
}

/// Receives {loading, loaded, failed} transitions.
///
/// Lives on the main thread as a non-send resource; clones share the same
/// subscriber list so the host can subscribe after the app is running.
#[derive(Clone, Default)]
pub struct StatusListener {
    subscribers: Rc<RefCell<Vec<Box<dyn Fn(&ViewerStatus)>>>>,
}

impl StatusListener {
    pub fn new(callback: impl Fn(&ViewerStatus) + 'static) -> Self {
        let listener = Self::default();
        listener.subscribe(callback);
        listener
    }

    pub fn subscribe(&self, callback: impl Fn(&ViewerStatus) + 'static) {
        self.subscribers.borrow_mut().push(Box::new(callback));
    }

    pub fn notify(&self, status: &ViewerStatus) {
        for callback in self.subscribers.borrow().iter() {
            callback(status);
        }
    }
}

pub struct HostPlugin;

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, apply_host_commands);
    }
}

/// Runs in every lifecycle state so the label preference can change while
/// loading or unmounted
fn apply_host_commands(
    host: Res<HostBridge>,
    lifecycle: Res<State<ViewerLifecycle>>,
    mut next_lifecycle: ResMut<NextState<ViewerLifecycle>>,
    mut preference: ResMut<LabelPreference>,
    mut intents: ResMut<PendingIntents>,
) {
    let commands = host.take();
    let mounted = *lifecycle.get() == ViewerLifecycle::Mounted;

    if let Some(show) = commands.show_all_labels {
        if preference.0 != show {
            preference.0 = show;
            tracing::debug!(show, "Label preference changed by host");
        }
    }

    if commands.retry {
        if mounted {
            intents.0.push(ViewerIntent::Retry);
        } else {
            tracing::debug!("Ignoring retry while unmounted");
        }
    }

    match commands.mounted {
        Some(false) if mounted => next_lifecycle.set(ViewerLifecycle::Unmounted),
        Some(true) if !mounted => next_lifecycle.set(ViewerLifecycle::Mounted),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_take_drains() {
        let bridge = HostBridge::default();
        let page_side = bridge.clone();
        page_side.set_show_all_labels(true);
        page_side.request_retry();

        let commands = bridge.take();
        assert_eq!(commands.show_all_labels, Some(true));
        assert!(commands.retry);
        assert_eq!(commands.mounted, None);

        assert_eq!(bridge.take(), HostCommands::default());
    }

    #[test]
    fn test_latest_mount_request_wins() {
        let bridge = HostBridge::default();
        bridge.request_unmount();
        bridge.request_mount();
        assert_eq!(bridge.take().mounted, Some(true));
    }

    #[test]
    fn test_status_listener() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let listener = StatusListener::new(move |status| sink.borrow_mut().push(status.to_json()));

        listener.notify(&ViewerStatus::Loading);

        let late = seen.clone();
        listener.clone().subscribe(move |_| late.borrow_mut().push("late".to_string()));
        listener.notify(&ViewerStatus::Loaded);
        assert_eq!(
            *seen.borrow(),
            vec![
                r#"{"status":"loading"}"#.to_string(),
                r#"{"status":"loaded"}"#.to_string(),
                "late".to_string(),
            ]
        );
    }
}
