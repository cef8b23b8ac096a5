//! Viewer state, input intents and parent-facing status
//!
//! Input handlers only push [`ViewerIntent`]s; one per-frame consumer drains
//! the queue and mutates [`ViewerState`] and the camera director.

use glam::{Vec2, Vec3};
use serde::Serialize;
use std::collections::VecDeque;

use crate::camera::{CameraDirector, CameraGoal};
use crate::catalog::PartCatalog;
use crate::interaction::{ClickAction, CursorHint, HoverOutcome, PointerSample};
use crate::loader::LoadStatus;

/// What currently fills the model slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayedModel {
    #[default]
    Placeholder,
    Asset,
}

/// Mutable per-mount state
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    hovered: Option<String>,
    selected: Option<String>,
    detail_open: bool,
    cursor: CursorHint,
    show_all_labels: bool,
    displayed: DisplayedModel,
}

impl ViewerState {
    pub fn new(show_all_labels: bool) -> Self {
        Self {
            show_all_labels,
            ..Default::default()
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn detail_open(&self) -> bool {
        self.detail_open
    }

    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    pub fn show_all_labels(&self) -> bool {
        self.show_all_labels
    }

    pub fn set_show_all_labels(&mut self, show: bool) {
        self.show_all_labels = show;
    }

    pub fn displayed(&self) -> DisplayedModel {
        self.displayed
    }

    pub fn set_displayed(&mut self, displayed: DisplayedModel) {
        self.displayed = displayed;
    }

    pub fn apply_hover(&mut self, outcome: HoverOutcome) {
        self.hovered = outcome.hovered;
        self.cursor = outcome.cursor;
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
        self.cursor = CursorHint::Default;
    }

    /// Selection and panel flag are always set together
    pub fn open_details(&mut self, part_id: &str) {
        self.selected = Some(part_id.to_string());
        self.detail_open = true;
    }

    pub fn close_details(&mut self) {
        self.selected = None;
        self.detail_open = false;
    }

    /// Carry out a routed click. Returns the new camera goal when the click
    /// started a transition.
    pub fn apply_click(
        &mut self,
        action: &ClickAction,
        catalog: &PartCatalog,
        director: &mut CameraDirector,
        current: CameraGoal,
    ) -> Option<CameraGoal> {
        match action {
            ClickAction::OpenDetails(id) => {
                if catalog.get(id).is_some() {
                    self.open_details(id);
                }
                None
            }
            ClickAction::CloseDetails => {
                self.close_details();
                None
            }
            ClickAction::Focus(id) => {
                let anchor: Vec3 = catalog.get(id)?.anchor();
                Some(director.focus(id, anchor, current))
            }
            ClickAction::ResetCamera => director.reset(current).then(|| director.overview()),
        }
    }
}

/// Input recorded by event handlers for the per-frame consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerIntent {
    PointerMoved(PointerSample),
    PointerLeft,
    /// Confirmed click or tap at a screen position
    Click(Vec2),
    SetShowAllLabels(bool),
    CloseDetails,
    ResetView,
    Retry,
}

/// FIFO of pending intents
#[derive(Debug, Clone, Default)]
pub struct IntentQueue {
    pending: VecDeque<ViewerIntent>,
}

impl IntentQueue {
    pub fn push(&mut self, intent: ViewerIntent) {
        // Only the latest pointer position matters
        if let ViewerIntent::PointerMoved(_) = intent {
            if let Some(ViewerIntent::PointerMoved(_)) = self.pending.back() {
                self.pending.pop_back();
            }
        }
        self.pending.push_back(intent);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = ViewerIntent> + '_ {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Status the parent page observes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ViewerStatus {
    Loading,
    Loaded,
    Failed(String),
}

impl From<&LoadStatus> for ViewerStatus {
    fn from(status: &LoadStatus) -> Self {
        match status {
            LoadStatus::Loading => ViewerStatus::Loading,
            LoadStatus::Ready => ViewerStatus::Loaded,
            LoadStatus::Failed(f) => ViewerStatus::Failed(f.to_string()),
        }
    }
}

impl ViewerStatus {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Emits a status only when it differs from the last one sent
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    last: Option<ViewerStatus>,
}

impl StatusReporter {
    pub fn update(&mut self, status: &LoadStatus) -> Option<ViewerStatus> {
        let next = ViewerStatus::from(status);
        if self.last.as_ref() == Some(&next) {
            return None;
        }
        self.last = Some(next.clone());
        Some(next)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
