//! UI overlays using bevy_egui

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use quadview_core::{CursorHint, DisplayedModel, PartDescriptor, ViewerIntent};

use crate::app::{Catalog, UiLayout, ViewerLifecycle};
use crate::loader::ModelLoad;
use crate::markers::{MarkerCaption, MarkerFrame, MarkerKind};
use crate::session::{LabelPreference, PendingIntents, ViewerSession};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0x3b, 0x82, 0xf6);
const INK: egui::Color32 = egui::Color32::from_rgb(0x1f, 0x29, 0x37);
const MUTED: egui::Color32 = egui::Color32::from_rgb(0x6b, 0x72, 0x80);

/// Grouped system parameters for the overlay system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: Res<'w, ViewerSession>,
    pub intents: ResMut<'w, PendingIntents>,
    pub catalog: Res<'w, Catalog>,
    pub frame: Res<'w, MarkerFrame>,
    pub load: Res<'w, ModelLoad>,
    pub preference: Res<'w, LabelPreference>,
    pub ui_layout: Res<'w, UiLayout>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(
            EguiPrimaryContextPass,
            ui_system.run_if(in_state(ViewerLifecycle::Mounted)),
        );
    }
}

fn ui_system(mut params: UiParams) {
    let text_scale = params.ui_layout.text_scale();
    let panel_width = params.ui_layout.panel_width();

    // Get the egui context - early return if not available
    let Ok(ctx) = params.contexts.ctx_mut() else { return };

    if params.frame.is_built() {
        draw_captions(ctx, &params.frame.captions, text_scale);
    }

    let state = &params.session.state;
    let intents = &mut params.intents.0;

    egui::Area::new(egui::Id::new("label_toggle"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
        .show(ctx, |ui| {
            let mut show_all = params.preference.0;
            if ui
                .checkbox(&mut show_all, egui::RichText::new("Show all labels").size(14.0 * text_scale))
                .changed()
            {
                intents.push(ViewerIntent::SetShowAllLabels(show_all));
            }
        });

    let status = params.load.tracker.status();
    if status.is_loading() {
        egui::Area::new(egui::Id::new("loading_overlay"))
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(220.0);
                    ui.vertical_centered(|ui| {
                        ui.label(egui::RichText::new("Loading 3D model...").size(15.0 * text_scale).color(INK));
                        match params.load.progress {
                            Some(fraction) => {
                                ui.add(egui::ProgressBar::new(fraction).show_percentage());
                            }
                            None => {
                                ui.spinner();
                            }
                        }
                    });
                });
            });
    } else if params.load.tracker.timed_out() && state.displayed() == DisplayedModel::Placeholder {
        egui::Area::new(egui::Id::new("preview_note"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Showing preview model").size(13.0 * text_scale).color(MUTED));
            });
    }

    if let Some(failure) = status.failure() {
        egui::Window::new("Model unavailable")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.set_max_width(320.0);
                ui.label(egui::RichText::new(failure.to_string()).color(egui::Color32::from_rgb(0xb9, 0x1c, 0x1c)));
                ui.add_space(8.0);
                if ui.button(egui::RichText::new("Retry").size(14.0 * text_scale)).clicked() {
                    intents.push(ViewerIntent::Retry);
                }
            });
    }

    // Tooltip follows the pointer while nothing is open
    if !state.detail_open() {
        let hovered = state.hovered().and_then(|id| params.catalog.0.get(id));
        if let (Some(part), Some(pointer)) = (hovered, params.session.pointer) {
            egui::Area::new(egui::Id::new("part_tooltip"))
                .fixed_pos(egui::pos2(pointer.screen.x + 16.0, pointer.screen.y + 16.0))
                .interactable(false)
                .order(egui::Order::Tooltip)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(egui::RichText::new(&part.name).strong().size(14.0 * text_scale).color(INK));
                        ui.label(egui::RichText::new("Click for details").size(12.0 * text_scale).color(MUTED));
                    });
                });
        }
    }

    if state.detail_open() {
        if let Some(part) = state.selected().and_then(|id| params.catalog.0.get(id)) {
            detail_panel(ctx, part, panel_width, text_scale, intents);
        }
    }

    if state.cursor() == CursorHint::Actionable {
        ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
    }
}

/// Paint marker text behind every window
fn draw_captions(ctx: &egui::Context, captions: &[MarkerCaption], text_scale: f32) {
    let painter = ctx.layer_painter(egui::LayerId::background());
    for caption in captions {
        let alpha = (caption.opacity.clamp(0.0, 1.0) * 255.0) as u8;
        let (size, color) = match caption.kind {
            MarkerKind::Name => (
                14.0 * caption.scale,
                egui::Color32::from_rgba_unmultiplied(INK.r(), INK.g(), INK.b(), alpha),
            ),
            MarkerKind::Affordance => (12.0, egui::Color32::WHITE),
        };
        painter.text(
            egui::pos2(caption.screen.x, caption.screen.y),
            egui::Align2::CENTER_CENTER,
            &caption.text,
            egui::FontId::proportional(size * text_scale),
            color,
        );
    }
}

fn detail_panel(
    ctx: &egui::Context,
    part: &PartDescriptor,
    width: f32,
    text_scale: f32,
    intents: &mut quadview_core::IntentQueue,
) {
    egui::SidePanel::right("part_details")
        .exact_width(width)
        .resizable(false)
        .show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading(egui::RichText::new(&part.name).size(20.0 * text_scale).color(INK));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(egui::RichText::new("✕").size(16.0 * text_scale)).clicked() {
                        intents.push(ViewerIntent::CloseDetails);
                    }
                });
            });
            ui.separator();

            ui.label(egui::RichText::new(&part.description).size(14.0 * text_scale));
            ui.add_space(8.0);

            if !part.specs.is_empty() {
                ui.label(egui::RichText::new("Specifications").strong().size(14.0 * text_scale).color(ACCENT));
                for spec in &part.specs {
                    ui.label(egui::RichText::new(format!("• {}", spec)).size(13.0 * text_scale));
                }
                ui.add_space(12.0);
            }

            ui.horizontal(|ui| {
                let back = egui::Button::new(
                    egui::RichText::new("Back to Full View").size(14.0 * text_scale).color(egui::Color32::WHITE),
                )
                .fill(ACCENT);
                if ui.add(back).clicked() {
                    intents.push(ViewerIntent::ResetView);
                }
                if ui.button(egui::RichText::new("Close Details").size(14.0 * text_scale)).clicked() {
                    intents.push(ViewerIntent::CloseDetails);
                }
            });
        });
}
