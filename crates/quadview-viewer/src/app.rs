//! Bevy application setup

use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use quadview_core::{CatalogError, PartCatalog, ViewerConfig};
use std::time::Duration;

use crate::camera::CameraPlugin;
use crate::host::{HostBridge, HostPlugin};
use crate::interaction::InteractionPlugin;
use crate::lifecycle::LifecyclePlugin;
use crate::loader::AssetLoaderPlugin;
use crate::markers::MarkerPlugin;
use crate::scene::ScenePlugin;
use crate::session::SessionPlugin;
use crate::ui::UiPlugin;

/// Whether the viewer currently owns a live scene
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewerLifecycle {
    #[default]
    Mounted,
    Unmounted,
}

/// Per-frame ordering of the viewer's Update systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Input handlers record intents
    Input,
    /// The single consumer applies intents to the session
    Intents,
    /// Throttled ray cast and click dispatch
    Hover,
    Camera,
    Markers,
}

/// Configuration the viewer was mounted with
#[derive(Debug, Clone, Resource)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
    /// Root that relative asset paths resolve against
    pub asset_root: String,
}

/// Part catalog shared by markers, hover and the detail panel
#[derive(Debug, Clone, Resource)]
pub struct Catalog(pub PartCatalog);

/// Catalog for a viewer that cannot read files: the inline TOML when given,
/// else the built-in parts. A `catalog` path in the config is reported and
/// skipped.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) fn embedded_catalog(config: &ViewerConfig, inline: Option<&str>) -> Result<PartCatalog, CatalogError> {
    if let Some(content) = inline {
        let catalog = PartCatalog::from_toml(content)?;
        tracing::info!(parts = catalog.len(), "Using inline part catalog");
        return Ok(catalog);
    }
    if let Some(path) = &config.catalog {
        tracing::warn!(path = %path, "Catalog files are not readable here; pass the catalog inline. Using built-in parts");
    }
    Ok(PartCatalog::builtin())
}

/// Responsive layout state
#[derive(Debug, Clone, Resource)]
pub struct UiLayout {
    pub screen_width: f32,
    pub screen_height: f32,
    pub is_mobile: bool,
}

impl Default for UiLayout {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            is_mobile: false,
        }
    }
}

impl UiLayout {
    /// Update layout based on screen dimensions
    pub fn update_for_screen(&mut self, width: f32, height: f32) {
        self.screen_width = width;
        self.screen_height = height;
        self.is_mobile = width < 800.0 || (width < height && width < 600.0);
    }

    /// Width of the part detail panel
    pub fn panel_width(&self) -> f32 {
        if self.is_mobile {
            (self.screen_width * 0.8).min(320.0)
        } else {
            340.0
        }
    }

    pub fn text_scale(&self) -> f32 {
        if self.is_mobile {
            0.85
        } else {
            1.0
        }
    }
}

/// Everything needed to mount one viewer
pub struct ViewerOptions {
    pub config: ViewerConfig,
    pub catalog: PartCatalog,
    /// CSS selector of the target canvas (web only)
    pub canvas: Option<String>,
    pub asset_root: String,
    pub host: HostBridge,
}

/// Build the Bevy application without running it
pub fn build_app(options: ViewerOptions) -> App {
    let mut app = App::new();

    app.insert_resource(ClearColor(Color::WHITE))
        // Start with continuous rendering - mobile switches to power saving
        .insert_resource(WinitSettings::default())
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Quadview".to_string(),
                        canvas: options.canvas.clone(),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    file_path: options.asset_root.clone(),
                    // Static hosting has no .meta files
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Picking must be added before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .init_state::<ViewerLifecycle>()
        .configure_sets(
            Update,
            (
                ViewerSet::Input,
                ViewerSet::Intents,
                ViewerSet::Hover,
                ViewerSet::Camera,
                ViewerSet::Markers,
            )
                .chain()
                .run_if(in_state(ViewerLifecycle::Mounted)),
        )
        .insert_resource(ViewerSettings {
            config: options.config,
            asset_root: options.asset_root,
        })
        .insert_resource(Catalog(options.catalog))
        .insert_resource(options.host)
        .init_resource::<UiLayout>()
        .add_plugins((
            LifecyclePlugin,
            HostPlugin,
            SessionPlugin,
            ScenePlugin,
            CameraPlugin,
            AssetLoaderPlugin,
            MarkerPlugin,
            InteractionPlugin,
            UiPlugin,
        ))
        .add_systems(Update, (update_ui_layout, adjust_power_settings_for_mobile).chain());

    app
}

/// Build and run the viewer
pub fn run(options: ViewerOptions) -> AppExit {
    build_app(options).run()
}

/// Track window size so panels adapt; the camera aspect follows the surface
fn update_ui_layout(windows: Query<&Window>, mut ui_layout: ResMut<UiLayout>) {
    if let Ok(window) = windows.single() {
        let width = window.width();
        let height = window.height();

        if (ui_layout.screen_width - width).abs() > 1.0 || (ui_layout.screen_height - height).abs() > 1.0 {
            ui_layout.update_for_screen(width, height);
            tracing::debug!(width, height, mobile = ui_layout.is_mobile, "Viewport resized");
        }
    }
}

/// On mobile, use power saving mode. On desktop, use continuous rendering.
fn adjust_power_settings_for_mobile(layout: Res<UiLayout>, mut winit_settings: ResMut<WinitSettings>) {
    if !layout.is_changed() {
        return;
    }

    if layout.is_mobile {
        use bevy::winit::UpdateMode;
        // Fast enough for the auto-rotate and camera transitions
        winit_settings.focused_mode = UpdateMode::reactive_low_power(Duration::from_millis(33));
        winit_settings.unfocused_mode = UpdateMode::reactive_low_power(Duration::from_millis(500));
    } else {
        *winit_settings = WinitSettings::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_layout_mobile_breakpoints() {
        let mut layout = UiLayout::default();
        layout.update_for_screen(1440.0, 900.0);
        assert!(!layout.is_mobile);
        assert_eq!(layout.panel_width(), 340.0);

        layout.update_for_screen(390.0, 844.0);
        assert!(layout.is_mobile);
        assert_eq!(layout.panel_width(), 312.0);
    }

    #[test]
    fn test_embedded_catalog_prefers_inline() {
        let mut config = ViewerConfig::default();
        config.catalog = Some("parts.toml".to_string());

        let fallback = embedded_catalog(&config, None).unwrap();
        assert_eq!(fallback, PartCatalog::builtin());

        let inline = r#"
            [[part]]
            id = "arm"
            name = "Arm"
            description = "Carbon arm"
            specs = ["220 mm"]
            anchor = [0.5, 0.0, 0.5]
        "#;
        let catalog = embedded_catalog(&config, Some(inline)).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("arm").is_some());
    }

    #[test]
    fn test_embedded_catalog_rejects_bad_inline() {
        let config = ViewerConfig::default();
        assert!(embedded_catalog(&config, Some("[[part]]\nid = \"\"")).is_err());
    }
}
