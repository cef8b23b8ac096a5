//! Browser entry points

use quadview_core::{ViewerConfig, ViewerStatus};
use wasm_bindgen::prelude::*;

use crate::app::{build_app, embedded_catalog, ViewerOptions};
use crate::capability::{check_graphics, FALLBACK_MESSAGE};
use crate::host::{HostBridge, StatusListener};

/// WASM start hook: logging and panic reporting only. The page mounts the
/// viewer explicitly with [`mount_viewer`].
#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build(),
    );
}

/// Handle the page keeps to drive a mounted viewer
#[wasm_bindgen]
pub struct ViewerHandle {
    host: HostBridge,
    status: StatusListener,
}

#[wasm_bindgen]
impl ViewerHandle {
    /// Push the page-owned label preference
    pub fn set_show_all_labels(&self, show: bool) {
        self.host.set_show_all_labels(show);
    }

    pub fn retry(&self) {
        self.host.request_retry();
    }

    /// Tear down the scene; the canvas stays in place
    pub fn unmount(&self) {
        self.host.request_unmount();
    }

    pub fn remount(&self) {
        self.host.request_mount();
    }

    /// `callback(status, message)` with status "loading", "loaded" or "failed"
    pub fn on_status(&self, callback: js_sys::Function) {
        self.status.subscribe(move |status| {
            let (state, message) = match status {
                ViewerStatus::Loading => ("loading", JsValue::UNDEFINED),
                ViewerStatus::Loaded => ("loaded", JsValue::UNDEFINED),
                ViewerStatus::Failed(message) => ("failed", JsValue::from_str(message)),
            };
            if let Err(e) = callback.call2(&JsValue::NULL, &JsValue::from_str(state), &message) {
                tracing::warn!("Status callback threw: {:?}", e);
            }
        });
    }
}

/// Mount the viewer on the canvas matching `canvas_selector`.
///
/// `config_toml` overrides the defaults; `?model=` and `?labels=` on the
/// page URL override the config. `catalog_toml` (`[[part]]` tables)
/// replaces the built-in parts. Without graphics support the canvas'
/// parent gets a static fallback message and an error is returned.
#[wasm_bindgen]
pub fn mount_viewer(
    canvas_selector: &str,
    config_toml: Option<String>,
    catalog_toml: Option<String>,
) -> Result<ViewerHandle, JsValue> {
    if let Err(err) = check_graphics() {
        tracing::error!(error = %err, "Graphics capability check failed");
        show_fallback(canvas_selector);
        return Err(JsValue::from_str(&err.to_string()));
    }

    let mut config = match config_toml {
        Some(content) => ViewerConfig::from_toml(&content).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => ViewerConfig::default(),
    };
    apply_url_parameters(&mut config);
    let catalog =
        embedded_catalog(&config, catalog_toml.as_deref()).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let host = HostBridge::default();
    let status = StatusListener::default();

    let mut app = build_app(ViewerOptions {
        config,
        catalog,
        canvas: Some(canvas_selector.to_string()),
        asset_root: String::new(),
        host: host.clone(),
    });
    app.insert_non_send_resource(status.clone());

    // Returns immediately on the web; the event loop keeps running
    app.run();

    Ok(ViewerHandle { host, status })
}

fn apply_url_parameters(config: &mut ViewerConfig) {
    let Some(window) = web_sys::window() else { return };
    let Ok(location) = window.location().href() else { return };
    let Ok(url) = web_sys::Url::new(&location) else { return };
    let params = url.search_params();

    if let Some(model) = params.get("model").filter(|m| !m.trim().is_empty()) {
        tracing::info!(model = %model, "Model overridden by URL parameter");
        config.asset.url = model;
    }
    if let Some(labels) = params.get("labels") {
        config.markers.show_all = matches!(labels.as_str(), "1" | "true" | "on");
    }
}

fn show_fallback(canvas_selector: &str) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else { return };
    let parent = document
        .query_selector(canvas_selector)
        .ok()
        .flatten()
        .and_then(|canvas| canvas.parent_element());

    if let Some(parent) = parent {
        parent.set_inner_html(&format!(
            "<div class=\"viewer-fallback\" style=\"display:flex;align-items:center;justify-content:center;\
             height:100%;padding:1.5rem;text-align:center;color:#374151;\">{}</div>",
            FALLBACK_MESSAGE
        ));
    }
}
