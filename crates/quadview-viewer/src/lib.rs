//! Quadview Viewer - interactive 3D drone model with part callouts
//!
//! Renders the team's quadcopter with Bevy, labels its parts and opens a
//! detail panel for the part the visitor picks. Runs in the browser through
//! [`mount_viewer`](web::mount_viewer) or natively through the `quadview`
//! binary.

mod app;
mod camera;
mod capability;
mod host;
mod interaction;
mod lifecycle;
mod loader;
mod markers;
mod scene;
mod session;
mod ui;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{build_app, run, ViewerLifecycle, ViewerOptions};
pub use capability::{check_graphics, FALLBACK_MESSAGE};
pub use host::{HostBridge, StatusListener};
