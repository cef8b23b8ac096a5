//! Quadview Core - viewer logic for the team's interactive drone model
//!
//! This crate holds everything about the viewer that does not need a
//! renderer:
//! - Part catalog (named sub-components with marker anchors and specs)
//! - Marker proximity/facing rules
//! - Camera director (Overview/Focused transitions) and orbit rig
//! - Pointer routing (hover, click priority, tap detection)
//! - Model load tracking with timeout and stale-callback guards
//! - Viewer state, status notifications and the teardown arena

pub mod arena;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod interaction;
pub mod loader;
pub mod markers;
pub mod state;
pub mod throttle;

pub use arena::ResourceArena;
pub use camera::{ease_out_cubic, CameraDirector, CameraGoal, CameraMode, OrbitRig, TransitionStep};
pub use catalog::{CatalogError, PartCatalog, PartDescriptor};
pub use config::{load_config, ConfigError, ViewerConfig};
pub use interaction::{
    affordance_under, route_click, AffordanceSpot, ClickAction, CursorHint, HoverOutcome, HoverRules,
    PointerSample, PressTracker,
};
pub use loader::{
    progress_fraction, AssetRequest, Bounds, InitError, LoadFailure, LoadStatus, LoadTicket, LoadTracker,
    Normalization, ProbeResponse, ProbeStep,
};
pub use markers::{CameraPose, MarkerRules, MarkerVisual, PartMarkerState};
pub use state::{DisplayedModel, IntentQueue, StatusReporter, ViewerIntent, ViewerState, ViewerStatus};
pub use throttle::RateLimiter;
