//! Model loading: existence probe, glTF fetch, normalization and status
//!
//! Async results (the probe) land in a shared cell that a per-frame system
//! drains; every result carries the ticket of the attempt that produced it so
//! anything from an older attempt or a previous mount is dropped.

use bevy::asset::RecursiveDependencyLoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use quadview_core::{
    progress_fraction, AssetRequest, Bounds, DisplayedModel, LoadTicket, LoadTracker, ProbeResponse, ProbeStep,
    StatusReporter, ViewerStatus,
};
use quadview_core::loader::LoadPhase;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app::{ViewerLifecycle, ViewerSet, ViewerSettings};
use crate::host::StatusListener;
use crate::lifecycle::SceneArena;
use crate::scene::{ModelRoot, ModelSurface, Placeholder};
use crate::session::ViewerSession;

/// Ask for another probe + fetch after a failure
#[derive(Message, Debug, Clone, Copy)]
pub struct RetryModelLoad;

/// The loaded model replaced the placeholder
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelReady;

type ProbeCell = Arc<Mutex<Option<(LoadTicket, Result<ProbeResponse, String>)>>>;

/// Load state for the current mount
#[derive(Resource)]
pub struct ModelLoad {
    pub tracker: LoadTracker,
    pub request: AssetRequest,
    /// Advisory fraction of sub-resources resolved
    pub progress: Option<f32>,
    ticket: Option<LoadTicket>,
    probe_result: ProbeCell,
    gltf: Option<Handle<Gltf>>,
    scene_root: Option<Entity>,
    finalized: bool,
    attempts: u32,
}

impl ModelLoad {
    fn new(settings: &ViewerSettings) -> Self {
        let asset = &settings.config.asset;
        Self {
            tracker: LoadTracker::new(Duration::from_secs_f32(asset.timeout_secs)),
            request: AssetRequest::new(asset.url.clone(), asset.cache_bust),
            progress: None,
            ticket: None,
            probe_result: Arc::new(Mutex::new(None)),
            gltf: None,
            scene_root: None,
            finalized: false,
            attempts: 0,
        }
    }
}

impl FromWorld for ModelLoad {
    fn from_world(world: &mut World) -> Self {
        match world.get_resource::<ViewerSettings>() {
            Some(settings) => Self::new(settings),
            None => Self::new(&ViewerSettings {
                config: Default::default(),
                asset_root: String::new(),
            }),
        }
    }
}

/// Last status sent to the host
#[derive(Resource, Default)]
struct LoadReport(StatusReporter);

pub struct AssetLoaderPlugin;

impl Plugin for AssetLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<RetryModelLoad>()
            .add_message::<ModelReady>()
            .init_resource::<ModelLoad>()
            .init_resource::<LoadReport>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), start_model_load)
            .add_systems(OnExit(ViewerLifecycle::Mounted), cancel_model_load)
            .add_systems(
                Update,
                (
                    handle_retry,
                    poll_probe,
                    poll_model_load,
                    finalize_model,
                    poll_load_timeout,
                    report_status,
                )
                    .chain()
                    .after(ViewerSet::Intents)
                    .before(ViewerSet::Hover)
                    .run_if(in_state(ViewerLifecycle::Mounted)),
            );
    }
}

fn start_model_load(
    mut load: ResMut<ModelLoad>,
    mut report: ResMut<LoadReport>,
    mut arena: ResMut<SceneArena>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    time: Res<Time<Real>>,
) {
    *load = ModelLoad::new(&settings);
    report.0.reset();
    begin_attempt(&mut load, &settings, &asset_server, &mut arena, time.elapsed());
}

fn cancel_model_load(mut load: ResMut<ModelLoad>) {
    // Late callbacks from this mount become no-ops
    load.tracker.cancel();
    load.ticket = None;
    load.gltf = None;
    load.scene_root = None;
    load.finalized = false;
    load.progress = None;
    if let Ok(mut pending) = load.probe_result.lock() {
        *pending = None;
    }
}

fn begin_attempt(
    load: &mut ModelLoad,
    settings: &ViewerSettings,
    asset_server: &AssetServer,
    arena: &mut SceneArena,
    now: Duration,
) {
    let ticket = load.tracker.begin(now);
    load.ticket = Some(ticket);
    load.attempts += 1;
    load.progress = None;
    load.finalized = false;

    if settings.config.asset.probe
        && probe_model(&load.request, &settings.asset_root, ticket, load.probe_result.clone())
    {
        return;
    }

    if load.tracker.skip_probe(ticket) {
        start_fetch(load, asset_server, arena);
    }
}

fn start_fetch(load: &mut ModelLoad, asset_server: &AssetServer, arena: &mut SceneArena) {
    let url = load.request.url.clone();
    tracing::info!(url = %url, attempt = load.attempts, "Fetching model");

    let handle: Handle<Gltf> = asset_server.load(url.clone());
    if load.attempts > 1 {
        // A failed load stays cached until reloaded
        asset_server.reload(url);
    }
    arena.assets.track(handle.clone().untyped());
    load.gltf = Some(handle);
}

/// Resolve `url` against the asset root the way the asset server does
pub(crate) fn resolve_url(root: &str, url: &str) -> String {
    let absolute = url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/');
    if root.is_empty() || absolute {
        url.to_string()
    } else {
        format!("{}/{}", root.trim_end_matches('/'), url)
    }
}

/// HEAD the model URL. Returns false when no probe was started.
#[cfg(target_arch = "wasm32")]
fn probe_model(request: &AssetRequest, asset_root: &str, ticket: LoadTicket, cell: ProbeCell) -> bool {
    use wasm_bindgen::JsCast;

    let url = resolve_url(asset_root, &request.probe_url(js_sys::Date::now() as u64));
    tracing::debug!(url = %url, "Probing model");

    wasm_bindgen_futures::spawn_local(async move {
        let result = async {
            let window = web_sys::window().ok_or("No window")?;

            let init = web_sys::RequestInit::new();
            init.set_method("HEAD");
            let request = web_sys::Request::new_with_str_and_init(&url, &init)
                .map_err(|e| format!("{:?}", e))?;

            let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_request(&request))
                .await
                .map_err(|e| format!("{:?}", e))?;
            let resp: web_sys::Response = resp.dyn_into().map_err(|_| "Response cast failed")?;

            Ok::<_, String>(ProbeResponse::from_status(resp.status()))
        }
        .await;

        if let Ok(mut pending) = cell.lock() {
            *pending = Some((ticket, result));
        }
    });
    true
}

/// Check the file under the asset root. Remote URLs are not probed natively.
#[cfg(not(target_arch = "wasm32"))]
fn probe_model(request: &AssetRequest, asset_root: &str, ticket: LoadTicket, cell: ProbeCell) -> bool {
    if request.is_remote() {
        tracing::debug!(url = %request.url, "Skipping probe for remote model");
        return false;
    }

    let path = std::path::PathBuf::from(resolve_url(asset_root, &request.url));
    let probe = if path.is_file() {
        ProbeResponse::from_status(200)
    } else {
        ProbeResponse::from_status(404)
    };
    tracing::debug!(path = %path.display(), exists = probe.exists, "Probed model file");

    if let Ok(mut pending) = cell.lock() {
        *pending = Some((ticket, Ok(probe)));
    }
    true
}

fn poll_probe(mut load: ResMut<ModelLoad>, asset_server: Res<AssetServer>, mut arena: ResMut<SceneArena>) {
    // Take the result from the mutex (if any) - this drops the lock immediately
    let result = {
        if let Ok(mut pending) = load.probe_result.try_lock() {
            pending.take()
        } else {
            None
        }
    };
    let Some((ticket, result)) = result else { return };

    match load.tracker.on_probe(ticket, result) {
        ProbeStep::StartFetch => start_fetch(&mut load, &asset_server, &mut arena),
        ProbeStep::Failed(failure) => {
            tracing::error!(url = %load.request.url, error = %failure, "Model probe failed");
        }
        ProbeStep::Ignored | ProbeStep::Stale => {}
    }
}

/// Spawn the model scene (hidden) once the glTF and its dependencies load
fn poll_model_load(
    mut commands: Commands,
    mut load: ResMut<ModelLoad>,
    mut arena: ResMut<SceneArena>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
) {
    let (Some(ticket), Some(handle)) = (load.ticket, load.gltf.clone()) else { return };
    if load.scene_root.is_some() || !load.tracker.is_current(ticket) || load.tracker.phase() != LoadPhase::Fetching {
        return;
    }

    match asset_server.get_recursive_dependency_load_state(&handle) {
        Some(RecursiveDependencyLoadState::Failed(err)) => {
            if let Some(failure) = load.tracker.on_failed(ticket, err.to_string()) {
                tracing::error!(url = %load.request.url, error = %failure, "Model load failed");
            }
        }
        Some(RecursiveDependencyLoadState::Loaded) => {
            let Some(gltf) = gltfs.get(&handle) else { return };
            let Some(scene) = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) else {
                if let Some(failure) = load.tracker.on_failed(ticket, "file contains no scenes") {
                    tracing::error!(error = %failure, "Model load failed");
                }
                return;
            };

            let root = arena.spawn(
                &mut commands,
                (
                    Name::new("drone-model"),
                    SceneRoot(scene),
                    Transform::default(),
                    // Shown after normalization
                    Visibility::Hidden,
                    ModelRoot,
                ),
            );
            load.scene_root = Some(root);
            load.progress = Some(1.0);
        }
        _ => {
            load.progress = gltfs.get(&handle).and_then(|gltf| {
                let total = gltf.meshes.len() + gltf.materials.len();
                let loaded = gltf
                    .meshes
                    .iter()
                    .map(|h| h.id().untyped())
                    .chain(gltf.materials.iter().map(|h| h.id().untyped()))
                    .filter(|id| asset_server.is_loaded_with_dependencies(*id))
                    .count();
                progress_fraction(loaded as u64, Some(total as u64))
            });
        }
    }
}

/// Normalize the spawned scene, then swap it in for the placeholder
#[allow(clippy::too_many_arguments)]
fn finalize_model(
    mut commands: Commands,
    mut load: ResMut<ModelLoad>,
    mut session: ResMut<ViewerSession>,
    mut arena: ResMut<SceneArena>,
    mut ready: MessageWriter<ModelReady>,
    settings: Res<ViewerSettings>,
    mesh_assets: Res<Assets<Mesh>>,
    children: Query<&Children>,
    surfaces: Query<(&Mesh3d, &GlobalTransform)>,
    placeholders: Query<Entity, With<Placeholder>>,
    mut roots: Query<(&mut Transform, &mut Visibility), With<ModelRoot>>,
) {
    if load.finalized {
        return;
    }
    let (Some(root), Some(ticket)) = (load.scene_root, load.ticket) else { return };

    let mut meshes = Vec::new();
    let mut points = Vec::new();
    for entity in children.iter_descendants(root) {
        let Ok((mesh, global)) = surfaces.get(entity) else { continue };
        meshes.push(entity);
        if let Some(positions) = mesh_assets
            .get(&mesh.0)
            .and_then(|m| m.attribute(Mesh::ATTRIBUTE_POSITION))
            .and_then(|a| a.as_float3())
        {
            points.extend(positions.iter().map(|p| global.transform_point(Vec3::from_array(*p))));
        }
    }
    // Scene instance not spawned yet
    if meshes.is_empty() {
        return;
    }
    let Some(bounds) = Bounds::from_points(points) else { return };

    if !load.tracker.on_loaded(ticket) {
        return;
    }
    load.finalized = true;

    let normalization = bounds.normalization(settings.config.asset.target_size);
    if let Ok((mut transform, mut visibility)) = roots.get_mut(root) {
        transform.scale = Vec3::splat(normalization.scale);
        transform.translation = normalization.translation;
        *visibility = Visibility::Inherited;
    }
    for entity in &meshes {
        commands.entity(*entity).insert(ModelSurface);
    }
    for placeholder in &placeholders {
        arena.despawn(&mut commands, placeholder);
    }

    session.state.set_displayed(DisplayedModel::Asset);
    ready.write(ModelReady);

    tracing::info!(
        url = %load.request.url,
        meshes = meshes.len(),
        scale = normalization.scale,
        late = load.tracker.timed_out(),
        "Model ready"
    );
}

fn poll_load_timeout(mut load: ResMut<ModelLoad>, time: Res<Time<Real>>) {
    // Logged inside; the placeholder simply stays
    load.tracker.poll_timeout(time.elapsed());
}

fn handle_retry(
    mut commands: Commands,
    mut retries: MessageReader<RetryModelLoad>,
    mut load: ResMut<ModelLoad>,
    mut arena: ResMut<SceneArena>,
    settings: Res<ViewerSettings>,
    asset_server: Res<AssetServer>,
    time: Res<Time<Real>>,
) {
    if retries.read().count() == 0 {
        return;
    }
    if load.tracker.status().failure().is_none() {
        tracing::debug!("Retry ignored; no failed load");
        return;
    }

    if let Some(root) = load.scene_root.take() {
        arena.despawn(&mut commands, root);
    }
    load.gltf = None;
    tracing::info!(attempt = load.attempts + 1, "Retrying model load");
    begin_attempt(&mut load, &settings, &asset_server, &mut arena, time.elapsed());
}

/// Forward status transitions to the log and the host
fn report_status(load: Res<ModelLoad>, mut report: ResMut<LoadReport>, listener: Option<NonSend<StatusListener>>) {
    let Some(status) = report.0.update(load.tracker.status()) else { return };

    match &status {
        ViewerStatus::Loading => tracing::debug!("Viewer status: loading"),
        ViewerStatus::Loaded => tracing::info!("Viewer status: loaded"),
        ViewerStatus::Failed(message) => tracing::warn!(message = %message, "Viewer status: failed"),
    }
    if let Some(listener) = listener {
        listener.notify(&status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("", "models/quadcopter.glb"), "models/quadcopter.glb");
        assert_eq!(resolve_url("assets/", "models/quadcopter.glb"), "assets/models/quadcopter.glb");
        assert_eq!(
            resolve_url("assets", "https://cdn.example.org/q.glb"),
            "https://cdn.example.org/q.glb"
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_native_probe_checks_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/quadcopter.glb"), b"glTF").unwrap();
        let root = dir.path().to_string_lossy().to_string();

        let mut tracker = LoadTracker::new(Duration::from_secs(20));
        let cell: ProbeCell = Arc::new(Mutex::new(None));

        let ticket = tracker.begin(Duration::ZERO);
        let request = AssetRequest::new("models/quadcopter.glb", true);
        assert!(probe_model(&request, &root, ticket, cell.clone()));
        let (seen, result) = cell.lock().unwrap().take().unwrap();
        assert_eq!(seen, ticket);
        assert_eq!(tracker.on_probe(seen, result), ProbeStep::StartFetch);

        let ticket = tracker.begin(Duration::ZERO);
        let missing = AssetRequest::new("models/missing.glb", true);
        assert!(probe_model(&missing, &root, ticket, cell.clone()));
        let (seen, result) = cell.lock().unwrap().take().unwrap();
        assert!(matches!(tracker.on_probe(seen, result), ProbeStep::Failed(f) if f.is_not_found()));

        let remote = AssetRequest::new("https://cdn.example.org/q.glb", false);
        assert!(!probe_model(&remote, &root, ticket, cell));
    }
}
