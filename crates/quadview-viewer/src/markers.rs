//! Billboard part markers and their screen-space captions

use bevy::light::{NotShadowCaster, NotShadowReceiver};
use bevy::prelude::*;
use quadview_core::{AffordanceSpot, CameraPose, MarkerRules, PartMarkerState, RateLimiter};
use std::collections::HashMap;

use crate::app::{Catalog, ViewerLifecycle, ViewerSet, ViewerSettings};
use crate::camera::MainCamera;
use crate::lifecycle::SceneArena;
use crate::loader::ModelReady;
use crate::session::ViewerSession;

/// Caption shown on affordance markers
pub const AFFORDANCE_TEXT: &str = "Know More";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Part name, always eligible
    Name,
    /// "Know More" badge, only for the hovered part
    Affordance,
}

#[derive(Component, Debug, Clone)]
pub struct PartMarker {
    pub part_id: String,
    pub kind: MarkerKind,
    pub base_scale: f32,
    /// Own material so opacity can differ per marker
    pub material: Handle<StandardMaterial>,
}

/// Text drawn over a visible marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCaption {
    pub text: String,
    pub kind: MarkerKind,
    /// Logical pixels from the top-left of the viewport
    pub screen: Vec2,
    pub opacity: f32,
    pub scale: f32,
}

/// Marker output of the last throttled update
#[derive(Resource, Debug, Clone)]
pub struct MarkerFrame {
    pub captions: Vec<MarkerCaption>,
    /// Screen positions of visible affordances, for hover and click routing
    pub spots: Vec<AffordanceSpot>,
    limiter: RateLimiter,
    built: bool,
}

impl MarkerFrame {
    fn new(update_hz: f32) -> Self {
        Self {
            captions: Vec::new(),
            spots: Vec::new(),
            limiter: RateLimiter::per_second(update_hz),
            built: false,
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }
}

impl FromWorld for MarkerFrame {
    fn from_world(world: &mut World) -> Self {
        let hz = world
            .get_resource::<ViewerSettings>()
            .map(|s| s.config.markers.update_hz)
            .unwrap_or(30.0);
        Self::new(hz)
    }
}

pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerFrame>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), reset_marker_frame)
            .add_systems(
                Update,
                (build_markers, update_markers).chain().in_set(ViewerSet::Markers),
            );
    }
}

fn reset_marker_frame(mut commands: Commands, settings: Res<ViewerSettings>) {
    commands.insert_resource(MarkerFrame::new(settings.config.markers.update_hz));
}

/// Create one name and one affordance marker per part once the model is in
#[allow(clippy::too_many_arguments)]
fn build_markers(
    mut commands: Commands,
    mut ready: MessageReader<ModelReady>,
    mut arena: ResMut<SceneArena>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut frame: ResMut<MarkerFrame>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    existing: Query<Entity, With<PartMarker>>,
) {
    if ready.read().count() == 0 {
        return;
    }
    for entity in &existing {
        arena.despawn(&mut commands, entity);
    }

    let config = &settings.config.markers;
    let rules = MarkerRules::from(config);
    let name_plate = arena.mesh(&mut meshes, Rectangle::new(1.0, 0.3));
    let badge_plate = arena.mesh(&mut meshes, Rectangle::new(1.0, 0.35));

    for part in catalog.0.list() {
        let anchor = part.anchor();

        let name_material = arena.material(&mut materials, plate_material(Color::srgba(1.0, 1.0, 1.0, 0.85)));
        arena.spawn(
            &mut commands,
            (
                Name::new(format!("{}-name", part.id)),
                Mesh3d(name_plate.clone()),
                MeshMaterial3d(name_material.clone()),
                Transform::from_translation(rules.name_position(anchor)).with_scale(Vec3::splat(config.label_scale)),
                Visibility::Hidden,
                NotShadowCaster,
                NotShadowReceiver,
                PartMarker {
                    part_id: part.id.clone(),
                    kind: MarkerKind::Name,
                    base_scale: config.label_scale,
                    material: name_material,
                },
            ),
        );

        let badge_material = arena.material(&mut materials, plate_material(Color::srgba_u8(0x3b, 0x82, 0xf6, 230)));
        arena.spawn(
            &mut commands,
            (
                Name::new(format!("{}-affordance", part.id)),
                Mesh3d(badge_plate.clone()),
                MeshMaterial3d(badge_material.clone()),
                Transform::from_translation(rules.affordance_position(anchor))
                    .with_scale(Vec3::splat(config.affordance_scale)),
                Visibility::Hidden,
                NotShadowCaster,
                NotShadowReceiver,
                PartMarker {
                    part_id: part.id.clone(),
                    kind: MarkerKind::Affordance,
                    base_scale: config.affordance_scale,
                    material: badge_material,
                },
            ),
        );
    }

    frame.built = true;
    frame.limiter.force();
    tracing::debug!(parts = catalog.0.len(), "Part markers built");
}

fn plate_material(color: Color) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        double_sided: true,
        cull_mode: None,
        ..default()
    }
}

/// Apply marker rules at the throttled rate using this frame's camera pose
#[allow(clippy::too_many_arguments)]
fn update_markers(
    time: Res<Time<Real>>,
    mut frame: ResMut<MarkerFrame>,
    session: Res<ViewerSession>,
    catalog: Res<Catalog>,
    settings: Res<ViewerSettings>,
    cameras: Query<(&Camera, &Transform), With<MainCamera>>,
    mut markers: Query<(&PartMarker, &mut Transform, &mut Visibility), Without<MainCamera>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !frame.built || !frame.limiter.ready(time.elapsed()) {
        return;
    }
    let Ok((camera, camera_transform)) = cameras.single() else { return };

    // The camera has no parent, so its local transform is its global one
    let pose = CameraPose::new(camera_transform.translation, camera_transform.rotation);
    let camera_global = GlobalTransform::from(*camera_transform);

    let config = &settings.config.markers;
    let rules = MarkerRules::from(config);
    let states = rules.compute_frame(
        &pose,
        &catalog.0,
        session.state.hovered(),
        session.state.show_all_labels(),
    );
    let by_part: HashMap<&str, &PartMarkerState> = states.iter().map(|s| (s.part_id.as_str(), s)).collect();

    let mut captions = Vec::new();
    let mut spots = Vec::new();

    for (marker, mut transform, mut visibility) in &mut markers {
        let (Some(state), Some(part)) = (by_part.get(marker.part_id.as_str()), catalog.0.get(&marker.part_id)) else {
            continue;
        };

        let (visible, opacity, scale, position, text) = match marker.kind {
            MarkerKind::Name => (
                state.name.visible,
                state.name.opacity,
                state.name.scale,
                rules.name_position(part.anchor()),
                part.name.as_str(),
            ),
            MarkerKind::Affordance => (
                state.affordance_visible,
                1.0,
                1.0,
                rules.affordance_position(part.anchor()),
                AFFORDANCE_TEXT,
            ),
        };

        let wanted = if visible { Visibility::Inherited } else { Visibility::Hidden };
        if *visibility != wanted {
            *visibility = wanted;
        }
        if !visible {
            continue;
        }

        // Billboard: copy the camera orientation
        transform.translation = position;
        transform.rotation = pose.rotation;
        transform.scale = Vec3::splat(marker.base_scale * scale);

        let alpha = opacity * if marker.kind == MarkerKind::Name { 0.85 } else { 0.9 };
        let needs_update = materials
            .get(&marker.material)
            .is_some_and(|m| (m.base_color.alpha() - alpha).abs() > 0.01);
        if needs_update {
            if let Some(material) = materials.get_mut(&marker.material) {
                material.base_color.set_alpha(alpha);
            }
        }

        let Ok(screen) = camera.world_to_viewport(&camera_global, position) else { continue };
        captions.push(MarkerCaption {
            text: text.to_string(),
            kind: marker.kind,
            screen,
            opacity,
            scale,
        });
        if marker.kind == MarkerKind::Affordance {
            spots.push(AffordanceSpot {
                part_id: marker.part_id.clone(),
                screen,
            });
        }
    }

    frame.captions = captions;
    frame.spots = spots;
}
