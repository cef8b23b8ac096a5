//! 3D scene bootstrap: camera, lights, ground and the placeholder drone

use bevy::camera::Exposure;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::light::NotShadowCaster;
use bevy::prelude::*;

use crate::app::{ViewerLifecycle, ViewerSettings};
use crate::camera::MainCamera;
use crate::lifecycle::SceneArena;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(ViewerLifecycle::Mounted), setup_scene)
            .add_systems(
                Update,
                spin_placeholder.run_if(in_state(ViewerLifecycle::Mounted)),
            );
    }
}

/// Root of the procedural stand-in shown until the asset is ready
#[derive(Component)]
pub struct Placeholder;

/// Root of the loaded glTF scene
#[derive(Component)]
pub struct ModelRoot;

/// Mesh belonging to the loaded model (ray cast target)
#[derive(Component)]
pub struct ModelSurface;

/// Placeholder spin about +Y, rad/s
const PLACEHOLDER_SPIN: f32 = 0.5;

/// Brightness multiplier applied on top of the default exposure
const EXPOSURE_GAIN: f32 = 1.2;

const MOTOR_CORNERS: [Vec3; 4] = [
    Vec3::new(0.7, 0.15, 0.7),
    Vec3::new(-0.7, 0.15, 0.7),
    Vec3::new(0.7, 0.15, -0.7),
    Vec3::new(-0.7, 0.15, -0.7),
];

fn setup_scene(
    mut commands: Commands,
    mut arena: ResMut<SceneArena>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<ViewerSettings>,
) {
    let camera = &settings.config.camera;
    let eye = Vec3::from_array(camera.overview_position);
    let target = Vec3::from_array(camera.overview_target);

    // Y-up, camera in front of the model and slightly above
    arena.spawn(
        &mut commands,
        (
            Camera3d::default(),
            Projection::Perspective(PerspectiveProjection {
                fov: camera.fov_degrees.to_radians(),
                near: 0.1,
                far: 1000.0,
                ..default()
            }),
            Transform::from_translation(eye).looking_at(target, Vec3::Y),
            Tonemapping::AcesFitted,
            camera_exposure(),
            AmbientLight {
                color: Color::WHITE,
                brightness: 500.0,
                ..default()
            },
            MainCamera,
        ),
    );

    // Key light casts the only shadows
    arena.spawn(
        &mut commands,
        (
            DirectionalLight {
                illuminance: 8000.0,
                shadows_enabled: true,
                ..default()
            },
            Transform::from_xyz(5.0, 5.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ),
    );
    arena.spawn(
        &mut commands,
        (
            DirectionalLight {
                illuminance: 4000.0,
                ..default()
            },
            Transform::from_xyz(-5.0, 2.0, -5.0).looking_at(Vec3::ZERO, Vec3::Y),
        ),
    );
    // Rim light from below
    arena.spawn(
        &mut commands,
        (
            DirectionalLight {
                illuminance: 2400.0,
                ..default()
            },
            Transform::from_xyz(0.0, -5.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
        ),
    );

    let ground_mesh = arena.mesh(&mut meshes, Plane3d::default().mesh().size(50.0, 50.0));
    let ground_material = arena.material(&mut materials, ground_material());
    arena.spawn(
        &mut commands,
        (
            Mesh3d(ground_mesh),
            MeshMaterial3d(ground_material),
            Transform::from_xyz(0.0, -1.0, 0.0),
            NotShadowCaster,
        ),
    );

    spawn_placeholder(&mut commands, &mut arena, &mut meshes, &mut materials);
    tracing::debug!(entities = arena.entities.len(), "Scene bootstrapped");
}

fn camera_exposure() -> Exposure {
    Exposure {
        ev100: Exposure::default().ev100 - EXPOSURE_GAIN.log2(),
    }
}

/// Shadow catcher: multiplied onto the clear color, so only shadowed texels
/// darken the background
fn ground_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 1.0,
        reflectance: 0.0,
        alpha_mode: AlphaMode::Multiply,
        ..default()
    }
}

fn spawn_placeholder(
    commands: &mut Commands,
    arena: &mut SceneArena,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let body_mesh = arena.mesh(meshes, Cuboid::new(1.5, 0.2, 1.5));
    let top_mesh = arena.mesh(meshes, Cuboid::new(0.8, 0.1, 0.8));
    let motor_mesh = arena.mesh(meshes, Cylinder::new(0.2, 0.1));
    let prop_mesh = arena.mesh(meshes, Cuboid::new(0.8, 0.05, 0.1));

    let body_material = arena.material(materials, placeholder_material(Color::srgb_u8(0x3b, 0x82, 0xf6), 0.5, 0.2));
    let top_material = arena.material(materials, placeholder_material(Color::srgb_u8(0x60, 0xa5, 0xfa), 0.6, 0.4));
    let motor_material = arena.material(materials, placeholder_material(Color::srgb_u8(0x1e, 0x40, 0xaf), 0.5, 0.5));
    let prop_material = arena.material(materials, placeholder_material(Color::srgb_u8(0xdb, 0xea, 0xfe), 0.7, 0.2));

    let root = arena.spawn(
        commands,
        (
            Name::new("placeholder-drone"),
            Transform::default(),
            Visibility::default(),
            Placeholder,
        ),
    );

    commands.entity(root).with_children(|parent| {
        parent.spawn((Mesh3d(body_mesh), MeshMaterial3d(body_material), Transform::default()));
        parent.spawn((
            Mesh3d(top_mesh),
            MeshMaterial3d(top_material),
            Transform::from_xyz(0.0, 0.2, 0.0),
        ));

        for corner in MOTOR_CORNERS {
            parent.spawn((
                Mesh3d(motor_mesh.clone()),
                MeshMaterial3d(motor_material.clone()),
                Transform::from_translation(corner),
            ));

            // Diagonal pairs share a bar orientation
            let yaw = if corner.x * corner.z > 0.0 {
                0.0
            } else {
                std::f32::consts::FRAC_PI_2
            };
            parent.spawn((
                Mesh3d(prop_mesh.clone()),
                MeshMaterial3d(prop_material.clone()),
                Transform::from_translation(corner + Vec3::Y * 0.1).with_rotation(Quat::from_rotation_y(yaw)),
            ));
        }
    });
}

fn placeholder_material(color: Color, roughness: f32, metallic: f32) -> StandardMaterial {
    StandardMaterial {
        base_color: color,
        perceptual_roughness: roughness,
        metallic,
        ..default()
    }
}

fn spin_placeholder(time: Res<Time>, mut placeholders: Query<&mut Transform, With<Placeholder>>) {
    for mut transform in &mut placeholders {
        transform.rotate_y(PLACEHOLDER_SPIN * time.delta_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exposure_brightens_default() {
        let exposure = camera_exposure();
        let shift = Exposure::default().ev100 - exposure.ev100;
        assert!((2f32.powf(shift) - EXPOSURE_GAIN).abs() < 1e-4);
    }

    #[test]
    fn test_ground_only_darkens_background() {
        let material = ground_material();
        assert_eq!(material.alpha_mode, AlphaMode::Multiply);
        assert_eq!(material.base_color, Color::WHITE);
        assert!(!material.unlit);
    }
}
