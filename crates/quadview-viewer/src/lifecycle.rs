//! Mount/unmount handling and the scene resource arena

use bevy::prelude::*;
use quadview_core::ResourceArena;

use crate::app::ViewerLifecycle;

/// Every entity root, mesh, material and asset handle the viewer creates.
///
/// Only hierarchy roots are tracked as entities; their children go with them.
#[derive(Resource, Default)]
pub struct SceneArena {
    pub entities: ResourceArena<Entity>,
    pub meshes: ResourceArena<Handle<Mesh>>,
    pub materials: ResourceArena<Handle<StandardMaterial>>,
    pub assets: ResourceArena<UntypedHandle>,
}

impl SceneArena {
    pub fn mesh(&mut self, meshes: &mut Assets<Mesh>, mesh: impl Into<Mesh>) -> Handle<Mesh> {
        self.meshes.track(meshes.add(mesh))
    }

    pub fn material(
        &mut self,
        materials: &mut Assets<StandardMaterial>,
        material: StandardMaterial,
    ) -> Handle<StandardMaterial> {
        self.materials.track(materials.add(material))
    }

    pub fn spawn(&mut self, commands: &mut Commands, bundle: impl Bundle) -> Entity {
        let entity = commands.spawn(bundle).id();
        self.entities.track(entity)
    }

    /// Despawn a tracked root before teardown
    pub fn despawn(&mut self, commands: &mut Commands, entity: Entity) {
        self.entities.forget(|e| *e == entity);
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
    }
}

pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneArena>()
            .add_systems(OnEnter(ViewerLifecycle::Mounted), log_mount)
            .add_systems(OnExit(ViewerLifecycle::Mounted), teardown_scene);
    }
}

fn log_mount() {
    tracing::info!("Viewer mounted");
}

/// Release everything the mount created, in one pass over the arena
fn teardown_scene(
    mut commands: Commands,
    mut arena: ResMut<SceneArena>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let entities = arena.entities.release_all(|entity| {
        if let Ok(mut entity_commands) = commands.get_entity(entity) {
            entity_commands.despawn();
        }
    });
    let mesh_count = arena.meshes.release_all(|handle| {
        meshes.remove(&handle);
    });
    let material_count = arena.materials.release_all(|handle| {
        materials.remove(&handle);
    });
    // Dropping the strong handles lets the asset server free them
    let asset_count = arena.assets.release_all(drop);

    tracing::info!(
        entities,
        meshes = mesh_count,
        materials = material_count,
        assets = asset_count,
        "Viewer unmounted, scene resources released"
    );
}
