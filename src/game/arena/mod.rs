//! Training space: camera, light and one sensor box per trigger volume.

pub mod visuals;

use std::collections::HashMap;

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        configs::TrainingConfig,
        stance::{StanceMachine, TriggerVolumeSensor, VolumeRole, activate_stance_training},
    },
    screens::Screen,
};

/// Volume centres in the config are relative to this point
pub const CHEST_POSITION: Vec3 = Vec3::new(0.0, 1.4, 0.0);

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        OnEnter(Screen::Gameplay),
        (spawn_arena, spawn_volumes.after(activate_stance_training)),
    );
    app.add_plugins(visuals::plugin);
}

fn spawn_arena(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        DespawnOnExit(Screen::Gameplay),
        Transform::from_translation(CHEST_POSITION + Vec3::new(0.0, 0.45, 1.1))
            .looking_at(CHEST_POSITION + Vec3::new(0.0, 0.0, -0.4), Vec3::Y),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        DespawnOnExit(Screen::Gameplay),
        Transform::from_xyz(2.0, 5.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Floor"),
        DespawnOnExit(Screen::Gameplay),
        Mesh3d(meshes.add(Cuboid::new(6.0, 0.1, 6.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.32, 0.3),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, -0.05, 0.0),
    ));

    // Torso stand-in so the boxes have something to be relative to
    commands.spawn((
        Name::new("Torso"),
        DespawnOnExit(Screen::Gameplay),
        Mesh3d(meshes.add(Capsule3d::new(0.18, 0.5))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgba(0.8, 0.8, 0.8, 0.4),
            alpha_mode: AlphaMode::Blend,
            ..default()
        })),
        Transform::from_translation(CHEST_POSITION - Vec3::Y * 0.2),
    ));
}

/// One sensor per registered volume. Each gets its own material so the
/// guide can tint it independently.
fn spawn_volumes(
    mut commands: Commands,
    machine: Option<Res<StanceMachine>>,
    config: Option<Res<TrainingConfig>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let (Some(machine), Some(config)) = (machine, config) else {
        warn!("No stance catalogue, arena has no trigger volumes");
        return;
    };

    let placements: HashMap<&str, _> = config
        .volumes
        .iter()
        .map(|volume| (volume.name.as_str(), volume))
        .collect();

    for (id, volume) in machine.registry().iter() {
        let Some(placement) = placements.get(volume.name.as_str()) else {
            warn!("Volume '{}' has no placement", volume.name);
            continue;
        };
        let size = Vec3::from_array(placement.size);
        let kind = match volume.role {
            VolumeRole::Stance(_) => "Stance Box",
            VolumeRole::Sequence => "Checkpoint",
        };

        let mut sensor = commands.spawn((
            Name::new(format!("{kind} {}", volume.name)),
            TriggerVolumeSensor { id },
            DespawnOnExit(Screen::Gameplay),
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: visuals::IDLE_COLOR,
                alpha_mode: AlphaMode::Blend,
                unlit: true,
                ..default()
            })),
            Transform::from_translation(CHEST_POSITION + Vec3::from_array(placement.center)),
            Collider::cuboid(size.x, size.y, size.z),
            Sensor,
            CollisionEventsEnabled,
        ));
        if !volume.active {
            sensor.insert((ColliderDisabled, Visibility::Hidden));
        }
    }
    debug!("Spawned {} trigger volumes", machine.registry().len());
}
