mod movement;

use avian3d::prelude::*;
use bevy::prelude::*;

use crate::{
    game::{
        arena::CHEST_POSITION,
        stance::{HandProxy, HandSide},
    },
    screens::Screen,
};

pub use movement::{HandControls, move_hands};

/// Baton tip collider size
pub const BATON_TIP_LENGTH: f32 = 0.08;
pub const BATON_TIP_RADIUS: f32 = 0.03;

/// Tuning for the keyboard-driven hand rig
#[derive(Resource, Debug, Clone)]
pub struct HandRigSettings {
    /// Hand speed in metres per second
    pub speed: f32,
    /// Speed multiplier while Shift is held
    pub precision_multiplier: f32,
    /// Furthest a hand can get from its shoulder
    pub reach: f32,
    /// Shoulder offset from the chest, mirrored for the right side
    pub shoulder_offset: Vec3,
    /// Where each hand starts, relative to the chest, mirrored for the right side
    pub rest_offset: Vec3,
}

impl Default for HandRigSettings {
    fn default() -> Self {
        Self {
            speed: 0.8,
            precision_multiplier: 0.35,
            reach: 0.75,
            shoulder_offset: Vec3::new(-0.2, 0.15, 0.0),
            rest_offset: Vec3::new(-0.3, -0.35, -0.2),
        }
    }
}

impl HandRigSettings {
    pub fn shoulder(&self, side: HandSide) -> Vec3 {
        CHEST_POSITION + mirror(self.shoulder_offset, side)
    }

    pub fn rest(&self, side: HandSide) -> Vec3 {
        CHEST_POSITION + mirror(self.rest_offset, side)
    }
}

/// Offsets are written for the left hand.
fn mirror(offset: Vec3, side: HandSide) -> Vec3 {
    match side {
        HandSide::Left => offset,
        HandSide::Right => Vec3::new(-offset.x, offset.y, offset.z),
    }
}

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<HandRigSettings>();
    app.add_systems(OnEnter(Screen::Gameplay), spawn_hands);
    app.add_systems(
        Update,
        move_hands.run_if(in_state(Screen::Gameplay)),
    );
}

fn spawn_hands(
    mut commands: Commands,
    settings: Res<HandRigSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Capsule3d::new(BATON_TIP_RADIUS, BATON_TIP_LENGTH));

    for (side, color) in [
        (HandSide::Left, Color::srgb(0.9, 0.4, 0.2)),
        (HandSide::Right, Color::srgb(0.2, 0.5, 0.9)),
    ] {
        commands.spawn((
            Name::new(side.tag()),
            HandProxy(side),
            HandControls::for_side(side),
            DespawnOnExit(Screen::Gameplay),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: color,
                ..default()
            })),
            Transform::from_translation(settings.rest(side)),
            // Avian3D physics components
            RigidBody::Dynamic,
            Collider::capsule(BATON_TIP_RADIUS, BATON_TIP_LENGTH),
            GravityScale(0.0),
            LockedAxes::ROTATION_LOCKED,
            CollisionEventsEnabled,
        ));
    }
    info!("Spawned baton proxies");
}
