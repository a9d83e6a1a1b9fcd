//! Baton-path guide: tints every trigger volume by its state.

use bevy::prelude::*;

use crate::{
    game::stance::{StanceMachine, StanceSystems, TriggerVolume, TriggerVolumeSensor, VolumeRole},
    screens::Screen,
};

pub const IDLE_COLOR: Color = Color::srgba(0.8, 0.8, 0.8, 0.25);
pub const STANCE_COLOR: Color = Color::srgba(0.4, 0.6, 1.0, 0.3);
pub const OCCUPIED_COLOR: Color = Color::srgba(1.0, 1.0, 1.0, 0.6);
pub const COMPLETED_COLOR: Color = Color::srgba(0.2, 0.9, 0.3, 0.5);
pub const NEXT_COLOR: Color = Color::srgba(1.0, 0.85, 0.1, 0.5);

/// Pulses per second on the next expected box
const PULSE_RATE: f32 = 2.0;

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        tint_volumes
            .after(StanceSystems::Publish)
            .run_if(in_state(Screen::Gameplay))
            .run_if(resource_exists::<StanceMachine>),
    );
}

/// Colour for a volume, or `None` to hide it. `pulse` is in `[0, 1]`.
pub fn volume_tint(volume: &TriggerVolume, is_next: bool, pulse: f32) -> Option<Color> {
    if !volume.active {
        return None;
    }
    let color = if volume.completed {
        COMPLETED_COLOR
    } else if volume.is_occupied() {
        OCCUPIED_COLOR
    } else if is_next {
        NEXT_COLOR.with_alpha(0.25 + 0.5 * pulse)
    } else if matches!(volume.role, VolumeRole::Stance(_)) {
        STANCE_COLOR
    } else {
        IDLE_COLOR
    };
    Some(color)
}

fn tint_volumes(
    time: Res<Time>,
    machine: Res<StanceMachine>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut sensors: Query<(
        &TriggerVolumeSensor,
        &MeshMaterial3d<StandardMaterial>,
        &mut Visibility,
    )>,
) {
    let registry = machine.registry();
    let next = machine
        .active_sequence()
        .and_then(|tracker| tracker.next_expected(registry));
    let pulse = 0.5 + 0.5 * (time.elapsed_secs() * PULSE_RATE * std::f32::consts::TAU).sin();

    for (sensor, material, mut visibility) in &mut sensors {
        let Some(volume) = registry.get(sensor.id) else {
            continue;
        };
        match volume_tint(volume, next == Some(sensor.id), pulse) {
            Some(color) => {
                visibility.set_if_neq(Visibility::Inherited);
                if let Some(material) = materials.get_mut(&material.0) {
                    if material.base_color != color {
                        material.base_color = color;
                    }
                }
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(active: bool) -> TriggerVolume {
        let mut volume = TriggerVolume::new("strike_1", VolumeRole::Sequence);
        volume.active = active;
        volume
    }

    #[test]
    fn test_inactive_is_hidden() {
        assert_eq!(volume_tint(&volume(false), true, 1.0), None);
    }

    #[test]
    fn test_completed_wins_over_next() {
        let mut volume = volume(true);
        volume.completed = true;
        volume.left_occupied = true;
        assert_eq!(volume_tint(&volume, true, 1.0), Some(COMPLETED_COLOR));
    }

    #[test]
    fn test_next_expected_pulses() {
        let volume = volume(true);
        let dim = volume_tint(&volume, true, 0.0);
        let bright = volume_tint(&volume, true, 1.0);
        assert_ne!(dim, bright);
        assert_eq!(volume_tint(&volume, false, 1.0), Some(IDLE_COLOR));
    }
}
