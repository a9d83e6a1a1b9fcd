use avian3d::prelude::*;
use bevy::prelude::*;

use super::HandRigSettings;
use crate::game::stance::{HandProxy, HandSide};

/// Key bindings for one hand
#[derive(Component, Debug, Clone)]
pub struct HandControls {
    pub up: KeyCode,
    pub down: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub forward: KeyCode,
    pub back: KeyCode,
}

impl HandControls {
    /// WASD + QE for the left hand, IJKL + UO for the right.
    pub fn for_side(side: HandSide) -> Self {
        match side {
            HandSide::Left => Self {
                up: KeyCode::KeyW,
                down: KeyCode::KeyS,
                left: KeyCode::KeyA,
                right: KeyCode::KeyD,
                forward: KeyCode::KeyE,
                back: KeyCode::KeyQ,
            },
            HandSide::Right => Self {
                up: KeyCode::KeyI,
                down: KeyCode::KeyK,
                left: KeyCode::KeyJ,
                right: KeyCode::KeyL,
                forward: KeyCode::KeyO,
                back: KeyCode::KeyU,
            },
        }
    }

    fn direction(&self, keyboard: &ButtonInput<KeyCode>) -> Vec3 {
        let axis = |positive: KeyCode, negative: KeyCode| {
            keyboard.pressed(positive) as i8 as f32 - keyboard.pressed(negative) as i8 as f32
        };
        Vec3::new(
            axis(self.right, self.left),
            axis(self.up, self.down),
            // Forward is away from the player, -Z
            -axis(self.forward, self.back),
        )
        .normalize_or_zero()
    }
}

/// Keeps a hand inside its reach sphere by dropping the outward part of the
/// velocity once it is at the edge.
fn limit_to_reach(position: Vec3, velocity: Vec3, shoulder: Vec3, reach: f32) -> Vec3 {
    let offset = position - shoulder;
    if offset.length() < reach {
        return velocity;
    }
    let outward = offset.normalize_or_zero();
    let along = velocity.dot(outward);
    if along > 0.0 {
        velocity - outward * along
    } else {
        velocity
    }
}

pub fn move_hands(
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<HandRigSettings>,
    mut hands: Query<(&HandProxy, &HandControls, &Transform, &mut LinearVelocity)>,
) {
    let precise = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let speed = if precise {
        settings.speed * settings.precision_multiplier
    } else {
        settings.speed
    };

    for (hand, controls, transform, mut velocity) in &mut hands {
        let wanted = controls.direction(&keyboard) * speed;
        velocity.0 = limit_to_reach(
            transform.translation,
            wanted,
            settings.shoulder(hand.0),
            settings.reach,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_keys_cancel() {
        let controls = HandControls::for_side(HandSide::Left);
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::KeyW);
        keyboard.press(KeyCode::KeyS);
        keyboard.press(KeyCode::KeyD);
        assert_eq!(controls.direction(&keyboard), Vec3::X);
    }

    #[test]
    fn test_forward_is_negative_z() {
        let controls = HandControls::for_side(HandSide::Right);
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::KeyO);
        assert_eq!(controls.direction(&keyboard), Vec3::NEG_Z);
    }

    #[test]
    fn test_reach_blocks_outward_motion_only() {
        let shoulder = Vec3::ZERO;
        let at_edge = Vec3::new(1.0, 0.0, 0.0);

        let outward = limit_to_reach(at_edge, Vec3::new(1.0, 1.0, 0.0), shoulder, 1.0);
        assert_eq!(outward, Vec3::new(0.0, 1.0, 0.0));

        let inward = limit_to_reach(at_edge, Vec3::NEG_X, shoulder, 1.0);
        assert_eq!(inward, Vec3::NEG_X);
    }
}
