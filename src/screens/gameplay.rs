//! The screen state for the main gameplay.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use crate::{game::stance::StanceMachine, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        clear_stances
            .run_if(in_state(Screen::Gameplay))
            .run_if(resource_exists::<StanceMachine>)
            .run_if(input_just_pressed(KeyCode::Escape)),
    );
}

/// Panic button: drop whatever stance or drill is running.
fn clear_stances(mut machine: ResMut<StanceMachine>) {
    info!("Stances cleared by player");
    machine.clear_all_stances();
}
