//! Development tools for the game. This plugin is only enabled in dev builds.

use avian3d::prelude::{PhysicsDebugPlugin, PhysicsGizmos};
use bevy::{
    dev_tools::states::log_transitions, input::common_conditions::input_just_pressed, prelude::*,
    ui_render::UiDebugOptions,
};

use crate::{game::stance::StanceMachine, screens::Screen};

const TOGGLE_KEY: KeyCode = KeyCode::Backquote;

pub(super) fn plugin(app: &mut App) {
    // Log `Screen` state transitions.
    app.add_systems(Update, (log_transitions::<Screen>, toggle_physics_debug));
    app.add_plugins(PhysicsDebugPlugin::default());

    // Toggle the debug overlay for UI.
    app.add_systems(
        Update,
        toggle_debug_ui.run_if(input_just_pressed(TOGGLE_KEY)),
    );
    app.add_systems(
        Update,
        dump_stance_machine
            .run_if(resource_exists::<StanceMachine>)
            .run_if(input_just_pressed(KeyCode::F4)),
    );
}

fn toggle_debug_ui(mut options: ResMut<UiDebugOptions>) {
    options.toggle();
}

fn toggle_physics_debug(keys: Res<ButtonInput<KeyCode>>, mut store: ResMut<GizmoConfigStore>) {
    if keys.just_pressed(KeyCode::F3) {
        let (config, _) = store.config_mut::<PhysicsGizmos>();
        config.enabled = !config.enabled;
        info!(
            "Physics debug rendering: {}",
            if config.enabled { "ON" } else { "OFF" }
        );
    }
}

fn dump_stance_machine(machine: Res<StanceMachine>) {
    info!(
        "Stance '{}' timer {:.2}s practice={} active={}",
        machine.current_stance().label(),
        machine.timer(),
        machine.is_practice_mode(),
        machine.is_game_active()
    );
    for (id, volume) in machine.registry().iter().filter(|(_, v)| v.active) {
        info!(
            "  {:?} {} L={} R={} done={}",
            id, volume.name, volume.left_occupied, volume.right_occupied, volume.completed
        );
    }
}
