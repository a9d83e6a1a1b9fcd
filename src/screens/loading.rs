//! Waits for the training config and the stance catalogue built from it.

use bevy::prelude::*;

use crate::{asset_tracking::ResourceHandles, game::stance::StanceMachine, screens::Screen};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Loading), spawn_loading_screen);
    app.add_systems(
        Update,
        enter_gameplay_screen.run_if(in_state(Screen::Loading).and(all_ready)),
    );
}

fn spawn_loading_screen(mut commands: Commands) {
    commands.spawn((
        Name::new("Loading Camera"),
        DespawnOnExit(Screen::Loading),
        Camera2d,
    ));
    commands.spawn((
        Name::new("Loading Text"),
        DespawnOnExit(Screen::Loading),
        Node {
            position_type: PositionType::Absolute,
            width: percent(100),
            height: percent(100),
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
            ..default()
        },
        children![(Text::new("Loading..."), TextFont::from_font_size(32.0))],
    ));
}

fn enter_gameplay_screen(mut next_screen: ResMut<NextState<Screen>>) {
    next_screen.set(Screen::Gameplay);
}

fn all_ready(resource_handles: Res<ResourceHandles>, machine: Option<Res<StanceMachine>>) -> bool {
    resource_handles.is_all_done() && machine.is_some()
}
