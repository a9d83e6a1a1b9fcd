//! Text overlay: current stance, countdown, drill progress and the last
//! level message.

use bevy::prelude::*;

use crate::{
    game::{
        level::LevelFeedback,
        stance::{StanceMachine, StanceSystems},
    },
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Gameplay), spawn_hud);
    app.add_systems(
        Update,
        (
            update_stance_readout.run_if(resource_exists::<StanceMachine>),
            update_feedback_line,
        )
            .after(StanceSystems::Publish)
            .run_if(in_state(Screen::Gameplay)),
    );
}

#[derive(Component)]
struct StanceReadout;

#[derive(Component)]
struct FeedbackLine;

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Name::new("HUD"),
        DespawnOnExit(Screen::Gameplay),
        Node {
            position_type: PositionType::Absolute,
            width: percent(100),
            height: percent(100),
            flex_direction: FlexDirection::Column,
            justify_content: JustifyContent::SpaceBetween,
            padding: UiRect::all(px(16)),
            ..default()
        },
        children![
            (
                Name::new("Stance Readout"),
                StanceReadout,
                Text::new("Stance: Default"),
                TextFont::from_font_size(22.0),
                TextColor(Color::WHITE),
            ),
            (
                Name::new("Feedback Line"),
                FeedbackLine,
                Text::new(""),
                TextFont::from_font_size(26.0),
                TextColor(Color::srgb(1.0, 0.9, 0.4)),
            ),
        ],
    ));
}

/// Readout text for the machine's current state.
pub fn stance_readout(machine: &StanceMachine) -> String {
    let stance = machine.current_stance();
    let mut line = format!("Stance: {}", stance.label());
    if !stance.is_default() {
        line.push_str(&format!("  {:.1}s", machine.timer().max(0.0)));
    }
    if let Some(tracker) = machine.active_sequence() {
        line.push_str(&format!(
            "\n{}: {}/{}",
            tracker.sequence.name,
            tracker.touched,
            tracker.sequence.total()
        ));
    }
    if machine.is_practice_mode() {
        line.push_str("\n(practice)");
    }
    line
}

fn update_stance_readout(
    machine: Res<StanceMachine>,
    mut readouts: Query<&mut Text, With<StanceReadout>>,
) {
    let line = stance_readout(&machine);
    for mut text in &mut readouts {
        if text.0 != line {
            text.0.clone_from(&line);
        }
    }
}

fn update_feedback_line(
    mut feedback: MessageReader<LevelFeedback>,
    mut lines: Query<&mut Text, With<FeedbackLine>>,
) {
    let Some(LevelFeedback(latest)) = feedback.read().last() else {
        return;
    };
    for mut text in &mut lines {
        text.0.clone_from(latest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{configs::TrainingConfig, stance::StanceCatalog};

    #[test]
    fn test_readout_shows_stance_and_timer() {
        let catalog = StanceCatalog::from_config(&TrainingConfig::default()).unwrap();
        let mut machine = StanceMachine::new(catalog);
        assert_eq!(stance_readout(&machine), "Stance: Default");

        machine.set_game_active(true);
        machine.enter_stance("Ready", true);
        assert_eq!(stance_readout(&machine), "Stance: Ready  10.0s\n(practice)");
    }
}
