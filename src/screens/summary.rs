//! End of level: per-objective scores and session accuracy.

use bevy::{input::common_conditions::input_just_pressed, prelude::*};

use crate::{
    game::{
        accuracy::SessionAccuracy,
        level::{LastLevelSummary, LevelQueue, LevelSummary},
    },
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(OnEnter(Screen::Summary), spawn_summary_screen);
    app.add_systems(
        Update,
        next_level
            .run_if(in_state(Screen::Summary))
            .run_if(input_just_pressed(KeyCode::Enter)),
    );
}

/// Lines shown on the summary screen.
pub fn summary_lines(summary: Option<&LevelSummary>, accuracy: &SessionAccuracy) -> Vec<String> {
    let mut lines = Vec::new();
    match summary {
        Some(summary) => {
            lines.push(summary.level.clone());
            for entry in &summary.scores {
                let attempts = if entry.attempts > 1 {
                    format!(" ({} attempts)", entry.attempts)
                } else {
                    String::new()
                };
                lines.push(format!(
                    "{} / {}: {} ({:.0}%){attempts}",
                    entry.stance,
                    entry.sequence,
                    entry.score,
                    entry.accuracy * 100.0
                ));
            }
            if !summary.scores.is_empty() {
                lines.push(format!(
                    "Total {}/{}",
                    summary.total_score(),
                    summary.max_score()
                ));
            }
        }
        None => lines.push("Free practice".to_string()),
    }
    lines.push(format!(
        "Accuracy {:.0}% over {} drills",
        accuracy.accuracy() * 100.0,
        accuracy.sequences
    ));
    lines.push("Press Enter for the next level".to_string());
    lines
}

fn spawn_summary_screen(
    mut commands: Commands,
    summary: Res<LastLevelSummary>,
    accuracy: Res<SessionAccuracy>,
) {
    let lines = summary_lines(summary.0.as_ref(), &accuracy);

    commands.spawn((
        Name::new("Summary Camera"),
        DespawnOnExit(Screen::Summary),
        Camera2d,
    ));
    commands
        .spawn((
            Name::new("Summary Screen"),
            DespawnOnExit(Screen::Summary),
            Node {
                position_type: PositionType::Absolute,
                width: percent(100),
                height: percent(100),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: px(8),
                ..default()
            },
        ))
        .with_children(|parent| {
            for (i, line) in lines.into_iter().enumerate() {
                let size = if i == 0 { 36.0 } else { 22.0 };
                parent.spawn((Text::new(line), TextFont::from_font_size(size)));
            }
        });
}

fn next_level(mut queue: Option<ResMut<LevelQueue>>, mut next_screen: ResMut<NextState<Screen>>) {
    if let Some(queue) = queue.as_mut() {
        queue.advance();
    }
    next_screen.set(Screen::Gameplay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::ObjectiveScore;

    #[test]
    fn test_summary_lines() {
        let summary = LevelSummary {
            level: "Drills".into(),
            scores: vec![ObjectiveScore {
                stance: "Ready".into(),
                sequence: "Abaniko".into(),
                score: 2,
                accuracy: 0.6,
                attempts: 2,
            }],
        };
        let mut accuracy = SessionAccuracy::default();
        accuracy.record_sequence_data(5, 3);

        let lines = summary_lines(Some(&summary), &accuracy);
        assert_eq!(lines[0], "Drills");
        assert_eq!(lines[1], "Ready / Abaniko: 2 (60%) (2 attempts)");
        assert_eq!(lines[2], "Total 2/4");
        assert_eq!(lines[3], "Accuracy 60% over 1 drills");
    }

    #[test]
    fn test_free_practice_summary() {
        let lines = summary_lines(None, &SessionAccuracy::default());
        assert_eq!(lines[0], "Free practice");
    }
}
