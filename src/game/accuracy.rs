//! Running accuracy over every drill of the current level.

use bevy::prelude::*;

use crate::{
    game::stance::{StanceEvent, StanceSystems, accuracy_ratio},
    screens::Screen,
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<SessionAccuracy>();
    app.add_systems(
        Update,
        record_accuracy
            .after(StanceSystems::Publish)
            .run_if(in_state(Screen::Gameplay)),
    );
}

#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct SessionAccuracy {
    pub sequences: u32,
    pub total_boxes: usize,
    pub touched_boxes: usize,
    ratio_sum: f32,
}

impl SessionAccuracy {
    pub fn record_sequence_data(&mut self, sequence_box_count: usize, touched_box_count: usize) {
        let touched = touched_box_count.min(sequence_box_count);
        self.sequences += 1;
        self.total_boxes += sequence_box_count;
        self.touched_boxes += touched;
        self.ratio_sum += accuracy_ratio(touched, sequence_box_count);
    }

    /// Touched boxes over all boxes, so long drills weigh more.
    pub fn accuracy(&self) -> f32 {
        accuracy_ratio(self.touched_boxes, self.total_boxes)
    }

    /// Average of the per-drill ratios.
    pub fn mean_ratio(&self) -> f32 {
        if self.sequences == 0 {
            return 0.0;
        }
        self.ratio_sum / self.sequences as f32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn record_accuracy(mut events: MessageReader<StanceEvent>, mut accuracy: ResMut<SessionAccuracy>) {
    for event in events.read() {
        if let StanceEvent::SequenceFinished(report) = event {
            accuracy.record_sequence_data(report.total, report.touched);
            debug!(
                "Session accuracy {:.0}% over {} drills",
                accuracy.accuracy() * 100.0,
                accuracy.sequences
            );
        }
    }
}
