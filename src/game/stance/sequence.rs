//! Attack sequence definitions and progress tracking.

use bevy::prelude::*;

use super::detector::{HandSide, VolumeId, VolumeRegistry};

/// A left/right pair of volumes that must be held by the matching batons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumePair {
    pub left: VolumeId,
    pub right: VolumeId,
}

impl VolumePair {
    pub fn new(left: VolumeId, right: VolumeId) -> Self {
        Self { left, right }
    }

    /// Left volume touched by the left baton AND right volume by the right one.
    /// Swapped hands do not count.
    pub fn is_held(&self, registry: &VolumeRegistry) -> bool {
        registry.occupied_by(self.left, HandSide::Left)
            && registry.occupied_by(self.right, HandSide::Right)
    }

    pub fn ids(&self) -> [VolumeId; 2] {
        [self.left, self.right]
    }
}

/// One ordered drill inside a stance.
#[derive(Debug, Clone)]
pub struct AttackSequence {
    pub name: String,
    pub start_pair: VolumePair,
    /// Declared strike order. Only used for guidance, credit is order-free.
    pub body: Vec<VolumeId>,
    pub end_pair: VolumePair,
    /// Seconds allowed for the drill; `None` falls back to the stance timeout
    pub time_limit: Option<f32>,
}

impl AttackSequence {
    pub fn total(&self) -> usize {
        self.body.len()
    }

    /// Volumes that are live while this sequence runs.
    pub fn live_volumes(&self) -> impl Iterator<Item = VolumeId> + '_ {
        self.body.iter().copied().chain(self.end_pair.ids())
    }
}

/// How an attack sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum SequenceOutcome {
    /// End pair was held
    Completed,
    /// Stance timer ran out first
    TimedOut,
}

/// Result of one finished sequence, handed to scoring and accuracy.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    pub stance: String,
    pub sequence: String,
    pub touched: usize,
    pub total: usize,
    pub outcome: SequenceOutcome,
}

impl SequenceReport {
    pub fn accuracy(&self) -> f32 {
        accuracy_ratio(self.touched, self.total)
    }
}

/// `touched / total` clamped to `[0, 1]`; an empty sequence scores 0.
pub fn accuracy_ratio(touched: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (touched as f32 / total as f32).clamp(0.0, 1.0)
}

/// Progress through the sequence that is currently running.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    pub stance: String,
    pub sequence: AttackSequence,
    pub touched: usize,
}

impl SequenceTracker {
    pub fn new(stance: impl Into<String>, sequence: AttackSequence) -> Self {
        Self {
            stance: stance.into(),
            sequence,
            touched: 0,
        }
    }

    /// Credits every body volume touched since the last scan. Returns how many
    /// volumes were newly credited.
    pub fn scan(&mut self, registry: &mut VolumeRegistry) -> usize {
        let mut credited = 0;
        for id in &self.sequence.body {
            let Some(volume) = registry.get_mut(*id) else {
                continue;
            };
            if !volume.completed && volume.is_occupied() {
                volume.completed = true;
                credited += 1;
            }
        }
        self.touched = (self.touched + credited).min(self.sequence.total());
        credited
    }

    pub fn is_finished(&self, registry: &VolumeRegistry) -> bool {
        self.sequence.end_pair.is_held(registry)
    }

    /// First body volume in declared order that has not been credited yet.
    pub fn next_expected(&self, registry: &VolumeRegistry) -> Option<VolumeId> {
        self.sequence
            .body
            .iter()
            .copied()
            .find(|id| registry.get(*id).is_some_and(|volume| !volume.completed))
    }

    pub fn report(&self, outcome: SequenceOutcome) -> SequenceReport {
        SequenceReport {
            stance: self.stance.clone(),
            sequence: self.sequence.name.clone(),
            touched: self.touched,
            total: self.sequence.total(),
            outcome,
        }
    }
}
