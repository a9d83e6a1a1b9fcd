//! Stance detection and attack sequence tracking.
//!
//! Batons touch sensor volumes, the [`StanceMachine`] turns occupancy into
//! stances and drills, and every transition goes out as a [`StanceEvent`].

pub mod catalog;
pub mod detector;
pub mod machine;
pub mod sequence;
mod systems;

use bevy::prelude::*;

use crate::{game::configs::TrainingConfig, screens::Screen};

pub use catalog::{StanceCatalog, StanceDefinition};
pub use detector::{HandSide, TriggerVolume, VolumeId, VolumeRegistry, VolumeRole};
pub use machine::{Stance, StanceEvent, StanceMachine, StanceResult};
pub use sequence::{
    AttackSequence, SequenceOutcome, SequenceReport, SequenceTracker, VolumePair, accuracy_ratio,
};
pub use systems::{HandProxy, TriggerVolumeSensor, activate_stance_training};

/// Frame order: contacts feed the detectors, the machine ticks, then its
/// events go out for levels and UI.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StanceSystems {
    Contacts,
    Tick,
    Publish,
}

pub(super) fn plugin(app: &mut App) {
    app.add_message::<StanceEvent>();

    app.add_systems(
        Update,
        systems::init_stance_machine.run_if(resource_added::<TrainingConfig>),
    );

    app.add_systems(
        OnEnter(Screen::Gameplay),
        activate_stance_training.run_if(resource_exists::<StanceMachine>),
    );
    app.add_systems(
        OnExit(Screen::Gameplay),
        systems::deactivate_stance_training.run_if(resource_exists::<StanceMachine>),
    );

    app.configure_sets(
        Update,
        (
            StanceSystems::Contacts,
            StanceSystems::Tick,
            StanceSystems::Publish,
        )
            .chain()
            .run_if(in_state(Screen::Gameplay))
            .run_if(resource_exists::<StanceMachine>),
    );
    app.add_systems(
        Update,
        (
            systems::route_trigger_contacts.in_set(StanceSystems::Contacts),
            systems::tick_stance_machine.in_set(StanceSystems::Tick),
            (systems::publish_stance_events, systems::sync_volume_colliders)
                .in_set(StanceSystems::Publish),
        ),
    );
}
