//! Trigger volume occupancy tracking.
//!
//! Every spatial box the player can touch with a baton is a [`TriggerVolume`].
//! The physics layer forwards sensor contacts here as `on_enter`/`on_exit`
//! calls; the registry only keeps per-hand booleans and answers "is this
//! stance fully covered right now?".

use std::collections::HashMap;

use bevy::prelude::*;

/// Which physical baton touched a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Name given to the hand proxy entity for this side.
    pub fn tag(&self) -> &'static str {
        match self {
            HandSide::Left => "Left Baton",
            HandSide::Right => "Right Baton",
        }
    }

    /// Maps a hand proxy name back to its side. Anything else is not a baton.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Left Baton" => Some(HandSide::Left),
            "Right Baton" => Some(HandSide::Right),
            _ => None,
        }
    }
}

/// Dense index into the [`VolumeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct VolumeId(pub usize);

/// What a volume is used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeRole {
    /// Part of the box set that defines a named stance
    Stance(String),
    /// Start, body or end checkpoint of an attack sequence
    Sequence,
}

/// One trigger box and its current occupancy.
#[derive(Debug, Clone)]
pub struct TriggerVolume {
    pub name: String,
    pub role: VolumeRole,
    pub left_occupied: bool,
    pub right_occupied: bool,
    /// Set once the volume has been credited during the active sequence
    pub completed: bool,
    /// Inactive volumes have their collider disabled and ignore contacts
    pub active: bool,
}

impl TriggerVolume {
    pub fn new(name: impl Into<String>, role: VolumeRole) -> Self {
        Self {
            name: name.into(),
            role,
            left_occupied: false,
            right_occupied: false,
            completed: false,
            active: false,
        }
    }

    /// Touched by either baton.
    pub fn is_occupied(&self) -> bool {
        self.left_occupied || self.right_occupied
    }

    pub fn occupied_by(&self, side: HandSide) -> bool {
        match side {
            HandSide::Left => self.left_occupied,
            HandSide::Right => self.right_occupied,
        }
    }

    fn set_occupied(&mut self, side: HandSide, value: bool) {
        match side {
            HandSide::Left => self.left_occupied = value,
            HandSide::Right => self.right_occupied = value,
        }
    }

    pub fn reset(&mut self) {
        self.left_occupied = false;
        self.right_occupied = false;
    }

    /// Clears occupancy and credit. Disabling a collider never delivers the
    /// matching exit contact, so this must run whenever a volume is switched off.
    pub fn force_reset_trigger_state(&mut self) {
        self.reset();
        self.completed = false;
    }
}

/// All trigger volumes of a session, addressable by id, name or stance.
#[derive(Debug, Clone, Default)]
pub struct VolumeRegistry {
    volumes: Vec<TriggerVolume>,
    by_name: HashMap<String, VolumeId>,
    by_stance: HashMap<String, Vec<VolumeId>>,
}

impl VolumeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a volume, or returns the existing id if the name is already taken.
    pub fn register(&mut self, name: impl Into<String>, role: VolumeRole) -> VolumeId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }

        let id = VolumeId(self.volumes.len());
        if let VolumeRole::Stance(stance) = &role {
            self.by_stance.entry(stance.clone()).or_default().push(id);
        }
        self.by_name.insert(name.clone(), id);
        self.volumes.push(TriggerVolume::new(name, role));
        id
    }

    pub fn id(&self, name: &str) -> Option<VolumeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: VolumeId) -> Option<&TriggerVolume> {
        self.volumes.get(id.0)
    }

    pub fn get_mut(&mut self, id: VolumeId) -> Option<&mut TriggerVolume> {
        self.volumes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VolumeId, &TriggerVolume)> {
        self.volumes
            .iter()
            .enumerate()
            .map(|(index, volume)| (VolumeId(index), volume))
    }

    /// Box set of a stance, empty if the stance has no boxes.
    pub fn stance_volumes(&self, stance: &str) -> &[VolumeId] {
        self.by_stance
            .get(stance)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every volume that belongs to some stance box set.
    pub fn all_stance_volumes(&self) -> impl Iterator<Item = VolumeId> + '_ {
        self.by_stance.values().flatten().copied()
    }

    pub fn is_occupied(&self, id: VolumeId) -> bool {
        self.get(id).is_some_and(TriggerVolume::is_occupied)
    }

    pub fn occupied_by(&self, id: VolumeId, side: HandSide) -> bool {
        self.get(id).is_some_and(|volume| volume.occupied_by(side))
    }

    /// A baton started touching a volume.
    ///
    /// Returns the stance to request when this contact completes a stance box
    /// set. The check runs on every enter, so a stance may be requested more
    /// than once; the state machine treats repeated requests as no-ops.
    pub fn on_enter(&mut self, id: VolumeId, side: HandSide) -> Option<String> {
        let volume = self.volumes.get_mut(id.0)?;
        if !volume.active {
            return None;
        }
        volume.set_occupied(side, true);

        match &volume.role {
            VolumeRole::Stance(stance) => {
                let stance = stance.clone();
                self.check_stance_complete(&stance).then_some(stance)
            }
            VolumeRole::Sequence => None,
        }
    }

    /// A baton stopped touching a volume. Exits never complete a stance.
    pub fn on_exit(&mut self, id: VolumeId, side: HandSide) {
        if let Some(volume) = self.volumes.get_mut(id.0) {
            volume.set_occupied(side, false);
        }
    }

    /// True when every box of the stance is touched by at least one baton.
    pub fn check_stance_complete(&self, stance: &str) -> bool {
        let ids = self.stance_volumes(stance);
        !ids.is_empty() && ids.iter().all(|id| self.is_occupied(*id))
    }

    pub fn reset(&mut self, id: VolumeId) {
        if let Some(volume) = self.volumes.get_mut(id.0) {
            volume.reset();
        }
    }

    pub fn force_reset_trigger_state(&mut self, id: VolumeId) {
        if let Some(volume) = self.volumes.get_mut(id.0) {
            volume.force_reset_trigger_state();
        }
    }

    pub fn force_reset_all(&mut self) {
        for volume in &mut self.volumes {
            volume.force_reset_trigger_state();
        }
    }

    pub fn set_active(&mut self, id: VolumeId, active: bool) {
        if let Some(volume) = self.volumes.get_mut(id.0) {
            volume.active = active;
        }
    }

    /// Switches every volume off and clears its state.
    pub fn deactivate_all(&mut self) {
        for volume in &mut self.volumes {
            volume.active = false;
            volume.force_reset_trigger_state();
        }
    }

    /// Resets and switches on exactly the given volumes; everything else goes off.
    pub fn activate_only(&mut self, ids: impl IntoIterator<Item = VolumeId>) {
        self.deactivate_all();
        for id in ids {
            self.set_active(id, true);
        }
    }
}
