use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use avian3d::prelude::*;
use bevy::prelude::*;

use super::{
    catalog::StanceCatalog,
    detector::{HandSide, VolumeId},
    machine::{StanceEvent, StanceMachine},
};
use crate::game::configs::TrainingConfig;

/// Links a sensor collider to its volume in the registry
#[derive(Component, Debug, Clone, Copy)]
pub struct TriggerVolumeSensor {
    pub id: VolumeId,
}

/// A baton tip. Only colliders carrying this count as hands.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandProxy(pub HandSide);

/// Builds the session's machine once the training config is available.
pub(super) fn init_stance_machine(mut commands: Commands, config: Res<TrainingConfig>) {
    let catalog = match StanceCatalog::from_config(&config) {
        Ok(catalog) => catalog,
        Err(error) => {
            error!("Training config rejected: {error:#}, using the built-in catalogue");
            match StanceCatalog::from_config(&TrainingConfig::default()) {
                Ok(catalog) => catalog,
                Err(error) => {
                    error!("Built-in catalogue rejected: {error:#}");
                    return;
                }
            }
        }
    };

    info!(
        "Stance catalogue ready: {} stances, {} volumes",
        catalog.stances.len(),
        catalog.registry.len()
    );
    commands.insert_resource(StanceMachine::new(catalog));
}

pub fn activate_stance_training(mut machine: ResMut<StanceMachine>) {
    machine.set_game_active(true);
}

pub(super) fn deactivate_stance_training(mut machine: ResMut<StanceMachine>) {
    machine.set_game_active(false);
}

/// Works out which side of a contact pair is the volume and which the hand.
fn resolve_contact(
    a: Entity,
    b: Entity,
    sensors: &Query<&TriggerVolumeSensor>,
    hands: &Query<&HandProxy>,
) -> Option<(VolumeId, HandSide)> {
    if let (Ok(sensor), Ok(hand)) = (sensors.get(a), hands.get(b)) {
        return Some((sensor.id, hand.0));
    }
    if let (Ok(sensor), Ok(hand)) = (sensors.get(b), hands.get(a)) {
        return Some((sensor.id, hand.0));
    }
    None
}

/// Start and end counts for one (volume, hand) pair within a frame.
#[derive(Debug, Default, Clone, Copy)]
struct ContactTally {
    starts: u32,
    ends: u32,
}

impl ContactTally {
    /// Whether the pair is touching after this frame. Starts and ends of a
    /// pair alternate, so equal counts bring it back to where it was.
    fn settle(self, was_touching: bool) -> bool {
        match self.starts.cmp(&self.ends) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => was_touching,
        }
    }
}

/// Forwards sensor contacts to the machine.
///
/// Start and end messages arrive in separate queues, so several physics steps
/// in one frame lose their interleaving. Each pair is settled from its counts
/// and the contacts seen so far, then exits go first so a baton sliding from
/// one box into the next never counts as being in both.
pub(super) fn route_trigger_contacts(
    mut started: MessageReader<CollisionStart>,
    mut ended: MessageReader<CollisionEnd>,
    sensors: Query<&TriggerVolumeSensor>,
    hands: Query<&HandProxy>,
    mut touching: Local<HashSet<(VolumeId, HandSide)>>,
    mut machine: ResMut<StanceMachine>,
) {
    let mut tallies: HashMap<(VolumeId, HandSide), ContactTally> = HashMap::new();
    for contact in started.read() {
        if let Some(pair) = resolve_contact(contact.collider1, contact.collider2, &sensors, &hands)
        {
            tallies.entry(pair).or_default().starts += 1;
        }
    }
    for contact in ended.read() {
        if let Some(pair) = resolve_contact(contact.collider1, contact.collider2, &sensors, &hands)
        {
            tallies.entry(pair).or_default().ends += 1;
        }
    }
    if tallies.is_empty() {
        return;
    }

    let mut entered = Vec::new();
    let mut exited = Vec::new();
    for (pair, tally) in tallies {
        if tally.settle(touching.contains(&pair)) {
            touching.insert(pair);
            entered.push(pair);
        } else {
            touching.remove(&pair);
            exited.push(pair);
        }
    }
    // Stable order keeps stance checks deterministic.
    entered.sort();
    exited.sort();

    for (volume, side) in exited {
        machine.on_exit(volume, side);
    }
    for (volume, side) in entered {
        machine.on_enter(volume, side);
    }
}

pub(super) fn tick_stance_machine(time: Res<Time>, mut machine: ResMut<StanceMachine>) {
    machine.tick(time.delta_secs());
}

pub(super) fn publish_stance_events(
    mut machine: ResMut<StanceMachine>,
    mut writer: MessageWriter<StanceEvent>,
) {
    for event in machine.drain_events() {
        debug!("{event:?}");
        writer.write(event);
    }
}

/// Mirrors the registry's active flags onto the sensor colliders.
pub(super) fn sync_volume_colliders(
    mut commands: Commands,
    machine: Res<StanceMachine>,
    sensors: Query<(Entity, &TriggerVolumeSensor, Has<ColliderDisabled>)>,
) {
    if !machine.is_changed() {
        return;
    }
    for (entity, sensor, disabled) in &sensors {
        let active = machine
            .registry()
            .get(sensor.id)
            .is_some_and(|volume| volume.active);
        match (active, disabled) {
            (true, true) => {
                commands.entity(entity).remove::<ColliderDisabled>();
            }
            (false, false) => {
                commands.entity(entity).insert(ColliderDisabled);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::stance::{Stance, StanceResult};

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_message::<StanceEvent>();
        app.add_message::<CollisionStart>();
        app.add_message::<CollisionEnd>();
        app.insert_resource(TrainingConfig::default());
        app.add_systems(Update, init_stance_machine.run_if(resource_added::<TrainingConfig>));
        app.update();
        app
    }

    fn spawn_sensor(app: &mut App, name: &str) -> Entity {
        let id = app
            .world()
            .resource::<StanceMachine>()
            .registry()
            .id(name)
            .unwrap();
        app.world_mut().spawn(TriggerVolumeSensor { id }).id()
    }

    fn touch(app: &mut App, sensor: Entity, hand: Entity) {
        app.world_mut().write_message(CollisionStart {
            collider1: hand,
            collider2: sensor,
            body1: Some(hand),
            body2: None,
        });
    }

    fn release(app: &mut App, sensor: Entity, hand: Entity) {
        app.world_mut().write_message(CollisionEnd {
            collider1: sensor,
            collider2: hand,
            body1: None,
            body2: Some(hand),
        });
    }

    fn left_in_ready_left(app: &App) -> bool {
        let registry = app.world().resource::<StanceMachine>().registry();
        let id = registry.id("ready_left").unwrap();
        registry.occupied_by(id, HandSide::Left)
    }

    fn contact_app() -> (App, Entity, Entity) {
        let mut app = app();
        app.add_systems(Update, route_trigger_contacts);
        app.world_mut()
            .resource_mut::<StanceMachine>()
            .set_game_active(true);
        let hand = app.world_mut().spawn(HandProxy(HandSide::Left)).id();
        let sensor = spawn_sensor(&mut app, "ready_left");
        (app, hand, sensor)
    }

    #[test]
    fn test_touch_and_leave_in_one_frame_leaves_box_empty() {
        let (mut app, hand, sensor) = contact_app();
        touch(&mut app, sensor, hand);
        release(&mut app, sensor, hand);
        app.update();

        assert!(!left_in_ready_left(&app));
    }

    #[test]
    fn test_leave_and_return_in_one_frame_keeps_box_occupied() {
        let (mut app, hand, sensor) = contact_app();
        touch(&mut app, sensor, hand);
        app.update();
        assert!(left_in_ready_left(&app));

        release(&mut app, sensor, hand);
        touch(&mut app, sensor, hand);
        app.update();
        assert!(left_in_ready_left(&app));

        release(&mut app, sensor, hand);
        app.update();
        assert!(!left_in_ready_left(&app));
    }

    #[test]
    fn test_contacts_enter_stance() {
        let mut app = app();
        app.add_systems(
            Update,
            (route_trigger_contacts, publish_stance_events).chain(),
        );
        app.world_mut()
            .resource_mut::<StanceMachine>()
            .set_game_active(true);

        let left = app.world_mut().spawn(HandProxy(HandSide::Left)).id();
        let right = app.world_mut().spawn(HandProxy(HandSide::Right)).id();
        let ready_left = spawn_sensor(&mut app, "ready_left");
        let ready_right = spawn_sensor(&mut app, "ready_right");

        touch(&mut app, ready_left, left);
        touch(&mut app, ready_right, right);
        app.update();

        let machine = app.world().resource::<StanceMachine>();
        assert_eq!(machine.current_stance(), &Stance::Named("Ready".into()));

        let messages = app.world().resource::<Messages<StanceEvent>>();
        let mut cursor = messages.get_cursor();
        let events: Vec<_> = cursor.read(messages).cloned().collect();
        assert!(events.contains(&StanceEvent::Entered(StanceResult::Matched("Ready".into()))));
    }

    #[test]
    fn test_contacts_without_hand_are_ignored() {
        let mut app = app();
        app.add_systems(Update, route_trigger_contacts);
        app.world_mut()
            .resource_mut::<StanceMachine>()
            .set_game_active(true);

        let stray = app.world_mut().spawn_empty().id();
        let ready_left = spawn_sensor(&mut app, "ready_left");
        touch(&mut app, ready_left, stray);
        app.update();

        let machine = app.world().resource::<StanceMachine>();
        let id = machine.registry().id("ready_left").unwrap();
        assert!(!machine.registry().is_occupied(id));
    }

    #[test]
    fn test_inactive_volumes_get_disabled_colliders() {
        let mut app = app();
        app.add_systems(Update, sync_volume_colliders);
        let ready_left = spawn_sensor(&mut app, "ready_left");
        let strike = spawn_sensor(&mut app, "strike_1");

        app.world_mut()
            .resource_mut::<StanceMachine>()
            .set_game_active(true);
        app.update();
        app.update();

        assert!(app.world().get::<ColliderDisabled>(ready_left).is_none());
        assert!(app.world().get::<ColliderDisabled>(strike).is_some());
    }
}
