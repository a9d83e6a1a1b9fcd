//! The stance state machine.
//!
//! One [`StanceMachine`] exists per training session. It owns the volume
//! registry, the current stance, the countdown and the running sequence.
//! Everything that happens is recorded as a [`StanceEvent`] which the plugin
//! forwards as a Bevy message once per frame.

use bevy::prelude::*;

use super::{
    catalog::{StanceCatalog, StanceDefinition},
    detector::{HandSide, VolumeId, VolumeRegistry},
    sequence::{AttackSequence, SequenceOutcome, SequenceReport, SequenceTracker},
};

/// Coarse stance the player is holding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Reflect)]
pub enum Stance {
    #[default]
    Default,
    Named(String),
}

impl Stance {
    pub fn name(&self) -> Option<&str> {
        match self {
            Stance::Default => None,
            Stance::Named(name) => Some(name),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Stance::Default)
    }

    /// Display label, `"Default"` for the neutral stance.
    pub fn label(&self) -> &str {
        self.name().unwrap_or("Default")
    }
}

/// Answer to a stance request, as seen by level controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StanceResult {
    Matched(String),
    Incorrect,
}

impl StanceResult {
    pub fn as_str(&self) -> &str {
        match self {
            StanceResult::Matched(name) => name,
            StanceResult::Incorrect => "Incorrect",
        }
    }
}

/// Everything the state machine reports to the rest of the game.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum StanceEvent {
    /// Outcome of a stance request (automatic or external)
    Entered(StanceResult),
    /// The current stance changed
    Changed { from: Stance, to: Stance },
    /// A drill's start pair was held and tracking began
    SequenceStarted { stance: String, sequence: String },
    /// A drill completed or timed out
    SequenceFinished(SequenceReport),
}

#[derive(Resource, Debug)]
pub struct StanceMachine {
    catalog: StanceCatalog,
    current: Stance,
    /// Seconds left before falling back to `Default`
    timer: f32,
    active_sequence: Option<SequenceTracker>,
    game_active: bool,
    practice_mode: bool,
    events: Vec<StanceEvent>,
}

impl StanceMachine {
    /// Creates an inactive machine. Call [`Self::set_game_active`] to start.
    pub fn new(mut catalog: StanceCatalog) -> Self {
        catalog.registry.deactivate_all();
        let timer = catalog.stance_timeout;
        Self {
            catalog,
            current: Stance::Default,
            timer,
            active_sequence: None,
            game_active: false,
            practice_mode: false,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn current_stance(&self) -> &Stance {
        &self.current
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn stance_timeout(&self) -> f32 {
        self.catalog.stance_timeout
    }

    pub fn active_sequence(&self) -> Option<&SequenceTracker> {
        self.active_sequence.as_ref()
    }

    /// Body volumes credited in the running sequence.
    pub fn touched_count(&self) -> usize {
        self.active_sequence.as_ref().map_or(0, |tracker| tracker.touched)
    }

    pub fn is_game_active(&self) -> bool {
        self.game_active
    }

    pub fn is_practice_mode(&self) -> bool {
        self.practice_mode
    }

    pub fn registry(&self) -> &VolumeRegistry {
        &self.catalog.registry
    }

    pub fn catalog(&self) -> &StanceCatalog {
        &self.catalog
    }

    /// Takes every event recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<StanceEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // CONTACTS
    // ========================================================================

    /// Forwards a sensor contact. A contact that completes a stance box set
    /// requests that stance.
    pub fn on_enter(&mut self, volume: VolumeId, side: HandSide) {
        if let Some(stance) = self.catalog.registry.on_enter(volume, side) {
            self.enter_stance(&stance, false);
        }
    }

    pub fn on_exit(&mut self, volume: VolumeId, side: HandSide) {
        self.catalog.registry.on_exit(volume, side);
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Starts or stops the session. Stopping returns to `Default` and clears
    /// every detector, since disabled colliders never report their exits.
    pub fn set_game_active(&mut self, active: bool) {
        if self.game_active == active {
            return;
        }
        self.game_active = active;

        if active {
            info!("Stance training started");
            self.return_to_default();
        } else {
            info!("Stance training stopped");
            self.active_sequence = None;
            self.return_to_default();
            self.catalog.registry.deactivate_all();
            // Nobody reads events between sessions.
            self.events.clear();
        }
    }

    /// Requests a stance by name.
    ///
    /// Only `Default` can transition. Re-entering the current stance does
    /// nothing; any other stance, or an unknown name, is answered with
    /// [`StanceResult::Incorrect`].
    pub fn enter_stance(&mut self, name: &str, practice: bool) {
        if !self.game_active {
            debug!("Ignoring stance request '{name}' while training is inactive");
            return;
        }

        let Some(definition) = self.catalog.stance(name) else {
            info!("Stance '{name}' is not configured");
            self.events.push(StanceEvent::Entered(StanceResult::Incorrect));
            return;
        };

        match &self.current {
            Stance::Named(current) if current == name => return,
            Stance::Named(current) => {
                info!("Stance '{name}' requested while holding '{current}'");
                self.events.push(StanceEvent::Entered(StanceResult::Incorrect));
                return;
            }
            Stance::Default => {}
        }

        let live = live_volumes_for(definition, &self.catalog.registry, practice);
        self.catalog.registry.activate_only(live);
        self.active_sequence = None;
        self.timer = self.catalog.stance_timeout;
        self.practice_mode = practice;

        let to = Stance::Named(name.to_string());
        let from = std::mem::replace(&mut self.current, to.clone());
        info!(
            "Entered stance '{name}'{}",
            if practice { " (practice)" } else { "" }
        );
        self.events
            .push(StanceEvent::Entered(StanceResult::Matched(name.to_string())));
        self.events.push(StanceEvent::Changed { from, to });
    }

    /// Drops any stance or running sequence and clears every detector.
    pub fn clear_all_stances(&mut self) {
        if self.active_sequence.take().is_some() {
            info!("Sequence abandoned by reset");
        }
        self.return_to_default();
        self.catalog.registry.force_reset_all();
    }

    /// Advances the countdown and runs the polling pass. Contacts for this
    /// frame must be delivered before calling this.
    pub fn tick(&mut self, delta_secs: f32) {
        if !self.game_active || self.current.is_default() {
            return;
        }

        self.timer -= delta_secs;
        if self.timer <= 0.0 {
            match self.active_sequence.take() {
                Some(tracker) => {
                    info!("Sequence '{}' timed out", tracker.sequence.name);
                    self.finish_sequence(tracker, SequenceOutcome::TimedOut);
                }
                None => info!("Stance '{}' timed out", self.current.label()),
            }
            self.return_to_default();
            return;
        }

        let Some(tracker) = self.active_sequence.as_mut() else {
            if let Some(sequence) = self.startable_sequence() {
                self.begin_sequence(sequence);
            }
            return;
        };

        let registry = &mut self.catalog.registry;
        if tracker.scan(registry) > 0 {
            debug!(
                "Sequence '{}': {}/{} boxes",
                tracker.sequence.name,
                tracker.touched,
                tracker.sequence.total()
            );
        }
        if !tracker.is_finished(registry) {
            return;
        }

        if let Some(tracker) = self.active_sequence.take() {
            self.finish_sequence(tracker, SequenceOutcome::Completed);
        }
        self.return_to_default();
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    /// First candidate of the current stance whose start pair is held.
    fn startable_sequence(&self) -> Option<AttackSequence> {
        let definition = self.catalog.stance(self.current.name()?)?;
        definition
            .sequences
            .iter()
            .find(|sequence| sequence.start_pair.is_held(&self.catalog.registry))
            .cloned()
    }

    fn begin_sequence(&mut self, sequence: AttackSequence) {
        let stance = self.current.label().to_string();
        self.catalog.registry.activate_only(sequence.live_volumes());
        self.timer = sequence.time_limit.unwrap_or(self.catalog.stance_timeout);

        info!("Sequence '{}' started in stance '{stance}'", sequence.name);
        self.events.push(StanceEvent::SequenceStarted {
            stance: stance.clone(),
            sequence: sequence.name.clone(),
        });
        self.active_sequence = Some(SequenceTracker::new(stance, sequence));
    }

    fn finish_sequence(&mut self, tracker: SequenceTracker, outcome: SequenceOutcome) {
        let report = tracker.report(outcome);
        info!(
            "Sequence '{}' finished ({:?}): {}/{} boxes",
            report.sequence, report.outcome, report.touched, report.total
        );
        self.events.push(StanceEvent::SequenceFinished(report));
    }

    /// Back to `Default` with only the stance boxes live.
    fn return_to_default(&mut self) {
        self.active_sequence = None;
        self.practice_mode = false;
        self.timer = self.catalog.stance_timeout;

        let stance_boxes = self.catalog.registry.all_stance_volumes().collect::<Vec<_>>();
        self.catalog.registry.activate_only(stance_boxes);

        let from = std::mem::take(&mut self.current);
        if !from.is_default() {
            info!("Stance '{}' -> Default", from.label());
            self.events.push(StanceEvent::Changed {
                from,
                to: Stance::Default,
            });
        }
    }
}

/// Volumes that go live when a stance is entered. Normal entry keeps the
/// stance boxes plus every start pair; practice entry only the start pairs.
fn live_volumes_for(
    definition: &StanceDefinition,
    registry: &VolumeRegistry,
    practice: bool,
) -> Vec<VolumeId> {
    let mut live = Vec::new();
    if !practice {
        live.extend_from_slice(registry.stance_volumes(&definition.name));
    }
    for sequence in &definition.sequences {
        live.extend(sequence.start_pair.ids());
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::configs::{SequenceConfig, StanceConfig, TrainingConfig, VolumeConfig};

    fn test_config() -> TrainingConfig {
        let checkpoint = |name: &str| VolumeConfig::checkpoint(name, [0.0; 3]);
        TrainingConfig {
            stance_timeout: 2.0,
            volumes: vec![
                VolumeConfig::stance_box("ready_l", "Ready", [0.0; 3]),
                VolumeConfig::stance_box("ready_r", "Ready", [0.0; 3]),
                VolumeConfig::stance_box("guard_l", "Guard", [0.0; 3]),
                VolumeConfig::stance_box("guard_r", "Guard", [0.0; 3]),
                checkpoint("start_l"),
                checkpoint("start_r"),
                checkpoint("s1"),
                checkpoint("s2"),
                checkpoint("s3"),
                checkpoint("end_l"),
                checkpoint("end_r"),
            ],
            stances: vec![
                StanceConfig {
                    name: "Ready".into(),
                    sequences: vec![SequenceConfig {
                        name: "Abaniko".into(),
                        start: ("start_l".into(), "start_r".into()),
                        body: vec!["s1".into(), "s2".into(), "s3".into()],
                        end: ("end_l".into(), "end_r".into()),
                        time_limit: None,
                    }],
                },
                StanceConfig {
                    name: "Guard".into(),
                    sequences: vec![],
                },
            ],
            levels: vec![],
        }
    }

    fn machine() -> StanceMachine {
        let catalog = StanceCatalog::from_config(&test_config()).unwrap();
        let mut machine = StanceMachine::new(catalog);
        machine.set_game_active(true);
        machine
    }

    fn id(machine: &StanceMachine, name: &str) -> VolumeId {
        machine.registry().id(name).unwrap()
    }

    fn touch(machine: &mut StanceMachine, name: &str, side: HandSide) {
        let volume = id(machine, name);
        machine.on_enter(volume, side);
    }

    fn release(machine: &mut StanceMachine, name: &str, side: HandSide) {
        let volume = id(machine, name);
        machine.on_exit(volume, side);
    }

    fn enter_ready(machine: &mut StanceMachine) {
        touch(machine, "ready_l", HandSide::Left);
        touch(machine, "ready_r", HandSide::Right);
        assert_eq!(machine.current_stance(), &Stance::Named("Ready".into()));
    }

    fn start_abaniko(machine: &mut StanceMachine) {
        enter_ready(machine);
        touch(machine, "start_l", HandSide::Left);
        touch(machine, "start_r", HandSide::Right);
        machine.tick(0.1);
        assert!(machine.active_sequence().is_some());
    }

    fn finished_reports(machine: &mut StanceMachine) -> Vec<SequenceReport> {
        machine
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                StanceEvent::SequenceFinished(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stance_entry_requires_full_coverage() {
        let mut machine = machine();

        touch(&mut machine, "ready_l", HandSide::Left);
        assert!(machine.current_stance().is_default());

        release(&mut machine, "ready_l", HandSide::Left);
        touch(&mut machine, "ready_r", HandSide::Right);
        assert!(machine.current_stance().is_default());

        touch(&mut machine, "ready_l", HandSide::Left);
        assert_eq!(machine.current_stance(), &Stance::Named("Ready".into()));
        assert!(machine.drain_events().contains(&StanceEvent::Entered(
            StanceResult::Matched("Ready".into())
        )));
    }

    #[test]
    fn test_reentry_is_a_noop() {
        let mut machine = machine();
        start_abaniko(&mut machine);
        touch(&mut machine, "s1", HandSide::Right);
        machine.tick(0.5);
        machine.drain_events();

        let timer = machine.timer();
        machine.enter_stance("Ready", false);

        assert_eq!(machine.timer(), timer);
        assert_eq!(machine.touched_count(), 1);
        assert_eq!(
            machine.active_sequence().map(|t| t.sequence.name.as_str()),
            Some("Abaniko")
        );
        assert!(machine.drain_events().is_empty());
    }

    #[test]
    fn test_unknown_or_mismatched_stance_is_incorrect() {
        let mut machine = machine();

        machine.enter_stance("Sinawali", false);
        assert!(machine.current_stance().is_default());
        assert_eq!(
            machine.drain_events(),
            vec![StanceEvent::Entered(StanceResult::Incorrect)]
        );

        enter_ready(&mut machine);
        machine.drain_events();
        machine.enter_stance("Guard", false);
        assert_eq!(machine.current_stance(), &Stance::Named("Ready".into()));
        assert_eq!(
            machine.drain_events(),
            vec![StanceEvent::Entered(StanceResult::Incorrect)]
        );
    }

    #[test]
    fn test_swapped_start_pair_does_not_start() {
        let mut machine = machine();
        enter_ready(&mut machine);

        touch(&mut machine, "start_l", HandSide::Right);
        touch(&mut machine, "start_r", HandSide::Left);
        machine.tick(0.1);
        assert!(machine.active_sequence().is_none());

        touch(&mut machine, "start_l", HandSide::Left);
        touch(&mut machine, "start_r", HandSide::Right);
        machine.tick(0.1);
        assert!(machine.active_sequence().is_some());
    }

    #[test]
    fn test_sequence_start_resets_timer_and_live_volumes() {
        let mut machine = machine();
        enter_ready(&mut machine);
        machine.tick(1.0);
        touch(&mut machine, "start_l", HandSide::Left);
        touch(&mut machine, "start_r", HandSide::Right);
        machine.tick(0.1);

        assert_eq!(machine.timer(), machine.stance_timeout());
        let registry = machine.registry();
        assert!(registry.get(id(&machine, "s1")).unwrap().active);
        assert!(registry.get(id(&machine, "end_r")).unwrap().active);
        assert!(!registry.get(id(&machine, "ready_l")).unwrap().active);
        assert!(!registry.get(id(&machine, "start_l")).unwrap().active);
    }

    #[test]
    fn test_sequence_completes_with_partial_coverage() {
        let mut machine = machine();
        start_abaniko(&mut machine);

        touch(&mut machine, "s3", HandSide::Right);
        machine.tick(0.1);
        touch(&mut machine, "s1", HandSide::Left);
        machine.tick(0.1);
        touch(&mut machine, "end_l", HandSide::Left);
        touch(&mut machine, "end_r", HandSide::Right);
        machine.tick(0.1);

        let reports = finished_reports(&mut machine);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].touched, 2);
        assert_eq!(reports[0].total, 3);
        assert_eq!(reports[0].outcome, SequenceOutcome::Completed);
        assert!(machine.current_stance().is_default());
        assert!(machine.active_sequence().is_none());
    }

    #[test]
    fn test_timeout_resets_to_default() {
        let mut machine = machine();
        enter_ready(&mut machine);

        for _ in 0..4 {
            machine.tick(0.5);
        }

        assert!(machine.current_stance().is_default());
        assert!(machine.active_sequence().is_none());
        assert_eq!(machine.touched_count(), 0);
    }

    #[test]
    fn test_sequence_timeout_still_reports_credit() {
        let mut machine = machine();
        start_abaniko(&mut machine);
        touch(&mut machine, "s2", HandSide::Left);
        machine.tick(0.1);
        machine.drain_events();

        machine.tick(5.0);

        let reports = finished_reports(&mut machine);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].touched, 1);
        assert_eq!(reports[0].outcome, SequenceOutcome::TimedOut);
        assert!(machine.current_stance().is_default());
        assert_eq!(machine.touched_count(), 0);
    }

    #[test]
    fn test_practice_entry_only_arms_start_pairs() {
        let mut machine = machine();
        machine.enter_stance("Ready", true);

        assert!(machine.is_practice_mode());
        let registry = machine.registry();
        assert!(registry.get(id(&machine, "start_l")).unwrap().active);
        assert!(!registry.get(id(&machine, "ready_l")).unwrap().active);
    }

    #[test]
    fn test_clear_all_stances_resets_everything() {
        let mut machine = machine();
        start_abaniko(&mut machine);
        touch(&mut machine, "s1", HandSide::Left);
        machine.tick(0.1);
        machine.drain_events();

        machine.clear_all_stances();

        assert!(machine.current_stance().is_default());
        assert!(machine.active_sequence().is_none());
        assert!(machine.registry().iter().all(|(_, v)| !v.is_occupied() && !v.completed));
        assert!(finished_reports(&mut machine).is_empty());
    }

    #[test]
    fn test_stopping_clears_stale_occupancy() {
        let mut machine = machine();
        touch(&mut machine, "ready_l", HandSide::Left);

        machine.set_game_active(false);

        let volume = machine.registry().get(id(&machine, "ready_l")).unwrap();
        assert!(!volume.left_occupied);
        assert!(!volume.active);
    }

    #[test]
    fn test_stopping_mid_stance_leaves_no_events() {
        let mut machine = machine();
        enter_ready(&mut machine);
        machine.drain_events();

        machine.set_game_active(false);
        assert!(machine.drain_events().is_empty());

        machine.set_game_active(true);
        assert!(machine.drain_events().is_empty());
    }

    #[test]
    fn test_inactive_machine_ignores_requests() {
        let catalog = StanceCatalog::from_config(&test_config()).unwrap();
        let mut machine = StanceMachine::new(catalog);

        machine.enter_stance("Ready", false);
        machine.tick(1.0);

        assert!(machine.current_stance().is_default());
        assert!(machine.drain_events().is_empty());
    }
}
