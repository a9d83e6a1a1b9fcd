//! Level flow: objectives, scoring and feedback on top of the stance machine.
//!
//! A level never mutates the [`StanceMachine`] itself. Controllers push
//! [`LevelCommand`]s into a [`LevelContext`] and [`drive_level`] applies them,
//! so the machine keeps a single owner within the frame.

pub mod schedule;
pub mod scoring;
mod spar;
mod standard;
mod tutorial;

use bevy::prelude::*;

use crate::{
    game::{
        accuracy::SessionAccuracy,
        configs::{LevelConfig, LevelKind, TrainingConfig},
        stance::{
            SequenceReport, Stance, StanceEvent, StanceMachine, StanceResult, StanceSystems,
            activate_stance_training,
        },
    },
    screens::Screen,
};

pub use schedule::TaskScheduler;
pub use scoring::{MAX_SCORE, score_for_ratio};
pub use spar::SparLevel;
pub use standard::StandardLevel;
pub use tutorial::TutorialLevel;

/// Seconds a score or hint stays up before the level moves on
pub const FEEDBACK_DELAY: f32 = 2.0;
/// Seconds before a wrong stance is cleared
pub const INCORRECT_RESET_DELAY: f32 = 1.5;
/// Seconds the sparring partner telegraphs an attack
pub const PARTNER_WINDUP: f32 = 1.5;

pub(super) fn plugin(app: &mut App) {
    app.add_message::<LevelFeedback>();
    app.init_resource::<LastLevelSummary>();

    app.add_systems(
        Update,
        init_level_queue.run_if(resource_added::<StanceMachine>),
    );
    app.add_systems(
        OnEnter(Screen::Gameplay),
        start_level.after(activate_stance_training),
    );
    app.add_systems(OnExit(Screen::Gameplay), stop_level);
    app.add_systems(
        Update,
        drive_level
            .after(StanceSystems::Publish)
            .run_if(in_state(Screen::Gameplay))
            .run_if(resource_exists::<ActiveLevel>)
            .run_if(resource_exists::<StanceMachine>),
    );
}

// ============================================================================
// CONTROLLER INTERFACE
// ============================================================================

/// Follow-up work a level schedules for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelTask {
    NextObjective,
    RetryObjective,
    ClearStances,
    PartnerStrike,
}

/// Requests a level makes of the game.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelCommand {
    EnterStance { stance: String, practice: bool },
    ClearAllStances,
    After { delay: f32, task: LevelTask },
    Feedback(String),
    Finish,
}

/// Collects the commands a controller issues while handling one callback.
#[derive(Debug, Default)]
pub struct LevelContext {
    pub commands: Vec<LevelCommand>,
}

impl LevelContext {
    pub fn enter_stance(&mut self, stance: &str, practice: bool) {
        self.commands.push(LevelCommand::EnterStance {
            stance: stance.to_string(),
            practice,
        });
    }

    pub fn clear_all_stances(&mut self) {
        self.commands.push(LevelCommand::ClearAllStances);
    }

    pub fn after(&mut self, delay: f32, task: LevelTask) {
        self.commands.push(LevelCommand::After { delay, task });
    }

    pub fn feedback(&mut self, text: impl Into<String>) {
        self.commands.push(LevelCommand::Feedback(text.into()));
    }

    pub fn finish(&mut self) {
        self.commands.push(LevelCommand::Finish);
    }
}

/// Result of one objective (or sparring round).
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveScore {
    pub stance: String,
    pub sequence: String,
    pub score: u8,
    pub accuracy: f32,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelSummary {
    pub level: String,
    pub scores: Vec<ObjectiveScore>,
}

impl LevelSummary {
    pub fn total_score(&self) -> u32 {
        self.scores.iter().map(|s| u32::from(s.score)).sum()
    }

    pub fn max_score(&self) -> u32 {
        self.scores.len() as u32 * u32::from(MAX_SCORE)
    }
}

/// A kind of level. Implementations react to the stance machine and steer
/// the player through their objectives.
pub trait LevelController: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn start_level(&mut self, ctx: &mut LevelContext);

    /// A stance request was answered, with the stance name or `Incorrect`.
    fn on_stance_entered(&mut self, result: &StanceResult, ctx: &mut LevelContext);

    fn on_stance_changed(&mut self, _from: &Stance, _to: &Stance, _ctx: &mut LevelContext) {}

    /// A drill finished (completed or timed out).
    fn end_objective(&mut self, report: &SequenceReport, ctx: &mut LevelContext);

    fn on_task(&mut self, task: LevelTask, ctx: &mut LevelContext);

    fn is_finished(&self) -> bool;

    fn summary(&self) -> LevelSummary;
}

/// Builds the controller for a configured level.
pub fn build_level(config: &LevelConfig) -> Box<dyn LevelController> {
    match &config.kind {
        LevelKind::Standard => Box::new(StandardLevel::new(
            config.name.clone(),
            config.objectives.clone(),
            config.practice,
        )),
        LevelKind::Tutorial => Box::new(TutorialLevel::new(
            config.name.clone(),
            config.objectives.clone(),
        )),
        LevelKind::Spar { rounds, seed } => Box::new(SparLevel::new(
            config.name.clone(),
            config.objectives.clone(),
            *rounds,
            *seed,
        )),
    }
}

/// Feeds one stance event to a controller.
pub fn dispatch_event(
    controller: &mut dyn LevelController,
    event: &StanceEvent,
    ctx: &mut LevelContext,
) {
    match event {
        StanceEvent::Entered(result) => controller.on_stance_entered(result, ctx),
        StanceEvent::Changed { from, to } => controller.on_stance_changed(from, to, ctx),
        StanceEvent::SequenceFinished(report) => controller.end_objective(report, ctx),
        StanceEvent::SequenceStarted { .. } => {}
    }
}

// ============================================================================
// RESOURCES
// ============================================================================

/// The level being played.
#[derive(Resource)]
pub struct ActiveLevel {
    pub controller: Box<dyn LevelController>,
    pub tasks: TaskScheduler<LevelTask>,
}

/// Configured levels and which one plays next.
#[derive(Resource, Debug, Default)]
pub struct LevelQueue {
    pub levels: Vec<LevelConfig>,
    pub current: usize,
}

impl LevelQueue {
    pub fn current(&self) -> Option<&LevelConfig> {
        self.levels.get(self.current)
    }

    /// Moves to the next level, wrapping back to the first one.
    pub fn advance(&mut self) {
        if !self.levels.is_empty() {
            self.current = (self.current + 1) % self.levels.len();
        }
    }
}

#[derive(Resource, Debug, Default)]
pub struct LastLevelSummary(pub Option<LevelSummary>);

/// Score and hint lines for the HUD.
#[derive(Message, Debug, Clone)]
pub struct LevelFeedback(pub String);

// ============================================================================
// SYSTEMS
// ============================================================================

/// Queues the configured levels, keeping only objectives the catalogue can play.
fn init_level_queue(
    mut commands: Commands,
    config: Res<TrainingConfig>,
    machine: Res<StanceMachine>,
) {
    if config.levels.is_empty() {
        warn!("No levels configured, gameplay runs as free practice");
    }
    commands.insert_resource(LevelQueue {
        levels: machine.catalog().playable_levels(&config.levels),
        current: 0,
    });
}

fn start_level(
    mut commands: Commands,
    queue: Option<Res<LevelQueue>>,
    machine: Option<ResMut<StanceMachine>>,
    mut accuracy: ResMut<SessionAccuracy>,
    mut feedback: MessageWriter<LevelFeedback>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    accuracy.reset();

    let Some(level) = queue.as_ref().and_then(|queue| queue.current()) else {
        return;
    };
    let Some(mut machine) = machine else {
        warn!("Level '{}' needs a stance catalogue, none is loaded", level.name);
        return;
    };

    info!("Starting level '{}'", level.name);
    let mut controller = build_level(level);
    let mut tasks = TaskScheduler::new();
    let mut ctx = LevelContext::default();
    controller.start_level(&mut ctx);
    let finished = apply_commands(ctx, &mut machine, &mut tasks, &mut feedback);
    if finished {
        next_screen.set(Screen::Summary);
    }

    commands.insert_resource(ActiveLevel { controller, tasks });
}

fn stop_level(
    mut commands: Commands,
    level: Option<Res<ActiveLevel>>,
    mut summary: ResMut<LastLevelSummary>,
) {
    if let Some(level) = level {
        summary.0 = Some(level.controller.summary());
    }
    commands.remove_resource::<ActiveLevel>();
}

/// Routes stance events and due tasks to the controller and applies what it asks for.
pub fn drive_level(
    time: Res<Time>,
    mut events: MessageReader<StanceEvent>,
    mut level: ResMut<ActiveLevel>,
    mut machine: ResMut<StanceMachine>,
    mut feedback: MessageWriter<LevelFeedback>,
    mut next_screen: ResMut<NextState<Screen>>,
) {
    let ActiveLevel { controller, tasks } = &mut *level;
    let mut ctx = LevelContext::default();

    for event in events.read() {
        dispatch_event(controller.as_mut(), event, &mut ctx);
    }
    for task in tasks.advance(time.delta_secs()) {
        controller.on_task(task, &mut ctx);
    }

    if apply_commands(ctx, &mut machine, tasks, &mut feedback) {
        info!("Level '{}' finished", controller.name());
        next_screen.set(Screen::Summary);
    }
}

/// Applies queued commands in order. Returns true if the level asked to finish.
fn apply_commands(
    ctx: LevelContext,
    machine: &mut StanceMachine,
    tasks: &mut TaskScheduler<LevelTask>,
    feedback: &mut MessageWriter<LevelFeedback>,
) -> bool {
    let mut finished = false;
    for command in ctx.commands {
        match command {
            LevelCommand::EnterStance { stance, practice } => {
                machine.enter_stance(&stance, practice);
            }
            LevelCommand::ClearAllStances => machine.clear_all_stances(),
            LevelCommand::After { delay, task } => {
                tasks.schedule(delay, task);
            }
            LevelCommand::Feedback(text) => {
                info!("{text}");
                feedback.write(LevelFeedback(text));
            }
            LevelCommand::Finish => {
                tasks.cancel_all();
                finished = true;
            }
        }
    }
    finished
}
