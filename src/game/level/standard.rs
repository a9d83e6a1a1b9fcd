use bevy::prelude::*;

use super::{
    FEEDBACK_DELAY, INCORRECT_RESET_DELAY, LevelContext, LevelController, LevelSummary, LevelTask,
    ObjectiveScore,
    scoring::{MAX_SCORE, score_for_ratio},
};
use crate::game::{
    configs::ObjectiveConfig,
    stance::{SequenceReport, Stance, StanceResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectivePhase {
    AwaitStance,
    AwaitSequence,
    Feedback,
    Done,
}

/// Objectives in order: enter the stance, perform the drill, get scored.
///
/// In practice mode the stance is entered for the player and each drill is
/// repeated until it scores the top band.
pub struct StandardLevel {
    name: String,
    objectives: Vec<ObjectiveConfig>,
    practice: bool,
    current: usize,
    phase: ObjectivePhase,
    attempts: u32,
    scores: Vec<ObjectiveScore>,
}

impl StandardLevel {
    pub fn new(name: String, objectives: Vec<ObjectiveConfig>, practice: bool) -> Self {
        Self {
            name,
            objectives,
            practice,
            current: 0,
            phase: ObjectivePhase::AwaitStance,
            attempts: 0,
            scores: Vec::new(),
        }
    }

    fn objective(&self) -> Option<&ObjectiveConfig> {
        self.objectives.get(self.current)
    }

    fn begin_objective(&mut self, ctx: &mut LevelContext) {
        let Some(objective) = self.objectives.get(self.current) else {
            self.phase = ObjectivePhase::Done;
            ctx.feedback(format!("{} complete", self.name));
            ctx.finish();
            return;
        };

        self.attempts += 1;
        self.phase = ObjectivePhase::AwaitStance;
        // A stance entered while the last score was up went unanswered.
        ctx.clear_all_stances();
        ctx.feedback(format!(
            "Objective {}/{}: enter the {} stance",
            self.current + 1,
            self.objectives.len(),
            objective.stance
        ));
        if self.practice {
            ctx.enter_stance(&objective.stance, true);
        }
    }

    fn record(&mut self, score: ObjectiveScore) {
        match self.scores.get_mut(self.current) {
            Some(existing) => *existing = score,
            None => self.scores.push(score),
        }
    }
}

impl LevelController for StandardLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_level(&mut self, ctx: &mut LevelContext) {
        if self.objectives.is_empty() {
            warn!("Level '{}' has no objectives", self.name);
        }
        self.current = 0;
        self.attempts = 0;
        self.scores.clear();
        self.begin_objective(ctx);
    }

    fn on_stance_entered(&mut self, result: &StanceResult, ctx: &mut LevelContext) {
        if self.phase != ObjectivePhase::AwaitStance {
            return;
        }
        let Some(objective) = self.objective() else {
            return;
        };

        match result {
            StanceResult::Matched(name) if *name == objective.stance => {
                let sequence = objective.sequence.clone();
                self.phase = ObjectivePhase::AwaitSequence;
                ctx.feedback(format!("Perform {sequence}"));
            }
            _ => {
                ctx.feedback("Incorrect");
                ctx.after(INCORRECT_RESET_DELAY, LevelTask::ClearStances);
            }
        }
    }

    fn on_stance_changed(&mut self, from: &Stance, to: &Stance, ctx: &mut LevelContext) {
        if self.phase != ObjectivePhase::AwaitSequence || !to.is_default() {
            return;
        }
        let Some(objective) = self.objective() else {
            return;
        };
        if from.name() != Some(objective.stance.as_str()) {
            return;
        }

        // The stance timed out before the drill started.
        let stance = objective.stance.clone();
        self.phase = ObjectivePhase::AwaitStance;
        ctx.feedback(format!("Too slow, enter the {stance} stance again"));
        if self.practice {
            ctx.enter_stance(&stance, true);
        }
    }

    fn end_objective(&mut self, report: &SequenceReport, ctx: &mut LevelContext) {
        if self.phase != ObjectivePhase::AwaitSequence {
            return;
        }
        let Some(objective) = self.objective() else {
            return;
        };

        let on_target = report.stance == objective.stance && report.sequence == objective.sequence;
        let accuracy = if on_target { report.accuracy() } else { 0.0 };
        let score = score_for_ratio(accuracy);
        let entry = ObjectiveScore {
            stance: objective.stance.clone(),
            sequence: objective.sequence.clone(),
            score,
            accuracy,
            attempts: self.attempts,
        };

        if on_target {
            ctx.feedback(format!(
                "{}: {}/{} boxes, score {score}/{MAX_SCORE}",
                report.sequence, report.touched, report.total
            ));
        } else {
            ctx.feedback(format!(
                "Wrong drill: expected {}, got {}",
                objective.sequence, report.sequence
            ));
        }
        self.record(entry);
        self.phase = ObjectivePhase::Feedback;

        let task = if self.practice && score < MAX_SCORE {
            LevelTask::RetryObjective
        } else {
            LevelTask::NextObjective
        };
        ctx.after(FEEDBACK_DELAY, task);
    }

    fn on_task(&mut self, task: LevelTask, ctx: &mut LevelContext) {
        match task {
            LevelTask::NextObjective => {
                self.current += 1;
                self.attempts = 0;
                self.begin_objective(ctx);
            }
            LevelTask::RetryObjective => self.begin_objective(ctx),
            LevelTask::ClearStances => ctx.clear_all_stances(),
            LevelTask::PartnerStrike => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == ObjectivePhase::Done
    }

    fn summary(&self) -> LevelSummary {
        LevelSummary {
            level: self.name.clone(),
            scores: self.scores.clone(),
        }
    }
}
