use super::{
    FEEDBACK_DELAY, INCORRECT_RESET_DELAY, LevelContext, LevelController, LevelSummary, LevelTask,
};
use crate::game::{
    configs::ObjectiveConfig,
    stance::{SequenceReport, Stance, StanceResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ShowStance,
    ShowSequence,
    Wait,
    Done,
}

/// Guided walkthrough. Every step shows its hint, nothing is scored and any
/// finished drill moves on.
pub struct TutorialLevel {
    name: String,
    steps: Vec<ObjectiveConfig>,
    current: usize,
    step: Step,
}

impl TutorialLevel {
    pub fn new(name: String, steps: Vec<ObjectiveConfig>) -> Self {
        Self {
            name,
            steps,
            current: 0,
            step: Step::ShowStance,
        }
    }

    fn show_stance(&mut self, ctx: &mut LevelContext) {
        let Some(step) = self.steps.get(self.current) else {
            self.step = Step::Done;
            ctx.feedback("Tutorial complete");
            ctx.finish();
            return;
        };

        self.step = Step::ShowStance;
        match &step.hint {
            Some(hint) => ctx.feedback(format!("Enter the {} stance. {hint}", step.stance)),
            None => ctx.feedback(format!("Enter the {} stance", step.stance)),
        }
    }
}

impl LevelController for TutorialLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_level(&mut self, ctx: &mut LevelContext) {
        self.current = 0;
        ctx.clear_all_stances();
        self.show_stance(ctx);
    }

    fn on_stance_entered(&mut self, result: &StanceResult, ctx: &mut LevelContext) {
        if self.step != Step::ShowStance {
            return;
        }
        let Some(step) = self.steps.get(self.current) else {
            return;
        };

        if result.as_str() == step.stance {
            ctx.feedback(format!(
                "Good. Touch the start boxes and perform {}",
                step.sequence
            ));
            self.step = Step::ShowSequence;
        } else {
            ctx.feedback("Not quite, try again");
            ctx.after(INCORRECT_RESET_DELAY, LevelTask::ClearStances);
        }
    }

    fn on_stance_changed(&mut self, from: &Stance, to: &Stance, ctx: &mut LevelContext) {
        let expected = self.steps.get(self.current).map(|step| step.stance.as_str());
        if self.step == Step::ShowSequence && to.is_default() && from.name() == expected {
            self.show_stance(ctx);
        }
    }

    fn end_objective(&mut self, report: &SequenceReport, ctx: &mut LevelContext) {
        if self.step != Step::ShowSequence {
            return;
        }
        ctx.feedback(format!(
            "{} done, {} of {} boxes touched",
            report.sequence, report.touched, report.total
        ));
        self.step = Step::Wait;
        ctx.after(FEEDBACK_DELAY, LevelTask::NextObjective);
    }

    fn on_task(&mut self, task: LevelTask, ctx: &mut LevelContext) {
        match task {
            LevelTask::NextObjective => {
                self.current += 1;
                // Drop anything entered while the last message was up.
                ctx.clear_all_stances();
                self.show_stance(ctx);
            }
            LevelTask::ClearStances => ctx.clear_all_stances(),
            LevelTask::RetryObjective | LevelTask::PartnerStrike => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.step == Step::Done
    }

    fn summary(&self) -> LevelSummary {
        LevelSummary {
            level: self.name.clone(),
            scores: Vec::new(),
        }
    }
}
