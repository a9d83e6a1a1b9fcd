use bevy::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    FEEDBACK_DELAY, LevelContext, LevelController, LevelSummary, LevelTask, ObjectiveScore,
    PARTNER_WINDUP,
    scoring::{MAX_SCORE, score_for_ratio},
};
use crate::game::{
    configs::ObjectiveConfig,
    stance::{SequenceReport, Stance, StanceResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SparPhase {
    /// Partner is telegraphing the attack
    Windup,
    /// Waiting for the machine to confirm the answering stance
    Striking,
    /// Player is in the answering stance and must run the drill
    Responding,
    Between,
    Done,
}

/// Rounds against a sparring partner. Each round the partner picks an attack,
/// telegraphs it, and the player is dropped straight into the answering
/// stance to perform the counter drill.
pub struct SparLevel {
    name: String,
    pool: Vec<ObjectiveConfig>,
    rounds: u32,
    round: u32,
    rng: StdRng,
    current: Option<ObjectiveConfig>,
    phase: SparPhase,
    /// The answering stance was already forced again this round
    reforced: bool,
    scores: Vec<ObjectiveScore>,
}

impl SparLevel {
    pub fn new(name: String, pool: Vec<ObjectiveConfig>, rounds: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            name,
            pool,
            rounds,
            round: 0,
            rng,
            current: None,
            phase: SparPhase::Between,
            reforced: false,
            scores: Vec::new(),
        }
    }

    fn start_round(&mut self, ctx: &mut LevelContext) {
        if self.round >= self.rounds || self.pool.is_empty() {
            self.phase = SparPhase::Done;
            self.current = None;
            let summary = self.summary();
            ctx.feedback(format!(
                "Spar over: {}/{} points",
                summary.total_score(),
                summary.max_score()
            ));
            ctx.finish();
            return;
        }

        self.round += 1;
        let pick = self.pool[self.rng.random_range(0..self.pool.len())].clone();
        ctx.feedback(format!(
            "Round {}/{}: partner attacks, answer with {} from {}",
            self.round, self.rounds, pick.sequence, pick.stance
        ));
        self.current = Some(pick);
        self.phase = SparPhase::Windup;
        ctx.after(PARTNER_WINDUP, LevelTask::PartnerStrike);
    }

    fn score_round(&mut self, accuracy: f32, ctx: &mut LevelContext) {
        let Some(objective) = &self.current else {
            return;
        };
        let score = score_for_ratio(accuracy);
        self.scores.push(ObjectiveScore {
            stance: objective.stance.clone(),
            sequence: objective.sequence.clone(),
            score,
            accuracy,
            attempts: 1,
        });
        ctx.feedback(format!("Round {}: score {score}/{MAX_SCORE}", self.round));
        self.phase = SparPhase::Between;
        ctx.after(FEEDBACK_DELAY, LevelTask::NextObjective);
    }
}

impl LevelController for SparLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_level(&mut self, ctx: &mut LevelContext) {
        if self.pool.is_empty() {
            warn!("Spar '{}' has no attacks to pick from", self.name);
        }
        self.round = 0;
        self.scores.clear();
        self.start_round(ctx);
    }

    fn on_stance_entered(&mut self, result: &StanceResult, ctx: &mut LevelContext) {
        if self.phase != SparPhase::Striking {
            return;
        }
        let Some(objective) = &self.current else {
            return;
        };
        match result {
            StanceResult::Matched(name) if *name == objective.stance => {
                self.phase = SparPhase::Responding;
            }
            _ if !self.reforced => {
                // Something else held the machine; force the answering stance.
                self.reforced = true;
                ctx.clear_all_stances();
                ctx.enter_stance(&objective.stance, true);
            }
            _ => {
                warn!("Spar cannot enter stance '{}', round lost", objective.stance);
                self.score_round(0.0, ctx);
            }
        }
    }

    fn on_stance_changed(&mut self, from: &Stance, to: &Stance, ctx: &mut LevelContext) {
        let expected = self.current.as_ref().map(|o| o.stance.as_str());
        if self.phase == SparPhase::Responding && to.is_default() && from.name() == expected {
            // The window closed without a drill.
            self.score_round(0.0, ctx);
        }
    }

    fn end_objective(&mut self, report: &SequenceReport, ctx: &mut LevelContext) {
        if self.phase != SparPhase::Responding {
            return;
        }
        let on_target = self
            .current
            .as_ref()
            .is_some_and(|o| o.stance == report.stance && o.sequence == report.sequence);
        let accuracy = if on_target { report.accuracy() } else { 0.0 };
        self.score_round(accuracy, ctx);
    }

    fn on_task(&mut self, task: LevelTask, ctx: &mut LevelContext) {
        match task {
            LevelTask::PartnerStrike => {
                let Some(objective) = &self.current else {
                    return;
                };
                self.phase = SparPhase::Striking;
                self.reforced = false;
                ctx.feedback("Strike!");
                ctx.clear_all_stances();
                ctx.enter_stance(&objective.stance, true);
            }
            LevelTask::NextObjective => self.start_round(ctx),
            LevelTask::ClearStances => ctx.clear_all_stances(),
            LevelTask::RetryObjective => {}
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == SparPhase::Done
    }

    fn summary(&self) -> LevelSummary {
        LevelSummary {
            level: self.name.clone(),
            scores: self.scores.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::{LevelCommand, test_support::*};

    fn spar(rounds: u32) -> SparLevel {
        SparLevel::new(
            "Spar".into(),
            vec![objective("Ready", "Abaniko"), objective("Guard", "Redonda")],
            rounds,
            Some(42),
        )
    }

    fn picked(level: &SparLevel) -> ObjectiveConfig {
        level.current.clone().unwrap()
    }

    #[test]
    fn test_round_flow() {
        let mut level = spar(1);
        let commands = run(&mut level, |l, ctx| l.start_level(ctx));
        assert_eq!(scheduled(&commands), vec![LevelTask::PartnerStrike]);

        let attack = picked(&level);
        let commands = run(&mut level, |l, ctx| l.on_task(LevelTask::PartnerStrike, ctx));
        assert!(commands.contains(&LevelCommand::EnterStance {
            stance: attack.stance.clone(),
            practice: true,
        }));

        run(&mut level, |l, ctx| l.on_stance_entered(&matched(&attack.stance), ctx));
        let commands = run(&mut level, |l, ctx| {
            l.end_objective(&report(&attack.stance, &attack.sequence, 5, 5), ctx)
        });
        assert_eq!(scheduled(&commands), vec![LevelTask::NextObjective]);

        let commands = run(&mut level, |l, ctx| l.on_task(LevelTask::NextObjective, ctx));
        assert!(commands.contains(&LevelCommand::Finish));
        assert!(level.is_finished());
        assert_eq!(level.summary().total_score(), MAX_SCORE as u32);
    }

    #[test]
    fn test_reports_during_windup_are_ignored() {
        let mut level = spar(2);
        run(&mut level, |l, ctx| l.start_level(ctx));
        let attack = picked(&level);

        run(&mut level, |l, ctx| {
            l.end_objective(&report(&attack.stance, &attack.sequence, 5, 5), ctx)
        });
        assert!(level.summary().scores.is_empty());
    }

    #[test]
    fn test_missed_window_scores_zero() {
        let mut level = spar(2);
        run(&mut level, |l, ctx| l.start_level(ctx));
        let attack = picked(&level);
        run(&mut level, |l, ctx| l.on_task(LevelTask::PartnerStrike, ctx));

        // The reset issued with the strike does not count as a miss.
        run(&mut level, |l, ctx| {
            l.on_stance_changed(&named(&attack.stance), &Stance::Default, ctx)
        });
        assert!(level.summary().scores.is_empty());

        run(&mut level, |l, ctx| l.on_stance_entered(&matched(&attack.stance), ctx));
        run(&mut level, |l, ctx| {
            l.on_stance_changed(&named(&attack.stance), &Stance::Default, ctx)
        });

        let scores = level.summary().scores;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 0);
    }

    #[test]
    fn test_unenterable_stance_loses_the_round() {
        let mut level = SparLevel::new(
            "Spar".into(),
            vec![objective("Ghost", "Abaniko")],
            1,
            Some(1),
        );
        run(&mut level, |l, ctx| l.start_level(ctx));
        run(&mut level, |l, ctx| l.on_task(LevelTask::PartnerStrike, ctx));

        let commands = run(&mut level, |l, ctx| l.on_stance_entered(&StanceResult::Incorrect, ctx));
        assert!(commands.contains(&LevelCommand::EnterStance {
            stance: "Ghost".into(),
            practice: true,
        }));
        assert!(level.summary().scores.is_empty());

        let commands = run(&mut level, |l, ctx| l.on_stance_entered(&StanceResult::Incorrect, ctx));
        assert!(!commands.iter().any(|c| matches!(c, LevelCommand::EnterStance { .. })));
        assert_eq!(scheduled(&commands), vec![LevelTask::NextObjective]);
        assert_eq!(level.summary().scores[0].score, 0);
    }

    #[test]
    fn test_same_seed_same_attacks() {
        let mut a = spar(3);
        let mut b = spar(3);
        run(&mut a, |l, ctx| l.start_level(ctx));
        run(&mut b, |l, ctx| l.start_level(ctx));
        assert_eq!(picked(&a), picked(&b));
    }

    #[test]
    fn test_zero_rounds_finishes() {
        let mut level = spar(0);
        let commands = run(&mut level, |l, ctx| l.start_level(ctx));
        assert!(commands.contains(&LevelCommand::Finish));
    }
}
