//! Anytime random search over macro-action sequences.
//!
//! Every candidate is `horizon` actions, each held for one macro-action of
//! `macro_action_length` ticks, rolled out on a private clone of the root
//! state. The best candidate survives across calls until `reset`.

use std::time::{Duration, Instant};

use ptsp_core::{Action, ActionSpace, GameState};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::ControllerConfig;
use crate::scorer::{score, ScoreContext};

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub actions: Vec<Action>,
    pub fitness: f64,
}

pub struct RandomSearch {
    rng: SmallRng,
    action_space: ActionSpace,
    horizon: usize,
    macro_action_length: u32,
    slack: Duration,
    best: Option<Candidate>,
    rollouts: u64,
}

impl RandomSearch {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            action_space: config.action_space.clone(),
            horizon: config.horizon,
            macro_action_length: config.macro_action_length,
            slack: config.slack(),
            best: None,
            rollouts: 0,
        }
    }

    /// Forgets the incumbent so the next cycle starts from scratch.
    pub fn reset(&mut self) {
        self.best = None;
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Rollouts evaluated since construction.
    pub fn rollouts(&self) -> u64 {
        self.rollouts
    }

    /// Samples and evaluates candidates until only `slack` is left before
    /// `deadline`, then returns the first action of the best one.
    pub fn run(
        &mut self,
        root: &GameState,
        ctx: &ScoreContext<'_>,
        deadline: Instant,
    ) -> Option<Action> {
        while self.has_time(deadline) {
            let actions = self.sample();
            let fitness = self.rollout(root, &actions, ctx, deadline);
            self.rollouts += 1;

            if self.best.as_ref().map_or(true, |best| fitness > best.fitness) {
                self.best = Some(Candidate { actions, fitness });
            }
        }

        self.best
            .as_ref()
            .and_then(|best| best.actions.first().copied())
    }

    #[inline]
    fn has_time(&self, deadline: Instant) -> bool {
        deadline.saturating_duration_since(Instant::now()) > self.slack
    }

    fn sample(&mut self) -> Vec<Action> {
        let slots = self.action_space.len();
        if slots == 0 {
            return Vec::new();
        }
        (0..self.horizon)
            .filter_map(|_| self.action_space.get(self.rng.gen_range(0..slots)))
            .collect()
    }

    /// Scores a candidate. Rollouts cut short by the deadline or by the game
    /// ending are scored where they stopped.
    fn rollout(
        &self,
        root: &GameState,
        actions: &[Action],
        ctx: &ScoreContext<'_>,
        deadline: Instant,
    ) -> f64 {
        let mut state = root.clone();
        'macro_actions: for action in actions {
            for _ in 0..self.macro_action_length {
                state.advance(*action);
                if state.is_ended() || !self.has_time(deadline) {
                    break 'macro_actions;
                }
            }
        }
        score(&state, ctx)
    }
}
