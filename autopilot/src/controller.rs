//! Macro-action controller: the per-tick decision unit.
//!
//! A committed action is held for `macro_action_length` ticks. While it runs,
//! the planner keeps searching from the state where the next action will
//! start; on the tick that starts it the best first action found is
//! committed and emitted.

use std::time::Instant;

use ptsp_core::{Action, DVec2, DistanceField, GameState, PathGraph};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, PlanError};
use crate::planner::RandomSearch;
use crate::scorer::ScoreContext;
use crate::tsp::{SolveStats, TspOrder, TspProblem};

/// Decision state carried from one tick to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerMemo {
    /// Action being held.
    pub current: Action,
    /// Ticks of the current window still to run after this one.
    pub ticks_left: u32,
    /// Clear the planner's incumbent before the next search.
    pub restart: bool,
}

impl Default for PlannerMemo {
    fn default() -> Self {
        Self {
            current: Action::NOOP,
            ticks_left: 0,
            restart: true,
        }
    }
}

pub struct MacroController {
    config: ControllerConfig,
    order: TspOrder,
    solve_stats: SolveStats,
    fields: Vec<DistanceField>,
    planner: RandomSearch,
    memo: PlannerMemo,
    root_tick: Option<u32>,
}

impl MacroController {
    /// Solves the visiting order and precomputes one distance field per
    /// waypoint. Runs once, before the first tick.
    pub fn initialize(game: &GameState, config: ControllerConfig) -> Result<Self, PlanError> {
        config.validate()?;

        let graph = PathGraph::build(game.map(), config.graph_spacing);
        let targets: Vec<DVec2> = game.waypoints().iter().map(|w| w.position).collect();

        let problem = TspProblem::from_oracle(&graph, game.ship().position(), &targets)?;
        let (order, solve_stats) = problem.solve(config.tsp_expansion_limit);
        if !solve_stats.complete {
            tracing::warn!(
                expansions = solve_stats.expansions,
                "order search hit its expansion limit; keeping the incumbent"
            );
        }
        tracing::info!(
            waypoints = order.len(),
            cost = order.cost,
            expansions = solve_stats.expansions,
            improvements = solve_stats.incumbent_costs.len().saturating_sub(1),
            "visiting order fixed: {:?}",
            order.order
        );

        let fields = targets
            .iter()
            .map(|target| graph.distance_field(*target))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            planner: RandomSearch::new(&config),
            config,
            order,
            solve_stats,
            fields,
            memo: PlannerMemo::default(),
            root_tick: None,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn order(&self) -> &TspOrder {
        &self.order
    }

    pub fn solve_stats(&self) -> &SolveStats {
        &self.solve_stats
    }

    pub fn memo(&self) -> PlannerMemo {
        self.memo
    }

    pub fn rollouts(&self) -> u64 {
        self.planner.rollouts()
    }

    /// Tick of the state the latest planning cycle searched from.
    pub fn planning_root_tick(&self) -> Option<u32> {
        self.root_tick
    }

    /// Returns the action for the tick `game` is about to play. Never mutates
    /// `game`; planning happens on a private copy until `deadline` minus the
    /// configured slack.
    pub fn decide(
        &mut self,
        game: &GameState,
        deadline: Instant,
    ) -> Result<Action, ControllerError> {
        let length = self.config.macro_action_length;
        if self.memo.ticks_left >= length {
            return Err(ControllerError::CadenceOutOfRange {
                ticks_left: self.memo.ticks_left,
                length,
            });
        }

        if game.elapsed_ticks() == 0 {
            self.memo = PlannerMemo {
                current: Action::NOOP,
                ticks_left: length - 1,
                restart: true,
            };
            return Ok(Action::NOOP);
        }

        // The held action plays `ticks_left` more ticks, this one included;
        // the next committed action starts right after them.
        let mut root = game.clone();
        for _ in 0..self.memo.ticks_left {
            root.advance(self.memo.current);
        }
        self.root_tick = Some(root.elapsed_ticks());
        let ctx = ScoreContext::new(
            &self.order.order,
            &self.fields,
            &root,
            self.config.weights,
            self.config.order_adherence,
        );

        if self.memo.restart {
            self.planner.reset();
        }
        let suggestion = self.planner.run(&root, &ctx, deadline);

        if self.memo.ticks_left > 0 {
            self.memo.ticks_left -= 1;
            self.memo.restart = false;
        } else {
            if let Some(action) = suggestion {
                self.memo.current = action;
            }
            self.memo.ticks_left = length - 1;
            self.memo.restart = true;
            tracing::debug!(
                tick = game.elapsed_ticks(),
                root_tick = root.elapsed_ticks(),
                action = self.memo.current.id(),
                fitness = self.planner.best().map(|best| best.fitness),
                rollouts = self.planner.rollouts(),
                "committed macro-action"
            );
        }

        Ok(self.memo.current)
    }
}
