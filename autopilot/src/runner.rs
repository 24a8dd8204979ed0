use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use ptsp_core::constants::{ACTION_TIME_MS, DISQUALIFY_TIME_MS, INIT_TIME_MS_PER_WAYPOINT};
use ptsp_core::{Action, ActionLog, GameOutcome, GameState, TileMap, Turn};
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::controller::MacroController;
use crate::util::{read_env_u64, write_file};

pub const DEFAULT_MAX_TICKS: u32 = 20_000;

/// Timing rules a match is played under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPolicy {
    /// Budget per reply; later replies are replaced by a no-op.
    pub action_time: Duration,
    /// Replies later than this end the match.
    pub disqualify_after: Duration,
    pub max_ticks: u32,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            action_time: Duration::from_millis(ACTION_TIME_MS),
            disqualify_after: Duration::from_millis(DISQUALIFY_TIME_MS),
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl RunPolicy {
    /// Reads `PTSP_ACTION_TIME_MS`, `PTSP_DISQUALIFY_MS` and `PTSP_MAX_TICKS`.
    pub fn from_env() -> Self {
        Self {
            action_time: Duration::from_millis(read_env_u64("PTSP_ACTION_TIME_MS", ACTION_TIME_MS)),
            disqualify_after: Duration::from_millis(read_env_u64(
                "PTSP_DISQUALIFY_MS",
                DISQUALIFY_TIME_MS,
            )),
            max_ticks: read_env_u64("PTSP_MAX_TICKS", u64::from(DEFAULT_MAX_TICKS))
                .min(u64::from(u32::MAX)) as u32,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunMetrics {
    pub map_id: String,
    pub seed: u64,
    pub max_ticks: u32,
    pub ticks: u32,
    pub waypoints_visited: usize,
    pub waypoints_total: usize,
    pub fuel_tanks_collected: u32,
    pub fuel_spent: u32,
    pub final_fuel: u32,
    pub damage: u32,
    pub outcome: GameOutcome,
    pub disqualified: bool,
    pub late_replies: u32,
    pub thrust_ticks: u32,
    pub turn_ticks: u32,
    pub tsp_cost: f64,
    pub rollouts: u64,
    pub init_ms: u64,
    pub wall_ms: u64,
}

impl RunMetrics {
    pub fn completed(&self) -> bool {
        self.outcome == GameOutcome::Completed && !self.disqualified
    }
}

#[derive(Clone, Debug)]
pub struct RunArtifact {
    pub metrics: RunMetrics,
    pub actions: Vec<u8>,
    pub log: ActionLog,
}

/// Plays one match from the map's start until the game ends, the tick cap
/// is hit, or the controller is disqualified.
pub fn run_match(
    map_id: &str,
    map: Arc<TileMap>,
    config: &ControllerConfig,
    policy: &RunPolicy,
) -> Result<RunArtifact> {
    if policy.max_ticks == 0 {
        return Err(anyhow!("max_ticks must be > 0"));
    }

    let started = Instant::now();
    let mut game = GameState::new(Arc::clone(&map));

    let init_started = Instant::now();
    let mut controller = MacroController::initialize(&game, config.clone())
        .with_context(|| format!("failed initializing controller on map '{map_id}'"))?;
    let init_ms = init_started.elapsed().as_millis() as u64;
    let init_budget = INIT_TIME_MS_PER_WAYPOINT * game.waypoints().len() as u64;
    if init_ms > init_budget {
        tracing::warn!(map_id, init_ms, init_budget, "controller initialization over budget");
    }

    let mut actions = Vec::with_capacity(policy.max_ticks as usize);
    let mut late_replies = 0u32;
    let mut disqualified = false;
    let mut fuel_spent = 0u32;
    let mut thrust_ticks = 0u32;
    let mut turn_ticks = 0u32;

    while !game.is_ended() && game.elapsed_ticks() < policy.max_ticks {
        let asked = Instant::now();
        let reply = controller.decide(&game, asked + policy.action_time)?;
        let took = asked.elapsed();

        if took > policy.disqualify_after {
            tracing::warn!(
                map_id,
                tick = game.elapsed_ticks(),
                took_ms = took.as_millis() as u64,
                "reply far over budget; controller disqualified"
            );
            disqualified = true;
            break;
        }
        let action = if took > policy.action_time {
            late_replies += 1;
            tracing::warn!(
                map_id,
                tick = game.elapsed_ticks(),
                took_ms = took.as_millis() as u64,
                "late reply replaced by no-op"
            );
            Action::NOOP
        } else {
            reply
        };

        if action.thrust {
            thrust_ticks += 1;
            let ship = game.ship();
            if ship.fuel() > 0 && !ship.is_destroyed() {
                fuel_spent += 1;
            }
        }
        if action.turn != Turn::Straight {
            turn_ticks += 1;
        }

        actions.push(action.id());
        game.advance(action);
    }

    let log = ActionLog::new(map_id, actions.clone()).with_final_state(game.checkpoint());
    log.verify(Arc::clone(&map))
        .map_err(|err| anyhow!("recorded action log failed to replay: {err}"))?;

    let metrics = RunMetrics {
        map_id: map_id.to_string(),
        seed: config.seed,
        max_ticks: policy.max_ticks,
        ticks: game.elapsed_ticks(),
        waypoints_visited: game.waypoints_visited(),
        waypoints_total: game.waypoints().len(),
        fuel_tanks_collected: game.fuel_tanks_collected(),
        fuel_spent,
        final_fuel: game.ship().fuel(),
        damage: game.ship().damage(),
        outcome: game.outcome(),
        disqualified,
        late_replies,
        thrust_ticks,
        turn_ticks,
        tsp_cost: controller.order().cost,
        rollouts: controller.rollouts(),
        init_ms,
        wall_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        map_id,
        seed = metrics.seed,
        ticks = metrics.ticks,
        waypoints = metrics.waypoints_visited,
        total = metrics.waypoints_total,
        damage = metrics.damage,
        outcome = metrics.outcome.as_str(),
        late = metrics.late_replies,
        "match finished"
    );

    Ok(RunArtifact {
        metrics,
        actions,
        log,
    })
}

pub fn write_action_log(path: &Path, log: &ActionLog) -> Result<()> {
    let bytes = log
        .to_json_pretty()
        .with_context(|| format!("failed encoding action log for map '{}'", log.map_id))?;
    write_file(path, &bytes)
}

pub fn read_action_log(path: &Path) -> Result<ActionLog> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed reading action log {}", path.display()))?;
    ActionLog::from_json(&bytes)
        .with_context(|| format!("failed parsing action log {}", path.display()))
}
