use std::sync::Arc;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::constants::{steps_per_waypoint, FUEL_TANK_BOOST, FUEL_WAYPOINT_REWARD};
use crate::error::CoreError;
use crate::map::TileMap;

mod collectible;
mod ship;


pub use collectible::{FuelTank, Waypoint};
pub use ship::ShipState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Running,
    /// Every waypoint collected.
    Completed,
    /// The per-waypoint time budget ran out.
    TimedOut,
    Destroyed,
}

impl GameOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Destroyed => "destroyed",
        }
    }
}

/// Full game state. Cloning is cheap enough for rollouts: the map is shared,
/// everything else is small.
#[derive(Clone, Debug)]
pub struct GameState {
    map: Arc<TileMap>,
    ship: ShipState,
    waypoints: Vec<Waypoint>,
    fuel_tanks: Vec<FuelTank>,
    visit_order: Vec<usize>,
    elapsed_ticks: u32,
    steps_left: u32,
    step_budget: u32,
    fuel_tanks_collected: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub tick: u32,
    pub position: DVec2,
    pub velocity: DVec2,
    pub facing: DVec2,
    pub fuel: u32,
    pub damage: u32,
    pub waypoints_visited: usize,
    pub fuel_tanks_collected: u32,
    pub outcome: GameOutcome,
}

pub fn replay(map: Arc<TileMap>, actions: &[u8]) -> Result<GameState, CoreError> {
    let mut game = GameState::new(map);

    for id in actions {
        game.advance_id(*id)?;
    }

    Ok(game)
}

pub fn replay_with_checkpoints(
    map: Arc<TileMap>,
    actions: &[u8],
    sample_every: u32,
) -> Result<Vec<Checkpoint>, CoreError> {
    let mut game = GameState::new(map);
    let stride = sample_every.max(1);
    let total = actions.len() as u32;
    let mut checkpoints = vec![game.checkpoint()];

    for (index, id) in actions.iter().enumerate() {
        game.advance_id(*id)?;
        let tick = (index + 1) as u32;
        if tick % stride == 0 || tick == total {
            checkpoints.push(game.checkpoint());
        }
    }

    Ok(checkpoints)
}

impl GameState {
    pub fn new(map: Arc<TileMap>) -> Self {
        let waypoints: Vec<Waypoint> = map
            .waypoints()
            .iter()
            .enumerate()
            .map(|(index, position)| Waypoint::new(index, *position))
            .collect();
        let fuel_tanks = map
            .fuel_tanks()
            .iter()
            .enumerate()
            .map(|(index, position)| FuelTank::new(index, *position))
            .collect();
        let step_budget = steps_per_waypoint(waypoints.len());

        Self {
            ship: ShipState::new(map.start()),
            map,
            waypoints,
            fuel_tanks,
            visit_order: Vec::new(),
            elapsed_ticks: 0,
            steps_left: step_budget,
            step_budget,
            fuel_tanks_collected: 0,
        }
    }

    pub fn from_map(map: TileMap) -> Self {
        Self::new(Arc::new(map))
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn shared_map(&self) -> Arc<TileMap> {
        Arc::clone(&self.map)
    }

    pub fn ship(&self) -> &ShipState {
        &self.ship
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn fuel_tanks(&self) -> &[FuelTank] {
        &self.fuel_tanks
    }

    /// Waypoint indices in the order they were collected.
    pub fn visit_order(&self) -> &[usize] {
        &self.visit_order
    }

    #[inline]
    pub fn waypoints_visited(&self) -> usize {
        self.visit_order.len()
    }

    #[inline]
    pub fn fuel_tanks_collected(&self) -> u32 {
        self.fuel_tanks_collected
    }

    #[inline]
    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    /// Ticks left to reach the next waypoint.
    #[inline]
    pub fn steps_left(&self) -> u32 {
        self.steps_left
    }

    #[inline]
    pub fn step_budget(&self) -> u32 {
        self.step_budget
    }

    pub fn outcome(&self) -> GameOutcome {
        if self.visit_order.len() == self.waypoints.len() {
            GameOutcome::Completed
        } else if self.ship.is_destroyed() {
            GameOutcome::Destroyed
        } else if self.steps_left == 0 {
            GameOutcome::TimedOut
        } else {
            GameOutcome::Running
        }
    }

    #[inline]
    pub fn is_ended(&self) -> bool {
        self.outcome() != GameOutcome::Running
    }

    pub fn advance_id(&mut self, id: u8) -> Result<(), CoreError> {
        self.advance(Action::from_id(id)?);
        Ok(())
    }

    /// One game tick. Ticks on an ended game are ignored.
    pub fn advance(&mut self, action: Action) {
        if self.is_ended() {
            return;
        }

        self.elapsed_ticks += 1;
        if !self.ship.step(action, &self.map) {
            return;
        }
        self.steps_left = self.steps_left.saturating_sub(1);
        self.collect();
    }

    fn collect(&mut self) {
        let position = self.ship.position();

        for waypoint in &mut self.waypoints {
            if waypoint.try_collect(position) {
                self.visit_order.push(waypoint.index);
                self.ship.add_fuel(FUEL_WAYPOINT_REWARD);
                self.steps_left = self.step_budget;
            }
        }

        for tank in &mut self.fuel_tanks {
            if tank.try_collect(position) {
                self.fuel_tanks_collected += 1;
                self.ship.add_fuel(FUEL_TANK_BOOST);
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tick: self.elapsed_ticks,
            position: self.ship.position(),
            velocity: self.ship.velocity(),
            facing: self.ship.facing(),
            fuel: self.ship.fuel(),
            damage: self.ship.damage(),
            waypoints_visited: self.waypoints_visited(),
            fuel_tanks_collected: self.fuel_tanks_collected,
            outcome: self.outcome(),
        }
    }
}
