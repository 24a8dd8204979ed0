pub mod action;
pub mod action_log;
pub mod constants;
pub mod error;
pub mod map;
pub mod route;
pub mod sim;

pub use glam::DVec2;

pub use action::{Action, ActionSpace, Turn, ACTION_COUNT};
pub use action_log::ActionLog;
pub use error::{CoreError, RouteError};
pub use map::{CollisionClass, Contact, Tile, TileMap, WallAxis};
pub use route::{DistanceField, PathGraph, Route, RouteOracle};
pub use sim::{
    replay, replay_with_checkpoints, Checkpoint, FuelTank, GameOutcome, GameState, ShipState,
    Waypoint,
};
