use glam::DVec2;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CoreError {
    #[error("action id {id} out of range (valid ids are 0..{count})")]
    InvalidAction { id: u8, count: usize },
    #[error("map has no rows")]
    EmptyMap,
    #[error("map row {row} has width {actual}, expected {expected}")]
    RaggedMap {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("unknown map character {found:?} at row {row}, column {col}")]
    UnknownTile { found: char, row: usize, col: usize },
    #[error("map must contain exactly one start marker, found {found}")]
    StartCount { found: usize },
    #[error("invalid map header: {0}")]
    MapHeader(String),
    #[error("malformed action log: {0}")]
    LogFormat(String),
    #[error("replay of {map_id} diverged from the logged final state at tick {tick}")]
    ReplayMismatch { map_id: String, tick: u32 },
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum RouteError {
    #[error("no traversable graph node near ({}, {})", .point.x, .point.y)]
    Unreachable { point: DVec2 },
    #[error("no route from ({}, {}) to ({}, {})", .from.x, .from.y, .to.x, .to.y)]
    NoRoute { from: DVec2, to: DVec2 },
}
