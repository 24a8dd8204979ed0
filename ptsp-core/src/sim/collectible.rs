use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::constants::{FUEL_TANK_RADIUS, SHIP_RADIUS, WAYPOINT_RADIUS};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub index: usize,
    pub position: DVec2,
    pub collected: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuelTank {
    pub index: usize,
    pub position: DVec2,
    pub collected: bool,
}

impl Waypoint {
    pub fn new(index: usize, position: DVec2) -> Self {
        Self {
            index,
            position,
            collected: false,
        }
    }

    /// Marks the waypoint collected when the ship overlaps it. Returns true
    /// only on the tick the flag flips.
    pub(crate) fn try_collect(&mut self, ship: DVec2) -> bool {
        try_collect(&mut self.collected, self.position, WAYPOINT_RADIUS, ship)
    }
}

impl FuelTank {
    pub fn new(index: usize, position: DVec2) -> Self {
        Self {
            index,
            position,
            collected: false,
        }
    }

    pub(crate) fn try_collect(&mut self, ship: DVec2) -> bool {
        try_collect(&mut self.collected, self.position, FUEL_TANK_RADIUS, ship)
    }
}

#[inline]
fn try_collect(collected: &mut bool, position: DVec2, radius: f64, ship: DVec2) -> bool {
    if *collected || ship.distance(position) >= SHIP_RADIUS + radius {
        return false;
    }
    *collected = true;
    true
}
