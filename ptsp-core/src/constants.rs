use core::f64::consts::PI;

// Ship kinematics.
pub const STEER_STEP_RAD: f64 = PI / 60.0;
pub const FRICTION: f64 = 0.99;
pub const TIME_STEP: f64 = 1.0;
pub const THRUST_IMPULSE: f64 = TIME_STEP * 0.05 / 2.0;
pub const SHIP_RADIUS: f64 = 3.0;

// Collision probe ring.
pub const PROBE_COUNT: usize = 16;
pub const PROBE_RADIUS: f64 = 1.5 * SHIP_RADIUS;
/// Minimum alignment between velocity and centre->probe direction for a
/// contact to count as a collision. Lower values make walls stickier.
pub const SLIDE_THRESHOLD: f64 = 0.5;

// Fuel.
pub const MAX_FUEL: u32 = 5_000;
pub const FUEL_TANK_BOOST: u32 = 250;
pub const FUEL_WAYPOINT_REWARD: u32 = 50;

// Damage.
pub const MAX_DAMAGE: u32 = 5_000;
pub const INVULNERABLE_TICKS: u32 = 50;
pub const DAMAGE_NORMAL_COLLISION: u32 = 10;
pub const DAMAGE_DAMAGE_COLLISION: u32 = 30;
pub const DAMAGE_LAVA: u32 = 1;

// Velocity retained after bouncing off each wall class.
pub const RESTITUTION_NORMAL: f64 = 0.25;
pub const RESTITUTION_DAMAGE: f64 = 0.1;
pub const RESTITUTION_ELASTIC: f64 = 0.9;

// Collectibles.
pub const WAYPOINT_RADIUS: f64 = 5.0;
pub const FUEL_TANK_RADIUS: f64 = 4.0;

// Harness timing.
pub const ACTION_TIME_MS: u64 = 40;
pub const DISQUALIFY_TIME_MS: u64 = ACTION_TIME_MS * 3;
pub const INIT_TIME_MS_PER_WAYPOINT: u64 = 100;

/// Ticks allowed between consecutive waypoint pickups.
pub fn steps_per_waypoint(waypoint_count: usize) -> u32 {
    match waypoint_count {
        30 => 700,
        40 => 550,
        50 => 400,
        _ => 800,
    }
}
