use core::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::constants::{
    DAMAGE_LAVA, FRICTION, INVULNERABLE_TICKS, MAX_DAMAGE, MAX_FUEL, PROBE_COUNT, PROBE_RADIUS,
    SLIDE_THRESHOLD, STEER_STEP_RAD, THRUST_IMPULSE, TIME_STEP,
};
use crate::map::{CollisionClass, Contact, TileMap, WallAxis};

/// Kinematic and resource state of the ship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    pub(crate) position: DVec2,
    pub(crate) previous_position: DVec2,
    pub(crate) velocity: DVec2,
    pub(crate) facing: DVec2,
    pub(crate) fuel: u32,
    pub(crate) damage: u32,
    pub(crate) invulnerable: u32,
    pub(crate) collision: Option<CollisionClass>,
    pub(crate) started: bool,
    pub(crate) actions: Vec<u8>,
}

impl ShipState {
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            previous_position: position,
            velocity: DVec2::ZERO,
            facing: DVec2::new(0.0, -1.0),
            fuel: MAX_FUEL,
            damage: 0,
            invulnerable: 0,
            collision: None,
            started: false,
            actions: Vec::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> DVec2 {
        self.position
    }

    #[inline]
    pub fn previous_position(&self) -> DVec2 {
        self.previous_position
    }

    #[inline]
    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    #[inline]
    pub fn facing(&self) -> DVec2 {
        self.facing
    }

    #[inline]
    pub fn fuel(&self) -> u32 {
        self.fuel
    }

    #[inline]
    pub fn damage(&self) -> u32 {
        self.damage
    }

    #[inline]
    pub fn invulnerable_ticks(&self) -> u32 {
        self.invulnerable
    }

    /// Class of the most recent wall hit. Kept until the next hit.
    #[inline]
    pub fn collision(&self) -> Option<CollisionClass> {
        self.collision
    }

    #[inline]
    pub fn started(&self) -> bool {
        self.started
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.damage >= MAX_DAMAGE
    }

    /// Ids of every executed action, idle pre-start ticks excluded.
    pub fn actions(&self) -> &[u8] {
        &self.actions
    }

    pub(crate) fn add_fuel(&mut self, amount: u32) {
        self.fuel = (self.fuel + amount).min(MAX_FUEL);
    }

    fn add_damage(&mut self, amount: u32) {
        self.damage = (self.damage + amount).min(MAX_DAMAGE);
    }

    /// Advances the ship by one tick. Returns `false` for an idle tick before
    /// the first real action, which leaves the ship untouched.
    pub(crate) fn step(&mut self, action: Action, map: &TileMap) -> bool {
        if !self.started {
            if action.is_noop() {
                return false;
            }
            self.started = true;
        }

        self.previous_position = self.position;

        let turn = action.turn.sign();
        if turn != 0.0 {
            self.facing = DVec2::from_angle(turn * STEER_STEP_RAD).rotate(self.facing);
        }

        let mut velocity = self.velocity;
        if action.thrust && self.fuel > 0 && !self.is_destroyed() {
            self.fuel -= 1;
            velocity += self.facing * THRUST_IMPULSE;
        }
        velocity *= FRICTION;
        let potential = map.clamp(self.position + velocity * TIME_STEP);

        match probe_contact(map, potential, velocity) {
            Some(contact) => self.bounce(contact),
            None => {
                self.position = potential;
                self.velocity = velocity;
            }
        }

        if map.is_lava(self.position) {
            self.add_damage(DAMAGE_LAVA);
        }
        self.invulnerable = self.invulnerable.saturating_sub(1);
        self.actions.push(action.id());
        true
    }

    fn bounce(&mut self, contact: Contact) {
        match contact.axis {
            WallAxis::Vertical => self.velocity.x = -self.velocity.x,
            WallAxis::Horizontal => self.velocity.y = -self.velocity.y,
        }
        if self.invulnerable == 0 && contact.class.is_harmful() {
            self.add_damage(contact.class.damage());
            self.invulnerable = INVULNERABLE_TICKS;
        }
        self.velocity *= contact.class.restitution();
        self.collision = Some(contact.class);
    }
}

/// First probe on the ring around `centre` that touches a wall while the
/// ship moves towards it.
fn probe_contact(map: &TileMap, centre: DVec2, velocity: DVec2) -> Option<Contact> {
    let heading = velocity.normalize_or_zero();
    if heading == DVec2::ZERO {
        return None;
    }
    (0..PROBE_COUNT).find_map(|index| {
        let direction = DVec2::from_angle(TAU * index as f64 / PROBE_COUNT as f64);
        if heading.dot(direction) <= SLIDE_THRESHOLD {
            return None;
        }
        map.contact(centre + direction * PROBE_RADIUS)
    })
}
