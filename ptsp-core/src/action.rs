use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of distinct (turn, thrust) combinations.
pub const ACTION_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Straight,
    Left,
    Right,
}

impl Turn {
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Self::Straight => 0.0,
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    #[inline]
    fn index(self) -> u8 {
        match self {
            Self::Straight => 0,
            Self::Left => 1,
            Self::Right => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub turn: Turn,
    pub thrust: bool,
}

impl Action {
    pub const NOOP: Action = Action {
        turn: Turn::Straight,
        thrust: false,
    };

    pub const fn new(turn: Turn, thrust: bool) -> Self {
        Self { turn, thrust }
    }

    #[inline]
    pub fn is_noop(self) -> bool {
        self == Self::NOOP
    }

    /// Dense id: `thrust * 3 + turn`, where turn is 0 straight, 1 left, 2 right.
    #[inline]
    pub fn id(self) -> u8 {
        (if self.thrust { 3 } else { 0 }) + self.turn.index()
    }

    pub fn from_id(id: u8) -> Result<Self, CoreError> {
        let turn = match id % 3 {
            0 => Turn::Straight,
            1 => Turn::Left,
            _ => Turn::Right,
        };
        match id {
            0..=2 => Ok(Self::new(turn, false)),
            3..=5 => Ok(Self::new(turn, true)),
            _ => Err(CoreError::InvalidAction {
                id,
                count: ACTION_COUNT,
            }),
        }
    }
}

/// The set of actions a planner is allowed to sample from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    actions: Vec<Action>,
}

impl Default for ActionSpace {
    fn default() -> Self {
        Self::full()
    }
}

impl ActionSpace {
    pub fn full() -> Self {
        let actions = (0..ACTION_COUNT as u8)
            .filter_map(|id| Action::from_id(id).ok())
            .collect();
        Self { actions }
    }

    /// Duplicates are dropped, first occurrence wins.
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        let mut unique: Vec<Action> = Vec::new();
        for action in actions {
            if !unique.contains(&action) {
                unique.push(action);
            }
        }
        Self { actions: unique }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<Action> {
        self.actions.get(slot).copied()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn contains(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_cover_the_dense_range() {
        for id in 0..ACTION_COUNT as u8 {
            let action = Action::from_id(id).expect("valid id");
            assert_eq!(action.id(), id);
        }
        assert_eq!(Action::NOOP.id(), 0);
        assert_eq!(Action::new(Turn::Right, true).id(), 5);
    }

    #[test]
    fn out_of_range_id_fails_fast() {
        assert_eq!(
            Action::from_id(6),
            Err(CoreError::InvalidAction { id: 6, count: 6 })
        );
    }

    #[test]
    fn restricted_space_drops_duplicates() {
        let space = ActionSpace::from_actions([
            Action::new(Turn::Left, true),
            Action::new(Turn::Left, true),
            Action::NOOP,
        ]);
        assert_eq!(space.len(), 2);
        assert!(space.contains(Action::NOOP));
        assert!(!space.contains(Action::new(Turn::Right, false)));
    }
}
