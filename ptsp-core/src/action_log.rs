use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::ACTION_COUNT;
use crate::error::CoreError;
use crate::map::TileMap;
use crate::sim::{replay, Checkpoint, GameState};

/// Everything needed to reproduce a match: the map it was played on and the
/// action id issued on every tick, idle ticks included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub map_id: String,
    pub actions: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<Checkpoint>,
}

impl ActionLog {
    pub fn new(map_id: impl Into<String>, actions: Vec<u8>) -> Self {
        Self {
            map_id: map_id.into(),
            actions,
            final_state: None,
        }
    }

    pub fn with_final_state(mut self, checkpoint: Checkpoint) -> Self {
        self.final_state = Some(checkpoint);
        self
    }

    pub fn to_json_pretty(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec_pretty(self).map_err(|err| CoreError::LogFormat(err.to_string()))
    }

    /// Parses a log and rejects action ids outside the dense range.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CoreError> {
        let log: Self =
            serde_json::from_slice(bytes).map_err(|err| CoreError::LogFormat(err.to_string()))?;
        if let Some(id) = log
            .actions
            .iter()
            .copied()
            .find(|id| usize::from(*id) >= ACTION_COUNT)
        {
            return Err(CoreError::InvalidAction {
                id,
                count: ACTION_COUNT,
            });
        }
        Ok(log)
    }

    /// Replays the log and, when a final state was recorded, checks that the
    /// replay lands on it.
    pub fn verify(&self, map: Arc<TileMap>) -> Result<GameState, CoreError> {
        let game = replay(map, &self.actions)?;
        if let Some(expected) = &self.final_state {
            if *expected != game.checkpoint() {
                return Err(CoreError::ReplayMismatch {
                    map_id: self.map_id.clone(),
                    tick: game.elapsed_ticks(),
                });
            }
        }
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Arc<TileMap> {
        let text = "scale=4\n#######\n#.....#\n#S..W.#\n#.....#\n#######";
        Arc::new(TileMap::parse(text).expect("map parses"))
    }

    #[test]
    fn log_round_trips_through_json_and_verifies() {
        let map = corridor();
        let actions = vec![0, 0, 3, 3, 3, 5, 4, 0, 0];
        let expected = replay(Arc::clone(&map), &actions)
            .expect("replay")
            .checkpoint();
        let log = ActionLog::new("corridor", actions).with_final_state(expected);

        let bytes = log.to_json_pretty().expect("encode");
        let decoded = ActionLog::from_json(&bytes).expect("decode");
        assert_eq!(decoded, log);

        let game = decoded.verify(map).expect("verifies");
        assert_eq!(game.elapsed_ticks(), 9);
    }

    #[test]
    fn tampered_log_fails_verification() {
        let map = corridor();
        let expected = replay(Arc::clone(&map), &[3, 3, 3])
            .expect("replay")
            .checkpoint();
        let log = ActionLog::new("corridor", vec![3, 3, 4]).with_final_state(expected);

        assert_eq!(
            log.verify(map).err(),
            Some(CoreError::ReplayMismatch {
                map_id: "corridor".to_string(),
                tick: 3
            })
        );
    }

    #[test]
    fn out_of_range_ids_are_rejected_on_load() {
        let raw = br#"{"map_id":"corridor","actions":[0,3,7]}"#;
        assert_eq!(
            ActionLog::from_json(raw).err(),
            Some(CoreError::InvalidAction { id: 7, count: 6 })
        );
        assert!(matches!(
            ActionLog::from_json(b"not json"),
            Err(CoreError::LogFormat(_))
        ));
    }
}
