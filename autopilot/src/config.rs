use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ptsp_core::ActionSpace;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

pub const DEFAULT_MACRO_ACTION_LENGTH: u32 = 8;
pub const DEFAULT_HORIZON: usize = 5;
pub const DEFAULT_SLACK_MS: u64 = 10;
pub const DEFAULT_GRAPH_SPACING: usize = 2;
pub const DEFAULT_SEED: u64 = 0x5EED_0001;

/// Weights of the rollout fitness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub per_waypoint: f64,
    pub per_fuel_tank: f64,
    pub damage_factor: f64,
    pub max_distance: f64,
    pub time_horizon: f64,
    pub finish_multiplier: f64,
    pub second_target_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            per_waypoint: 1_000.0,
            per_fuel_tank: 900.0,
            damage_factor: 0.25,
            max_distance: 10_000.0,
            time_horizon: 10_000.0,
            finish_multiplier: 10.0,
            second_target_bonus: 10_000.0,
        }
    }
}

impl ScoreWeights {
    fn all_finite(&self) -> bool {
        [
            self.per_waypoint,
            self.per_fuel_tank,
            self.damage_factor,
            self.max_distance,
            self.time_horizon,
            self.finish_multiplier,
            self.second_target_bonus,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

/// Which pickups must follow the fixed visiting order to earn the order bonus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAdherence {
    /// Only pickups made during the rollout are compared with the order
    /// still outstanding at the planning root.
    #[default]
    Rollout,
    /// The whole visit history must be a prefix of the fixed order.
    History,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Ticks each committed action is held for.
    pub macro_action_length: u32,
    /// Macro-actions per candidate rollout.
    pub horizon: usize,
    /// Planning stops once less than this is left before the deadline.
    pub slack_ms: u64,
    pub seed: u64,
    pub action_space: ActionSpace,
    pub weights: ScoreWeights,
    pub order_adherence: OrderAdherence,
    /// Cap on branch-and-bound expansions; `None` searches exhaustively.
    pub tsp_expansion_limit: Option<u64>,
    pub graph_spacing: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            macro_action_length: DEFAULT_MACRO_ACTION_LENGTH,
            horizon: DEFAULT_HORIZON,
            slack_ms: DEFAULT_SLACK_MS,
            seed: DEFAULT_SEED,
            action_space: ActionSpace::full(),
            weights: ScoreWeights::default(),
            order_adherence: OrderAdherence::default(),
            tsp_expansion_limit: None,
            graph_spacing: DEFAULT_GRAPH_SPACING,
        }
    }
}

impl ControllerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed reading controller config {}", path.display()))?;
        serde_json::from_slice(&raw)
            .with_context(|| format!("failed parsing controller config {}", path.display()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    pub fn slack(&self) -> Duration {
        Duration::from_millis(self.slack_ms)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.macro_action_length == 0 {
            return Err(PlanError::InvalidConfig(
                "macro_action_length must be >= 1".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(PlanError::InvalidConfig("horizon must be >= 1".to_string()));
        }
        if self.graph_spacing == 0 {
            return Err(PlanError::InvalidConfig(
                "graph_spacing must be >= 1".to_string(),
            ));
        }
        if self.action_space.is_empty() {
            return Err(PlanError::EmptyActionSpace);
        }
        if !self.weights.all_finite() {
            return Err(PlanError::InvalidConfig(
                "score weights must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
