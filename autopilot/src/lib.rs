pub mod benchmark;
pub mod config;
pub mod controller;
pub mod error;
pub mod maps;
pub mod planner;
pub mod runner;
pub mod scorer;
pub mod tsp;
pub mod util;

pub use config::{ControllerConfig, OrderAdherence, ScoreWeights};
pub use controller::{MacroController, PlannerMemo};
pub use error::{ControllerError, PlanError};
pub use planner::{Candidate, RandomSearch};
pub use runner::{run_match, RunArtifact, RunMetrics, RunPolicy};
pub use scorer::{score, ScoreContext, TargetWindow};
pub use tsp::{SolveStats, TspOrder, TspProblem};
