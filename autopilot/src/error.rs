use ptsp_core::RouteError;
use thiserror::Error;

/// Failures while preparing a controller for a match.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PlanError {
    #[error("invalid controller config: {0}")]
    InvalidConfig(String),
    #[error("controller action space is empty")]
    EmptyActionSpace,
    #[error("route precomputation failed: {0}")]
    Route(#[from] RouteError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("cadence counter {ticks_left} out of range for macro-action length {length}")]
    CadenceOutOfRange { ticks_left: u32, length: u32 },
}
