//! Balance control module
//!
//! Full state feedback balance control for the two wheeled robot. Each cycle the module:
//!
//! 1. Assembles the six component state vector from the latest sensor snapshot.
//! 2. Advances the reference vector with the operator's forward command.
//! 3. Computes the scalar control effort from the state error and the gain vector.
//! 4. Integrates the effort onto a filtered wheel velocity to get the wheel rate target.
//! 5. Splits the target between the wheels with the turn command and converts to motor ticks.
//!
//! The state layout is fixed, see the index constants below.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod feedback;
mod params;
mod ref_traj;
mod shaper;
mod state;
mod state_vec;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use feedback::*;
pub use params::*;
pub use ref_traj::*;
pub use shaper::*;
pub use state::*;
pub use state_vec::*;

use crate::loop_cfg::LoopCfgError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of components in the state, reference and gain vectors.
pub const NUM_STATES: usize = 6;

/// Body roll from the IMU estimator.
///
/// Units: radians
pub const IDX_ROLL: usize = 0;

/// Body roll rate from the IMU estimator.
///
/// Units: radians/second
pub const IDX_D_ROLL: usize = 1;

/// Negated pitch from the odometry estimator.
///
/// Units: radians
pub const IDX_PITCH_OW: usize = 2;

/// Negated pitch rate from the odometry estimator.
///
/// Units: radians/second
pub const IDX_D_PITCH_OW: usize = 3;

/// Combined wheel position.
///
/// Units: radians
pub const IDX_WHEEL_POS: usize = 4;

/// Combined wheel velocity.
///
/// Units: radians/second
pub const IDX_WHEEL_VEL: usize = 5;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during BalanceCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum BalanceCtrlError {
    #[error("BalanceCtrl has not been initialised")]
    NotInitialised,

    #[error("Gain component {0} is not finite: {1}")]
    NonFiniteGain(usize, f64),

    #[error("Initial reference component {0} is not finite: {1}")]
    NonFiniteTarget(usize, f64),

    #[error("Position target window must be positive, got {0}")]
    InvalidPosWindow(f64),

    #[error("Invalid loop configuration: {0}")]
    InvalidLoopConfig(LoopCfgError),
}
