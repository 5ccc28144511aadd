//! Reference trajectory
//!
//! Only the wheel components of the reference move. The position target integrates the operator's
//! forward command each cycle and is then held within a window about the measured wheel position,
//! so that a blocked or lifted wheel can't wind the target up without bound. The velocity target
//! follows the command directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::clamp_about;

use super::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Target state, laid out the same way as the `StateVector`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RefVector(pub [f64; NUM_STATES]);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RefVector {
    fn default() -> Self {
        Self(DEFAULT_TARGET_INIT)
    }
}

impl RefVector {
    /// Move the position target by the command's increment, set the velocity target to the same
    /// increment, then clamp the position target to within `window_rad` of the measured wheel
    /// position. The balance components are left alone.
    ///
    /// Returns true if the clamp changed the position target.
    pub fn advance(&mut self, state: &StateVector, cmd: &VelocityCommand, window_rad: f64) -> bool {
        let increment = cmd.pos_increment();
        let unclamped = self.0[IDX_WHEEL_POS] + increment;
        let measured = state.wheel_pos();

        self.0[IDX_WHEEL_POS] = clamp_about(unclamped, measured, window_rad);
        self.0[IDX_WHEEL_VEL] = increment;

        unclamped > measured + window_rad || unclamped < measured - window_rad
    }

    pub fn wheel_pos(&self) -> f64 {
        self.0[IDX_WHEEL_POS]
    }

    pub fn wheel_vel(&self) -> f64 {
        self.0[IDX_WHEEL_VEL]
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
