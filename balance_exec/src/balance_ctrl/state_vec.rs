//! State vector assembly

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::*;
use crate::sens_store::{CombinedWheel, OrientationSample};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Measured state of the robot, laid out as described by the `IDX_*` constants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StateVector(pub [f64; NUM_STATES]);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StateVector {
    /// Build the state from the two orientation estimates and the combined wheel.
    ///
    /// The odometry pitch is negated since that estimator is mounted facing the other way.
    pub fn assemble(imu: &OrientationSample, ow: &OrientationSample, wheel: &CombinedWheel) -> Self {
        let mut x = [0f64; NUM_STATES];

        x[IDX_ROLL] = imu.roll;
        x[IDX_D_ROLL] = imu.d_roll;
        x[IDX_PITCH_OW] = -ow.pitch;
        x[IDX_D_PITCH_OW] = -ow.d_pitch;
        x[IDX_WHEEL_POS] = wheel.position();
        x[IDX_WHEEL_VEL] = wheel.velocity();

        Self(x)
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|x| x.is_finite())
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
