//! # Sensor and operator input messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::MsgParseError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Joystick state from the operator input source.
///
/// Axes are normalised to `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JoyMsg {
    pub axes: Vec<f32>,

    #[serde(default)]
    pub buttons: Vec<i32>,
}

/// Orientation estimate from one of the orientation sources.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationMsg {
    /// Units: radians
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,

    /// Units: radians/second
    pub d_roll: f64,
    pub d_pitch: f64,
    pub d_yaw: f64,

    /// Time step of the estimator that produced this sample.
    ///
    /// Units: seconds
    pub dt: f64,
}

/// Raw state of one wheel encoder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EncoderMsg {
    /// Units: ticks
    pub position: f64,

    /// Units: ticks/second
    pub velocity: f64,
}

/// Both wheel encoders.
///
/// `encoder0` is the right wheel and `encoder1` the left wheel. The left wheel is mounted mirrored
/// so its counts run backwards with respect to the robot's forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodersMsg {
    pub encoder0: EncoderMsg,
    pub encoder1: EncoderMsg,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JoyMsg {
    /// Index of the forward/backward axis
    pub const FORWARD_AXIS: usize = 1;

    /// Index of the left/right axis
    pub const TURN_AXIS: usize = 0;

    /// Check that the message carries both command axes.
    pub fn validate(&self) -> Result<(), MsgParseError> {
        if self.axes.len() <= Self::FORWARD_AXIS.max(Self::TURN_AXIS) {
            return Err(MsgParseError::MissingAxes(self.axes.len()));
        }

        Ok(())
    }

    /// Forward axis value, or zero if the axis is missing.
    pub fn forward(&self) -> f64 {
        self.axes.get(Self::FORWARD_AXIS).copied().unwrap_or(0.0) as f64
    }

    /// Turn axis value, or zero if the axis is missing.
    pub fn turn(&self) -> f64 {
        self.axes.get(Self::TURN_AXIS).copied().unwrap_or(0.0) as f64
    }
}
