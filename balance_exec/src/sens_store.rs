//! # Sensor State Store
//!
//! Holds the latest sample of each asynchronous input stream. Every entity sits behind its own
//! mutex, so a reader never sees half an update, but two entities read in the same cycle may come
//! from slightly different moments. Values are stored as received, no range checking is done.
//!
//! The store is cheap to clone, all clones share the same entities.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{Arc, Mutex};

use comms_if::msg::{EncoderMsg, OrientationMsg};
use log::trace;
use serde::Serialize;

use crate::units::ticks_to_rad;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared store of the latest inputs.
#[derive(Clone, Default)]
pub struct SensStore {
    cmd: Arc<Mutex<OperatorCmd>>,
    orientation_imu: Arc<Mutex<OrientationSample>>,
    orientation_ow: Arc<Mutex<OrientationSample>>,
    wheels: Arc<Mutex<WheelState>>,
}

/// A copy of every entity in the store, taken at the start of a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensSnapshot {
    pub cmd: OperatorCmd,
    pub orientation_imu: OrientationSample,
    pub orientation_ow: OrientationSample,
    pub encoders: EncoderPair,
    pub wheel: CombinedWheel,
}

/// Normalised operator command axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OperatorCmd {
    /// Forward axis, in `[-1, 1]`
    pub forward: f64,

    /// Turn axis, in `[-1, 1]`
    pub turn: f64,
}

/// One orientation estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct OrientationSample {
    /// Units: radians
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,

    /// Units: radians/second
    pub d_roll: f64,
    pub d_pitch: f64,
    pub d_yaw: f64,

    /// Units: seconds
    pub dt: f64,
}

/// Raw reading from one wheel encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawEncoder {
    /// Units: ticks
    pub position: f64,

    /// Units: ticks/second
    pub velocity: f64,
}

/// Both wheel encoders converted to radians, with the left wheel's direction corrected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EncoderPair {
    /// Units: radians
    pub position_left: f64,
    pub position_right: f64,

    /// Units: radians/second
    pub velocity_left: f64,
    pub velocity_right: f64,
}

/// The wheels treated as a single wheel under the robot.
///
/// Only ever derived from an [`EncoderPair`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CombinedWheel {
    position: f64,
    velocity: f64,
}

/// Encoders and the combined wheel derived from them, updated together.
#[derive(Clone, Copy, Debug, Default)]
struct WheelState {
    encoders: EncoderPair,
    combined: CombinedWheel,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two independent orientation estimators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationSource {
    /// Estimator running on the IMU
    Imu,

    /// Estimator running on odometry and the wheel encoders
    Odometry,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensStore {
    /// Set the operator command.
    pub fn update_command(&self, forward: f64, turn: f64) {
        *self.cmd.lock().expect("SensStore: cmd mutex poisoned") = OperatorCmd { forward, turn };
    }

    /// Replace the sample for the given orientation source.
    pub fn update_orientation(&self, source: OrientationSource, sample: OrientationSample) {
        let entity = match source {
            OrientationSource::Imu => &self.orientation_imu,
            OrientationSource::Odometry => &self.orientation_ow,
        };

        *entity
            .lock()
            .expect("SensStore: orientation mutex poisoned") = sample;
    }

    /// Replace the encoder readings and recompute the combined wheel.
    pub fn update_encoders(&self, raw_left: RawEncoder, raw_right: RawEncoder) {
        let encoders = EncoderPair::from_raw(raw_left, raw_right);
        let combined = CombinedWheel::from_encoders(&encoders);

        trace!("Encoders: {:?}, combined wheel: {:?}", encoders, combined);

        *self.wheels.lock().expect("SensStore: wheels mutex poisoned") = WheelState {
            encoders,
            combined,
        };
    }

    /// Copy out every entity.
    ///
    /// Each entity is read under its own lock, one after the other.
    pub fn snapshot(&self) -> SensSnapshot {
        let cmd = *self.cmd.lock().expect("SensStore: cmd mutex poisoned");
        let orientation_imu = *self
            .orientation_imu
            .lock()
            .expect("SensStore: orientation mutex poisoned");
        let orientation_ow = *self
            .orientation_ow
            .lock()
            .expect("SensStore: orientation mutex poisoned");
        let wheels = *self.wheels.lock().expect("SensStore: wheels mutex poisoned");

        SensSnapshot {
            cmd,
            orientation_imu,
            orientation_ow,
            encoders: wheels.encoders,
            wheel: wheels.combined,
        }
    }
}

impl EncoderPair {
    /// Convert raw encoder readings, inverting the left wheel which is mounted mirrored.
    pub fn from_raw(raw_left: RawEncoder, raw_right: RawEncoder) -> Self {
        Self {
            position_left: ticks_to_rad(raw_left.position * -1.0),
            position_right: ticks_to_rad(raw_right.position),
            velocity_left: ticks_to_rad(raw_left.velocity * -1.0),
            velocity_right: ticks_to_rad(raw_right.velocity),
        }
    }
}

impl CombinedWheel {
    /// Derive the combined wheel.
    ///
    /// The position follows the right wheel only, the velocity is the mean of both wheels.
    pub fn from_encoders(encoders: &EncoderPair) -> Self {
        Self {
            position: encoders.position_right,
            velocity: util::maths::mean2(encoders.velocity_left, encoders.velocity_right),
        }
    }

    /// Units: radians
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Units: radians/second
    pub fn velocity(&self) -> f64 {
        self.velocity
    }
}

impl From<OrientationMsg> for OrientationSample {
    fn from(m: OrientationMsg) -> Self {
        Self {
            roll: m.roll,
            pitch: m.pitch,
            yaw: m.yaw,
            d_roll: m.d_roll,
            d_pitch: m.d_pitch,
            d_yaw: m.d_yaw,
            dt: m.dt,
        }
    }
}

impl From<EncoderMsg> for RawEncoder {
    fn from(m: EncoderMsg) -> Self {
        Self {
            position: m.position,
            velocity: m.velocity,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
