//! # Telemetry messages
//!
//! Published by the balance exec once per cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Common message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub frame_id: String,

    /// Time at which the cycle that produced this message captured its inputs
    pub stamp: DateTime<Utc>,
}

/// Three-value channel record.
///
/// Consumers plot these as setpoint/measurement/increment, though the controller packs the six
/// state components into two of them (see `BalanceMsg`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidMsg {
    pub setpoint: f64,
    pub measurement: f64,
    pub increment: f64,
}

/// Controller telemetry for one cycle.
///
/// `roll` carries state components 0 to 2 and `velocity` components 3 to 5, in order. The field
/// names are kept for compatibility with existing plotting tools and do not describe the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMsg {
    pub header: Header,

    pub roll: PidMsg,
    pub velocity: PidMsg,

    /// Combined wheel velocity target before turn differential. Units: radians/second
    pub motor: f64,
    pub motor_left: f64,
    pub motor_right: f64,
}

/// Setpoint for one motor driver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorSetpointMsg {
    /// Units: ticks/second
    pub setpoint: f64,
}

/// Setpoints for both motor drivers.
///
/// `motor0` drives the right wheel and `motor1` the left wheel, matching the encoder numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorsMsg {
    pub header: Header,

    pub motor0: MotorSetpointMsg,
    pub motor1: MotorSetpointMsg,
}
