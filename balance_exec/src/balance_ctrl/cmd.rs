//! Velocity command definition

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{loop_cfg::LoopConfig, sens_store::OperatorCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The operator's command together with the gains that scale it.
///
/// The axes come from the sensor store, the gains from the loop configuration in force for the
/// current cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VelocityCommand {
    /// Forward axis, in `[-1, 1]`
    pub forward: f64,

    /// Turn axis, in `[-1, 1]`
    pub turn: f64,

    /// Units: radians/cycle
    pub forward_gain: f64,

    /// Units: radians/second
    pub turn_gain: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityCommand {
    pub fn new(cmd: OperatorCmd, cfg: &LoopConfig) -> Self {
        Self {
            forward: cmd.forward,
            turn: cmd.turn,
            forward_gain: cfg.forward_gain,
            turn_gain: cfg.turn_gain,
        }
    }

    /// Change in wheel position target requested for one cycle.
    ///
    /// Units: radians
    pub fn pos_increment(&self) -> f64 {
        self.forward * self.forward_gain
    }

    /// Wheel rate differential requested by the turn axis.
    ///
    /// Units: radians/second
    pub fn turn_rate(&self) -> f64 {
        self.turn * self.turn_gain
    }
}
