//! Parameters structure for BalanceCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{BalanceCtrlError, NUM_STATES};
use crate::loop_cfg::LoopConfig;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Gains from the LQR design for the robot as built.
pub const DEFAULT_GAIN_K: [f64; NUM_STATES] = [
    -453.11421438,
    -41.03540067,
    15.17484972,
    -6.16366411,
    -4.47213596,
    -4.30609058,
];

/// Reference the controller starts from. The roll component is the balance point of the body.
pub const DEFAULT_TARGET_INIT: [f64; NUM_STATES] = [0.1415, 0.0, 0.0, 0.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for balance control.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Params {
    // ---- CONTROLLER ----
    /// State feedback gain vector, one entry per state component.
    #[serde(default = "default_gain_k")]
    pub gain_k: [f64; NUM_STATES],

    /// Initial reference vector.
    #[serde(default = "default_target_init")]
    pub target_init: [f64; NUM_STATES],

    /// Half width of the window about the measured wheel position that the position target is
    /// held inside.
    ///
    /// Units: radians
    #[serde(default = "default_pos_window_rad")]
    pub pos_window_rad: f64,

    // ---- LOOP ----
    /// Starting loop configuration, may be changed at runtime.
    #[serde(rename = "loop", default)]
    pub loop_cfg: LoopConfig,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            gain_k: DEFAULT_GAIN_K,
            target_init: DEFAULT_TARGET_INIT,
            pos_window_rad: default_pos_window_rad(),
            loop_cfg: LoopConfig::default(),
        }
    }
}

impl Params {
    /// Check the parameters can be used by the controller.
    pub fn validate(&self) -> Result<(), BalanceCtrlError> {
        if let Some((i, &k)) = self.gain_k.iter().enumerate().find(|(_, k)| !k.is_finite()) {
            return Err(BalanceCtrlError::NonFiniteGain(i, k));
        }

        if let Some((i, &w)) = self
            .target_init
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite())
        {
            return Err(BalanceCtrlError::NonFiniteTarget(i, w));
        }

        if !(self.pos_window_rad > 0.0) {
            return Err(BalanceCtrlError::InvalidPosWindow(self.pos_window_rad));
        }

        self.loop_cfg
            .validate()
            .map_err(BalanceCtrlError::InvalidLoopConfig)
    }
}

fn default_gain_k() -> [f64; NUM_STATES] {
    DEFAULT_GAIN_K
}

fn default_target_init() -> [f64; NUM_STATES] {
    DEFAULT_TARGET_INIT
}

fn default_pos_window_rad() -> f64 {
    std::f64::consts::TAU
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
