//! Output shaping
//!
//! Splits the combined wheel rate target between the two wheels and converts the result into the
//! motor drivers' units and sign conventions.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::VelocityCommand;
use crate::units::rad_to_ticks;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Per wheel rate targets in the robot's frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct WheelTargets {
    /// Units: radians/second
    pub left_rads: f64,

    /// Units: radians/second
    pub right_rads: f64,
}

/// Motor driver setpoints.
///
/// The left motor is mounted mirrored, so its setpoint is negated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MotorCommand {
    /// Units: ticks/second
    pub left_ticks: f64,

    /// Units: ticks/second
    pub right_ticks: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelTargets {
    /// Apply the turn differential to the combined target.
    pub fn from_combined(pwm_target: f64, cmd: &VelocityCommand) -> Self {
        let turn = cmd.turn_rate();

        Self {
            left_rads: pwm_target - turn,
            right_rads: pwm_target + turn,
        }
    }
}

impl From<WheelTargets> for MotorCommand {
    fn from(t: WheelTargets) -> Self {
        Self {
            left_ticks: rad_to_ticks(-t.left_rads),
            right_ticks: rad_to_ticks(t.right_rads),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    fn cmd(turn: f64) -> VelocityCommand {
        VelocityCommand {
            forward: 0.0,
            turn,
            forward_gain: 0.05,
            turn_gain: 3.0,
        }
    }

    #[test]
    fn test_no_turn() {
        let t = WheelTargets::from_combined(2.0, &cmd(0.0));

        assert_eq!(t.left_rads, 2.0);
        assert_eq!(t.right_rads, 2.0);

        let m = MotorCommand::from(t);
        assert_eq!(m.left_ticks, -m.right_ticks);
    }

    #[test]
    fn test_turn() {
        let t = WheelTargets::from_combined(0.0, &cmd(0.5));

        assert_eq!(t.left_rads, -1.5);
        assert_eq!(t.right_rads, 1.5);

        // Wheels spin in opposite directions, the mirrored left motor sees the same sign
        let m = MotorCommand::from(t);
        assert_relative_eq!(m.left_ticks, m.right_ticks);
        assert!(m.right_ticks > 0.0);
    }

    #[test]
    fn test_turn_symmetry() {
        for &p in [-3.0, 0.0, 0.7, 12.0].iter() {
            for &turn in [-1.0, -0.25, 0.5, 1.0].iter() {
                let t = WheelTargets::from_combined(p, &cmd(turn));
                assert_relative_eq!(t.left_rads + t.right_rads, 2.0 * p, epsilon = 1e-12);
                assert_relative_eq!(t.right_rads - t.left_rads, 2.0 * turn * 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_ticks() {
        let m = MotorCommand::from(WheelTargets {
            left_rads: TAU,
            right_rads: TAU,
        });

        assert_relative_eq!(m.left_ticks, -8192.0);
        assert_relative_eq!(m.right_ticks, 8192.0);
    }
}
