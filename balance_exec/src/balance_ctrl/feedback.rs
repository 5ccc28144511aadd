//! State feedback law and wheel velocity filter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{dot, mean2};

use super::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Two-tap filter on the combined wheel velocity.
///
/// Each update averages the previous output with the new measurement. The output is not
/// normalised against the period, the controller's gains assume this exact form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VelocityLowpass {
    value: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VelocityLowpass {
    /// Feed a new velocity measurement in, returning the new filter output.
    pub fn update(&mut self, measured: f64) -> f64 {
        self.value = mean2(self.value, measured);
        self.value
    }

    /// Current filter output.
    ///
    /// Units: radians/second
    pub fn value(&self) -> f64 {
        self.value
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the scalar control effort `u = -K . (x - w)`.
pub fn control_law(gain: &[f64; NUM_STATES], state: &StateVector, target: &RefVector) -> f64 {
    let mut err = [0f64; NUM_STATES];
    for i in 0..NUM_STATES {
        err[i] = state.0[i] - target.0[i];
    }

    -dot(gain, &err)
}

/// Integrate the control effort over one period onto the filtered velocity.
///
/// Units: radians/second
pub fn wheel_rate_target(velocity_lp: f64, control: f64, period_s: f64) -> f64 {
    velocity_lp + control * period_s
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_error_zero_control() {
        let w = RefVector::default();
        let x = StateVector(w.0);

        assert_eq!(control_law(&DEFAULT_GAIN_K, &x, &w), 0.0);
    }

    #[test]
    fn test_roll_error() {
        let w = RefVector::default();
        let mut x = StateVector::default();
        x.0[IDX_ROLL] = 0.2415;

        let u = control_law(&DEFAULT_GAIN_K, &x, &w);

        assert_relative_eq!(u, 45.311421438, max_relative = 1e-9);
    }

    #[test]
    fn test_linear() {
        let w = RefVector([0.0; NUM_STATES]);
        let k = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = StateVector([1.0, -1.0, 0.5, 0.0, 2.0, -0.25]);

        // -(1 - 2 + 1.5 + 0 + 10 - 1.5)
        assert_eq!(control_law(&k, &x, &w), -9.0);
    }

    #[test]
    fn test_lowpass() {
        let mut lp = VelocityLowpass::default();

        assert_eq!(lp.update(1.0), 0.5);
        assert_eq!(lp.update(1.0), 0.75);
        assert_eq!(lp.update(1.0), 0.875);
        assert_eq!(lp.value(), 0.875);

        // Converges geometrically to a constant input
        let mut lp = VelocityLowpass::default();
        for n in 1..=40 {
            let y = lp.update(3.0);
            assert_relative_eq!(3.0 - y, 3.0 * 0.5f64.powi(n), max_relative = 1e-9);
        }
    }

    #[test]
    fn test_wheel_rate_target() {
        assert_relative_eq!(
            wheel_rate_target(0.0, 45.311421438, 0.08),
            3.62491371504,
            max_relative = 1e-12
        );
        assert_eq!(wheel_rate_target(1.0, 0.0, 0.08), 1.0);
    }
}
