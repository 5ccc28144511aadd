//! # Loop configuration
//!
//! Values which can change while the loop is running. Changes arrive as named updates from the
//! parameter event stream, are turned into typed [`ParamUpdate`]s by the network client, and are
//! applied by the driver between cycles so that one cycle always sees one configuration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Longest accepted loop period. The robot cannot stay upright anywhere near this slow, but it
/// keeps the period representable as a sleep duration.
///
/// Units: seconds
pub const MAX_PERIOD_S: f64 = 10.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Hot-reloadable loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Control period, used both to schedule the loop and to scale the control effort.
    ///
    /// Units: seconds
    pub period_s: f64,

    /// Reserved velocity filter constant. Accepted and stored, but the velocity filter does not
    /// use it.
    pub vel_lowpass: f64,

    /// Scale from the forward command axis to wheel position target rate.
    ///
    /// Units: radians/cycle
    pub forward_gain: f64,

    /// Scale from the turn command axis to wheel rate differential.
    ///
    /// Units: radians/second
    pub turn_gain: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single change to the loop configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamUpdate {
    ForwardGain(f64),
    TurnGain(f64),
    Period(f64),
    VelLowpass(f64),
}

/// Reasons an update can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum LoopCfgError {
    #[error("Loop period must be positive, finite and no more than 10 s, got {0}")]
    InvalidPeriod(f64),

    #[error("Value for {0} must be finite, got {1}")]
    NonFinite(&'static str, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            period_s: 0.08,
            vel_lowpass: 20.0,
            forward_gain: 0.05,
            turn_gain: 3.0,
        }
    }
}

impl LoopConfig {
    /// Apply an update, leaving the config untouched if the value is rejected.
    pub fn apply(&mut self, update: ParamUpdate) -> Result<(), LoopCfgError> {
        match update {
            ParamUpdate::Period(p) => {
                if !p.is_finite() || p <= 0.0 || p > MAX_PERIOD_S {
                    return Err(LoopCfgError::InvalidPeriod(p));
                }
                self.period_s = p;
            }
            ParamUpdate::ForwardGain(g) => self.forward_gain = finite(update.name(), g)?,
            ParamUpdate::TurnGain(g) => self.turn_gain = finite(update.name(), g)?,
            ParamUpdate::VelLowpass(v) => self.vel_lowpass = finite(update.name(), v)?,
        }

        Ok(())
    }

    /// Check that every value is one `apply` would have accepted.
    pub fn validate(&self) -> Result<(), LoopCfgError> {
        let mut check = Self::default();

        check.apply(ParamUpdate::Period(self.period_s))?;
        check.apply(ParamUpdate::ForwardGain(self.forward_gain))?;
        check.apply(ParamUpdate::TurnGain(self.turn_gain))?;
        check.apply(ParamUpdate::VelLowpass(self.vel_lowpass))?;

        Ok(())
    }
}

impl ParamUpdate {
    /// Build an update from its external parameter name.
    ///
    /// Returns `None` for names that aren't loop parameters.
    pub fn from_named(name: &str, value: f64) -> Option<Self> {
        match name {
            "vel_cmd.forward_gain" => Some(Self::ForwardGain(value)),
            "vel_cmd.turn_gain" => Some(Self::TurnGain(value)),
            "main_loop" => Some(Self::Period(value)),
            "vel_lowpass" => Some(Self::VelLowpass(value)),
            _ => None,
        }
    }

    /// External name of the parameter this update targets.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ForwardGain(_) => "vel_cmd.forward_gain",
            Self::TurnGain(_) => "vel_cmd.turn_gain",
            Self::Period(_) => "main_loop",
            Self::VelLowpass(_) => "vel_lowpass",
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64, LoopCfgError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoopCfgError::NonFinite(name, value))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LoopConfig::default();

        assert_eq!(cfg.period_s, 0.08);
        assert_eq!(cfg.vel_lowpass, 20.0);
        assert_eq!(cfg.forward_gain, 0.05);
        assert_eq!(cfg.turn_gain, 3.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_named() {
        assert_eq!(
            ParamUpdate::from_named("vel_cmd.forward_gain", 0.1),
            Some(ParamUpdate::ForwardGain(0.1))
        );
        assert_eq!(
            ParamUpdate::from_named("vel_cmd.turn_gain", 2.0),
            Some(ParamUpdate::TurnGain(2.0))
        );
        assert_eq!(
            ParamUpdate::from_named("main_loop", 0.02),
            Some(ParamUpdate::Period(0.02))
        );
        assert_eq!(
            ParamUpdate::from_named("vel_lowpass", 5.0),
            Some(ParamUpdate::VelLowpass(5.0))
        );
        assert_eq!(ParamUpdate::from_named("use_sim_time", 1.0), None);
        assert_eq!(ParamUpdate::from_named("forward_gain", 1.0), None);

        for u in [
            ParamUpdate::ForwardGain(1.0),
            ParamUpdate::TurnGain(1.0),
            ParamUpdate::Period(1.0),
            ParamUpdate::VelLowpass(1.0),
        ]
        .iter()
        {
            assert_eq!(ParamUpdate::from_named(u.name(), 1.0), Some(*u));
        }
    }

    #[test]
    fn test_apply() {
        let mut cfg = LoopConfig::default();

        cfg.apply(ParamUpdate::ForwardGain(0.1)).unwrap();
        cfg.apply(ParamUpdate::TurnGain(-1.5)).unwrap();
        cfg.apply(ParamUpdate::Period(0.02)).unwrap();
        cfg.apply(ParamUpdate::VelLowpass(7.0)).unwrap();

        assert_eq!(
            cfg,
            LoopConfig {
                period_s: 0.02,
                vel_lowpass: 7.0,
                forward_gain: 0.1,
                turn_gain: -1.5,
            }
        );
    }

    #[test]
    fn test_bad_period_rejected() {
        let mut cfg = LoopConfig::default();

        let bad = [0.0, -0.08, f64::NAN, f64::INFINITY, 1e20, MAX_PERIOD_S + 0.1];
        for &p in bad.iter() {
            assert!(cfg.apply(ParamUpdate::Period(p)).is_err());
        }
        assert!(cfg.apply(ParamUpdate::TurnGain(f64::NAN)).is_err());

        // Untouched after the rejections
        assert_eq!(cfg, LoopConfig::default());
    }

    #[test]
    fn test_period_upper_bound() {
        let mut cfg = LoopConfig::default();

        cfg.apply(ParamUpdate::Period(MAX_PERIOD_S)).unwrap();
        assert_eq!(cfg.period_s, MAX_PERIOD_S);

        assert_eq!(
            cfg.apply(ParamUpdate::Period(1e20)),
            Err(LoopCfgError::InvalidPeriod(1e20))
        );
        assert_eq!(cfg.period_s, MAX_PERIOD_S);

        let from_file = LoopConfig {
            period_s: 1e20,
            ..Default::default()
        };
        assert!(from_file.validate().is_err());
    }

    #[test]
    fn test_validate() {
        let cfg = LoopConfig {
            period_s: 0.0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(LoopCfgError::InvalidPeriod(0.0)));
    }
}
