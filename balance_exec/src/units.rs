//! Conversions between encoder ticks and radians

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Encoder counts per wheel revolution.
pub const TICKS_PER_REV: f64 = 8192.0;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert an encoder quantity (ticks or ticks/second) into radians (or
/// radians/second).
pub fn ticks_to_rad(ticks: f64) -> f64 {
    ticks * 2.0 * PI / TICKS_PER_REV
}

/// Convert radians (or radians/second) into encoder ticks (or ticks/second).
pub fn rad_to_ticks(rad: f64) -> f64 {
    rad * TICKS_PER_REV / (2.0 * PI)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
