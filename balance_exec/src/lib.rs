//! # Balance library.
//!
//! This library allows other crates in the workspace, and the integration tests, to access items
//! defined inside the balance exec crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Balance control module - full state feedback from the robot's state to wheel rate demands
pub mod balance_ctrl;

/// Loop driver - runs balance control at a fixed period and publishes its outputs
pub mod driver;

/// Loop configuration - runtime tunable loop values and their typed updates
pub mod loop_cfg;

/// Sensor client - receives sensor and parameter streams from the network
pub mod sens_client;

/// Sensor state store - latest value of every input stream
pub mod sens_store;

/// Telemetry server - publishes controller telemetry and motor setpoints
pub mod tm_server;

/// Conversions between encoder ticks and radians
pub mod units;
