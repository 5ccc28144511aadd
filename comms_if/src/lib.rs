//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the balance robot software: the messages
//! exchanged with the sensor bridge and telemetry consumers, and the networking layer they travel
//! over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions and topic framing
pub mod msg;

/// Network module
pub mod net;
