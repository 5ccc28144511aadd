//! # Parameter change notifications
//!
//! The parameter service publishes the name and new value of every parameter changed by an
//! operator. Consumers map the names they care about onto typed updates.

use serde::{Deserialize, Serialize};

/// A batch of parameter changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamEventMsg {
    pub changed_parameters: Vec<ParamValueMsg>,
}

/// One changed parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamValueMsg {
    pub name: String,
    pub value: f64,
}
