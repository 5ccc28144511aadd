//! # Messages
//!
//! Every message on the wire is a single zmq frame of the form `"<topic> <json>"`. The topic
//! prefix lets SUB sockets filter with `set_subscribe`, and lets a single socket carry several
//! streams.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Parameter change notifications
pub mod param;

/// Sensor and operator input messages
pub mod sens;

/// Telemetry messages
pub mod tm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub use param::*;
pub use sens::*;
pub use tm::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// All topics known to the balance software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Operator joystick axes
    Joy,

    /// Orientation estimated from the IMU
    OrientationImu,

    /// Orientation estimated from odometry and the wheels
    OrientationOw,

    /// Raw wheel encoder counts
    Encoders,

    /// Parameter change events
    ParamEvents,

    /// Controller telemetry
    Controller,

    /// Motor setpoints
    Motors,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMsg {
    Joy(JoyMsg),
    OrientationImu(OrientationMsg),
    OrientationOw(OrientationMsg),
    Encoders(EncodersMsg),
    ParamEvent(ParamEventMsg),
}

/// Errors which can occur when framing or parsing messages.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message has no topic separator")]
    NoSeparator,

    #[error("Unknown topic \"{0}\"")]
    UnknownTopic(String),

    #[error("Topic {0:?} is not an inbound topic")]
    NotInbound(Topic),

    #[error("Invalid message payload: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Could not serialize the message: {0}")]
    SerializationError(serde_json::Error),

    #[error("Joystick message has {0} axes, at least 2 are required")]
    MissingAxes(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Topic {
    /// All inbound topics, used to set up subscriptions.
    pub const INBOUND: [Topic; 5] = [
        Topic::Joy,
        Topic::OrientationImu,
        Topic::OrientationOw,
        Topic::Encoders,
        Topic::ParamEvents,
    ];

    /// The topic name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Joy => "joy",
            Topic::OrientationImu => "balance/orientation/imu",
            Topic::OrientationOw => "balance/orientation/ow",
            Topic::Encoders => "balance/encoders",
            Topic::ParamEvents => "parameter_events",
            Topic::Controller => "balance/controller",
            Topic::Motors => "balance/motors",
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = MsgParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "joy" => Ok(Topic::Joy),
            "balance/orientation/imu" => Ok(Topic::OrientationImu),
            "balance/orientation/ow" => Ok(Topic::OrientationOw),
            "balance/encoders" => Ok(Topic::Encoders),
            "parameter_events" => Ok(Topic::ParamEvents),
            "balance/controller" => Ok(Topic::Controller),
            "balance/motors" => Ok(Topic::Motors),
            _ => Err(MsgParseError::UnknownTopic(s.into())),
        }
    }
}

impl InboundMsg {
    /// Parse a full `"<topic> <json>"` frame into an inbound message.
    pub fn from_frame(frame: &str) -> Result<Self, MsgParseError> {
        let (topic, payload) = split_frame(frame)?;

        match topic {
            Topic::Joy => {
                let joy: JoyMsg = from_json(payload)?;
                joy.validate()?;
                Ok(InboundMsg::Joy(joy))
            }
            Topic::OrientationImu => Ok(InboundMsg::OrientationImu(from_json(payload)?)),
            Topic::OrientationOw => Ok(InboundMsg::OrientationOw(from_json(payload)?)),
            Topic::Encoders => Ok(InboundMsg::Encoders(from_json(payload)?)),
            Topic::ParamEvents => Ok(InboundMsg::ParamEvent(from_json(payload)?)),
            t => Err(MsgParseError::NotInbound(t)),
        }
    }

    /// Build the wire frame for this message.
    pub fn to_frame(&self) -> Result<String, MsgParseError> {
        match self {
            InboundMsg::Joy(m) => to_frame(Topic::Joy, m),
            InboundMsg::OrientationImu(m) => to_frame(Topic::OrientationImu, m),
            InboundMsg::OrientationOw(m) => to_frame(Topic::OrientationOw, m),
            InboundMsg::Encoders(m) => to_frame(Topic::Encoders, m),
            InboundMsg::ParamEvent(m) => to_frame(Topic::ParamEvents, m),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a `"<topic> <json>"` frame.
pub fn to_frame<T: Serialize>(topic: Topic, msg: &T) -> Result<String, MsgParseError> {
    let json = serde_json::to_string(msg).map_err(MsgParseError::SerializationError)?;

    Ok(format!("{} {}", topic.as_str(), json))
}

/// Split a frame into its topic and JSON payload.
pub fn split_frame(frame: &str) -> Result<(Topic, &str), MsgParseError> {
    let mut parts = frame.splitn(2, ' ');

    let topic = parts.next().unwrap_or("");
    let payload = parts.next().ok_or(MsgParseError::NoSeparator)?;

    Ok((topic.parse()?, payload))
}

fn from_json<T: DeserializeOwned>(payload: &str) -> Result<T, MsgParseError> {
    serde_json::from_str(payload).map_err(MsgParseError::InvalidJson)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_topic_names() {
        for t in Topic::INBOUND.iter().chain([Topic::Controller, Topic::Motors].iter()) {
            assert_eq!(t.as_str().parse::<Topic>().unwrap(), *t);
        }

        assert!(matches!(
            "balance/unknown".parse::<Topic>(),
            Err(MsgParseError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_parse_frames() {
        let msg = InboundMsg::from_frame(
            r#"balance/encoders {"encoder0":{"position":8192.0,"velocity":8192.0},"encoder1":{"position":-8192.0,"velocity":-8192.0}}"#,
        )
        .unwrap();

        match msg {
            InboundMsg::Encoders(e) => {
                assert_eq!(e.encoder0.velocity, 8192.0);
                assert_eq!(e.encoder1.position, -8192.0);
            }
            m => panic!("Expected encoders message, got {:?}", m),
        }

        let msg = InboundMsg::from_frame(r#"joy {"axes":[0.25,-1.0],"buttons":[]}"#).unwrap();
        match msg {
            InboundMsg::Joy(j) => {
                assert_eq!(j.forward(), -1.0);
                assert_eq!(j.turn(), 0.25);
            }
            m => panic!("Expected joy message, got {:?}", m),
        }
    }

    #[test]
    fn test_bad_frames() {
        assert!(matches!(
            InboundMsg::from_frame("joy"),
            Err(MsgParseError::NoSeparator)
        ));
        assert!(matches!(
            InboundMsg::from_frame("joy {\"axes\":[0.1]}"),
            Err(MsgParseError::MissingAxes(1))
        ));
        assert!(matches!(
            InboundMsg::from_frame("balance/orientation/imu {\"roll\": }"),
            Err(MsgParseError::InvalidJson(_))
        ));
        assert!(matches!(
            InboundMsg::from_frame("balance/motors {}"),
            Err(MsgParseError::NotInbound(Topic::Motors))
        ));
    }

    #[test]
    fn test_frame_prefix() {
        let frame = InboundMsg::ParamEvent(ParamEventMsg {
            changed_parameters: vec![ParamValueMsg {
                name: "main_loop".into(),
                value: 0.05,
            }],
        })
        .to_frame()
        .unwrap();

        assert!(frame.starts_with("parameter_events {"));
    }
}
