//! # TM Server
//!
//! Publishes the controller telemetry and motor setpoints at the end of every cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    msg::{self, BalanceMsg, Header, MotorSetpointMsg, MotorsMsg, MsgParseError, PidMsg, Topic},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

use crate::{
    balance_ctrl::{MotorCommand, StatusReport},
    driver::TmSink,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Frame every published message is stamped with.
pub const FRAME_ID: &str = "robot";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(MsgParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            linger: 1,
            send_timeout: 10,
            send_hwm: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.tm_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    fn send(&self, frame: String) -> Result<(), TmServerError> {
        self.socket
            .send(frame.as_str(), 0)
            .map_err(TmServerError::SendError)
    }
}

impl TmSink for TmServer {
    type Error = TmServerError;

    fn publish(&mut self, report: &StatusReport, cmd: &MotorCommand) -> Result<(), Self::Error> {
        let balance = msg::to_frame(Topic::Controller, &balance_msg(report))
            .map_err(TmServerError::SerializationError)?;
        let motors = msg::to_frame(Topic::Motors, &motors_msg(report, cmd))
            .map_err(TmServerError::SerializationError)?;

        self.send(balance)?;
        self.send(motors)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn header(report: &StatusReport) -> Header {
    Header {
        frame_id: FRAME_ID.into(),
        stamp: report.stamp,
    }
}

/// Build the controller telemetry message for a cycle.
///
/// The six state components are packed into the `roll` and `velocity` records in order.
pub fn balance_msg(report: &StatusReport) -> BalanceMsg {
    let x = &report.state.0;

    BalanceMsg {
        header: header(report),
        roll: PidMsg {
            setpoint: x[0],
            measurement: x[1],
            increment: x[2],
        },
        velocity: PidMsg {
            setpoint: x[3],
            measurement: x[4],
            increment: x[5],
        },
        motor: report.pwm_target,
        motor_left: report.wheels.left_rads,
        motor_right: report.wheels.right_rads,
    }
}

/// Build the motor setpoint message for a cycle. `motor0` is the right wheel, `motor1` the left.
pub fn motors_msg(report: &StatusReport, cmd: &MotorCommand) -> MotorsMsg {
    MotorsMsg {
        header: header(report),
        motor0: MotorSetpointMsg {
            setpoint: cmd.right_ticks,
        },
        motor1: MotorSetpointMsg {
            setpoint: cmd.left_ticks,
        },
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::balance_ctrl::{RefVector, StateVector, VelocityCommand, WheelTargets};
    use chrono::Utc;

    fn report() -> StatusReport {
        StatusReport {
            stamp: Utc::now(),
            cmd: VelocityCommand::default(),
            state: StateVector([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            target: RefVector::default(),
            control: 0.5,
            velocity_lp: 0.25,
            pwm_target: 7.0,
            wheels: WheelTargets {
                left_rads: 6.0,
                right_rads: 8.0,
            },
            pos_target_limited: false,
            non_finite_state: false,
        }
    }

    #[test]
    fn test_balance_msg() {
        let r = report();
        let m = balance_msg(&r);

        assert_eq!(m.header.frame_id, "robot");
        assert_eq!(m.header.stamp, r.stamp);
        assert_eq!(
            (m.roll.setpoint, m.roll.measurement, m.roll.increment),
            (1.0, 2.0, 3.0)
        );
        assert_eq!(
            (
                m.velocity.setpoint,
                m.velocity.measurement,
                m.velocity.increment
            ),
            (4.0, 5.0, 6.0)
        );
        assert_eq!(m.motor, 7.0);
        assert_eq!(m.motor_left, 6.0);
        assert_eq!(m.motor_right, 8.0);
    }

    #[test]
    fn test_motors_msg() {
        let r = report();
        let m = motors_msg(
            &r,
            &MotorCommand {
                left_ticks: -100.0,
                right_ticks: 200.0,
            },
        );

        assert_eq!(m.header.stamp, r.stamp);
        assert_eq!(m.motor0.setpoint, 200.0);
        assert_eq!(m.motor1.setpoint, -100.0);
    }

    #[test]
    fn test_frames() {
        let r = report();

        let frame = msg::to_frame(Topic::Controller, &balance_msg(&r)).unwrap();
        let (topic, payload) = msg::split_frame(&frame).unwrap();
        assert_eq!(topic, Topic::Controller);

        let back: BalanceMsg = serde_json::from_str(payload).unwrap();
        assert_eq!(back, balance_msg(&r));
    }
}
