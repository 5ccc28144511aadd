//! Synthetic sensor publisher
//!
//! Publishes a joystick command, a slowly oscillating orientation on both orientation topics, and
//! encoders turning at a fixed rate. Used to exercise the balance exec on the bench without the
//! robot.

use comms_if::{
    msg::{EncoderMsg, EncodersMsg, InboundMsg, JoyMsg, OrientationMsg},
    net::{zmq, MonitoredSocket, SocketOptions},
};
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "sens_pub", about = "Publish synthetic balance robot sensor data")]
struct Opts {
    /// Endpoint to bind the publisher to
    #[structopt(long, default_value = "tcp://*:5010")]
    endpoint: String,

    /// Publishing rate
    #[structopt(long, default_value = "50")]
    rate_hz: f64,

    /// Forward joystick axis
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    forward: f32,

    /// Turn joystick axis
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    turn: f32,

    /// Amplitude of the roll oscillation in radians
    #[structopt(long, default_value = "0.05")]
    roll_amp_rad: f64,

    /// Wheel rate reported by both encoders in ticks/second
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    wheel_rate_ticks: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();
    let period = publish_period(opts.rate_hz)?;

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions {
            bind: true,
            ..Default::default()
        },
        &opts.endpoint,
    )?;

    println!("Sensor publisher open on {}", opts.endpoint);

    let start = Instant::now();

    loop {
        let t = start.elapsed().as_secs_f64();

        let roll = 0.1415 + opts.roll_amp_rad * t.sin();
        let d_roll = opts.roll_amp_rad * t.cos();
        let orientation = OrientationMsg {
            roll,
            d_roll,
            dt: period.as_secs_f64(),
            ..Default::default()
        };

        // The left encoder counts backwards
        let ticks = opts.wheel_rate_ticks * t;
        let encoders = EncodersMsg {
            encoder0: EncoderMsg {
                position: ticks,
                velocity: opts.wheel_rate_ticks,
            },
            encoder1: EncoderMsg {
                position: -ticks,
                velocity: -opts.wheel_rate_ticks,
            },
        };

        let msgs = [
            InboundMsg::Joy(JoyMsg {
                axes: vec![opts.turn, opts.forward],
                buttons: vec![],
            }),
            InboundMsg::OrientationImu(orientation),
            InboundMsg::OrientationOw(orientation),
            InboundMsg::Encoders(encoders),
        ];

        for m in msgs.iter() {
            match m.to_frame() {
                Ok(f) => {
                    if let Err(e) = socket.send(f.as_str(), 0) {
                        println!("Failed to send message: {}", e)
                    }
                }
                Err(e) => println!("Failed to build message: {}", e),
            }
        }

        std::thread::sleep(period);
    }
}

/// Time between publishes for the requested rate.
fn publish_period(rate_hz: f64) -> Result<Duration, String> {
    // Above 1 MHz the period is too short to be meaningful
    if !rate_hz.is_finite() || rate_hz <= 0.0 || rate_hz > 1e6 {
        return Err(format!("Publishing rate must be in (0, 1e6] Hz, got {}", rate_hz));
    }

    Ok(Duration::from_secs_f64(1.0 / rate_hz))
}
