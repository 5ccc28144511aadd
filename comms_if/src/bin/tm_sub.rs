//! Telemetry subscriber
//!
//! Prints the controller and motor telemetry published by the balance exec.

use comms_if::{
    msg::{split_frame, BalanceMsg, MotorsMsg, Topic},
    net::{zmq, MonitoredSocket, SocketOptions},
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "tm_sub", about = "Print balance exec telemetry")]
struct Opts {
    /// Endpoint of the balance exec telemetry publisher
    #[structopt(long, default_value = "tcp://localhost:5011")]
    endpoint: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();

    let ctx = zmq::Context::new();

    let socket = MonitoredSocket::new(&ctx, zmq::SUB, SocketOptions::default(), &opts.endpoint)?;

    socket.set_subscribe(Topic::Controller.as_str().as_bytes())?;
    socket.set_subscribe(Topic::Motors.as_str().as_bytes())?;

    loop {
        let frame = match socket.recv_string(0)? {
            Ok(s) => s,
            Err(_) => {
                println!("Got non UTF-8 message");
                continue;
            }
        };

        match split_frame(&frame) {
            Ok((Topic::Controller, payload)) => {
                let m: BalanceMsg = serde_json::from_str(payload)?;
                println!(
                    "[{}] motor: {:10.4} left: {:10.4} right: {:10.4}",
                    m.header.stamp, m.motor, m.motor_left, m.motor_right
                );
            }
            Ok((Topic::Motors, payload)) => {
                let m: MotorsMsg = serde_json::from_str(payload)?;
                println!(
                    "[{}] motor0: {:12.2} motor1: {:12.2}",
                    m.header.stamp, m.motor0.setpoint, m.motor1.setpoint
                );
            }
            Ok((t, _)) => println!("Unexpected topic {:?}", t),
            Err(e) => println!("Bad frame: {}", e),
        }
    }
}
