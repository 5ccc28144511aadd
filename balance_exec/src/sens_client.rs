//! # Sensor Client
//!
//! Subscribes to the operator, orientation, encoder and parameter event streams. A background
//! thread receives each message as it arrives and dispatches it:
//!
//! - joystick, orientation and encoder messages are written into the [`SensStore`],
//! - parameter events are turned into [`ParamUpdate`]s and sent to the loop driver.
//!
//! Malformed messages are logged and dropped, they never reach the store. The thread also logs
//! each time the sensor publisher connects or goes away.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    msg::{InboundMsg, Topic},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, error, info, trace, warn};

use crate::{
    loop_cfg::ParamUpdate,
    sens_store::{OrientationSource, SensStore},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sensor client, owns the background receive thread.
///
/// The thread is stopped and joined when the client is dropped.
pub struct SensClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

/// Routes decoded messages to the store and the parameter channel.
#[derive(Clone)]
pub struct Dispatcher {
    store: SensStore,
    param_tx: Sender<ParamUpdate>,
}

/// Edge detector on the socket's connected flag.
#[derive(Default)]
struct LinkWatch {
    connected: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SensClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not subscribe to {0:?}: {1}")]
    SubscribeError(Topic, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SensClient {
    /// Connect to the sensor endpoint and start the background thread.
    ///
    /// Does not wait for the publisher, messages are picked up once it appears.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        dispatcher: Dispatcher,
    ) -> Result<Self, SensClientError> {
        let socket_options = SocketOptions {
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.sens_endpoint)
            .map_err(SensClientError::SocketError)?;

        for topic in Topic::INBOUND.iter() {
            socket
                .set_subscribe(topic.as_str().as_bytes())
                .map_err(|e| SensClientError::SubscribeError(*topic, e))?;
        }

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, dispatcher)
        }));

        Ok(Self { bg_jh, bg_run })
    }
}

impl Drop for SensClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                error!("SensClient background thread panicked");
            }
        }
    }
}

impl LinkWatch {
    /// Returns the new connection state if it changed.
    fn update(&mut self, connected: bool) -> Option<bool> {
        if connected == self.connected {
            return None;
        }

        self.connected = connected;
        Some(connected)
    }
}

impl Dispatcher {
    pub fn new(store: SensStore, param_tx: Sender<ParamUpdate>) -> Self {
        Self { store, param_tx }
    }

    /// Decode a raw frame and dispatch it.
    pub fn dispatch_frame(&self, frame: &str) {
        match InboundMsg::from_frame(frame) {
            Ok(m) => self.dispatch(m),
            Err(e) => warn!("Dropping inbound message: {}", e),
        }
    }

    /// Dispatch a decoded message.
    pub fn dispatch(&self, msg: InboundMsg) {
        match msg {
            InboundMsg::Joy(joy) => self.store.update_command(joy.forward(), joy.turn()),
            InboundMsg::OrientationImu(o) => {
                self.store
                    .update_orientation(OrientationSource::Imu, o.into())
            }
            InboundMsg::OrientationOw(o) => {
                self.store
                    .update_orientation(OrientationSource::Odometry, o.into())
            }
            InboundMsg::Encoders(e) => {
                // encoder1 is the left wheel, encoder0 the right
                self.store
                    .update_encoders(e.encoder1.into(), e.encoder0.into())
            }
            InboundMsg::ParamEvent(event) => {
                for p in event.changed_parameters {
                    match ParamUpdate::from_named(&p.name, p.value) {
                        Some(u) => {
                            if self.param_tx.send(u).is_err() {
                                warn!("Loop driver is gone, dropping parameter update {:?}", u);
                            }
                        }
                        None => debug!("Ignoring change to unknown parameter {}", p.name),
                    }
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, dispatches every message received until told to stop.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, dispatcher: Dispatcher) {
    let mut link = LinkWatch::default();

    while run.load(Ordering::Relaxed) {
        match link.update(socket.connected()) {
            Some(true) => info!("Sensor publisher connected"),
            Some(false) => warn!("Sensor publisher disconnected, holding the last received values"),
            None => (),
        }

        let frame = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message on the sensor socket");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving sensor message: {:?}", e);
                break;
            }
        };

        trace!("Sensor frame: {}", frame);

        dispatcher.dispatch_frame(&frame);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::{
        EncoderMsg, EncodersMsg, JoyMsg, OrientationMsg, ParamEventMsg, ParamValueMsg,
    };
    use std::{f64::consts::TAU, sync::mpsc};

    fn dispatcher() -> (Dispatcher, SensStore, mpsc::Receiver<ParamUpdate>) {
        let store = SensStore::default();
        let (tx, rx) = mpsc::channel();

        (Dispatcher::new(store.clone(), tx), store, rx)
    }

    #[test]
    fn test_joy() {
        let (d, store, _rx) = dispatcher();

        d.dispatch(InboundMsg::Joy(JoyMsg {
            axes: vec![-0.5, 0.25, 1.0],
            buttons: vec![],
        }));

        let cmd = store.snapshot().cmd;
        assert_eq!(cmd.forward, 0.25);
        assert_eq!(cmd.turn, -0.5);
    }

    #[test]
    fn test_orientation_routing() {
        let (d, store, _rx) = dispatcher();

        d.dispatch(InboundMsg::OrientationImu(OrientationMsg {
            roll: 0.1,
            ..Default::default()
        }));
        d.dispatch(InboundMsg::OrientationOw(OrientationMsg {
            pitch: 0.2,
            ..Default::default()
        }));

        let snap = store.snapshot();
        assert_eq!(snap.orientation_imu.roll, 0.1);
        assert_eq!(snap.orientation_imu.pitch, 0.0);
        assert_eq!(snap.orientation_ow.pitch, 0.2);
        assert_eq!(snap.orientation_ow.roll, 0.0);
    }

    #[test]
    fn test_encoder_mapping() {
        let (d, store, _rx) = dispatcher();

        d.dispatch(InboundMsg::Encoders(EncodersMsg {
            encoder0: EncoderMsg {
                position: 8192.0,
                velocity: 0.0,
            },
            encoder1: EncoderMsg {
                position: 8192.0,
                velocity: -8192.0,
            },
        }));

        let snap = store.snapshot();
        assert_eq!(snap.encoders.position_right, TAU);
        assert_eq!(snap.encoders.position_left, -TAU);
        assert_eq!(snap.encoders.velocity_left, TAU);
        assert_eq!(snap.wheel.position(), TAU);
        assert_eq!(snap.wheel.velocity(), TAU / 2.0);
    }

    #[test]
    fn test_param_events() {
        let (d, _store, rx) = dispatcher();

        d.dispatch(InboundMsg::ParamEvent(ParamEventMsg {
            changed_parameters: vec![
                ParamValueMsg {
                    name: "vel_cmd.turn_gain".into(),
                    value: 1.0,
                },
                ParamValueMsg {
                    name: "use_sim_time".into(),
                    value: 0.0,
                },
                ParamValueMsg {
                    name: "main_loop".into(),
                    value: 0.02,
                },
            ],
        }));

        let updates: Vec<ParamUpdate> = rx.try_iter().collect();
        assert_eq!(
            updates,
            vec![ParamUpdate::TurnGain(1.0), ParamUpdate::Period(0.02)]
        );
    }

    #[test]
    fn test_bad_frames_dropped() {
        let (d, store, rx) = dispatcher();

        d.dispatch_frame("joy {\"axes\": [0.5]}");
        d.dispatch_frame("balance/encoders not json");
        d.dispatch_frame("unknown_topic {}");
        d.dispatch_frame("balance/motors {}");

        assert_eq!(store.snapshot(), Default::default());
        assert!(rx.try_recv().is_err());

        d.dispatch_frame("joy {\"axes\": [0.5, -1.0]}");
        assert_eq!(store.snapshot().cmd.forward, -1.0);
    }

    #[test]
    fn test_link_transitions() {
        let mut link = LinkWatch::default();

        assert_eq!(link.update(false), None);
        assert_eq!(link.update(true), Some(true));
        assert_eq!(link.update(true), None);
        assert_eq!(link.update(false), Some(false));
        assert_eq!(link.update(false), None);
    }

    #[test]
    fn test_driver_gone() {
        let (d, _store, rx) = dispatcher();
        drop(rx);

        // Must not panic
        d.dispatch(InboundMsg::ParamEvent(ParamEventMsg {
            changed_parameters: vec![ParamValueMsg {
                name: "main_loop".into(),
                value: 0.1,
            }],
        }));
    }
}
