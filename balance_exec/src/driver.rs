//! # Loop Driver
//!
//! Runs the balance controller at the configured period. Each cycle:
//!
//! 1. Applies any pending loop configuration updates.
//! 2. Snapshots the sensor store.
//! 3. Runs BalanceCtrl on the snapshot.
//! 4. Publishes the controller telemetry and motor setpoints.
//! 5. Archives the cycle.
//! 6. Sleeps until the next cycle is due.
//!
//! Sensor messages are dispatched into the store by the network client's own thread, so nothing
//! needs servicing between publishing and sleeping.
//!
//! If a cycle overruns its period the next one starts immediately and a warning is logged, the
//! schedule is never made up by running cycles back to back.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::{debug, info, trace, warn};
use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, TryRecvError},
    },
    thread,
    time::{Duration, Instant},
};

// Internal
use crate::{
    balance_ctrl::{BalanceCtrl, BalanceCtrlError, InputData, MotorCommand, StatusReport},
    loop_cfg::{LoopCfgError, LoopConfig, ParamUpdate},
    sens_store::SensStore,
};
use util::{archive::Archived, module::State};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive overruns after which the overrun warning is only repeated
/// occasionally.
const OVERRUN_WARN_LIMIT: u64 = 10;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination for the per-cycle outputs.
pub trait TmSink {
    type Error: Display;

    /// Publish one cycle's status report and motor command.
    fn publish(&mut self, report: &StatusReport, cmd: &MotorCommand) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The loop driver.
pub struct Driver<S: TmSink> {
    state: DriverState,

    store: SensStore,
    cfg: LoopConfig,
    param_rx: Receiver<ParamUpdate>,

    ctrl: BalanceCtrl,
    sink: S,

    num_cycles: u64,
    num_consec_overruns: u64,
    param_channel_open: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Whether the driver is cycling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: TmSink> Driver<S> {
    /// Create a new driver.
    ///
    /// `ctrl` must already be initialised. Fails if `cfg` holds values a parameter update would
    /// have been rejected for.
    pub fn new(
        store: SensStore,
        cfg: LoopConfig,
        param_rx: Receiver<ParamUpdate>,
        ctrl: BalanceCtrl,
        sink: S,
    ) -> Result<Self, LoopCfgError> {
        cfg.validate()?;

        Ok(Self {
            state: DriverState::Idle,
            store,
            cfg,
            param_rx,
            ctrl,
            sink,
            num_cycles: 0,
            num_consec_overruns: 0,
            param_channel_open: true,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Loop configuration currently in force.
    pub fn cfg(&self) -> &LoopConfig {
        &self.cfg
    }

    pub fn ctrl(&self) -> &BalanceCtrl {
        &self.ctrl
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Number of cycles run so far.
    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    /// Apply every update waiting on the parameter channel, in arrival order.
    ///
    /// Rejected updates are logged and skipped.
    pub fn apply_param_updates(&mut self) {
        while self.param_channel_open {
            let update = match self.param_rx.try_recv() {
                Ok(u) => u,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Parameter update channel closed, config is now fixed");
                    self.param_channel_open = false;
                    break;
                }
            };

            match self.cfg.apply(update) {
                Ok(()) => info!("Loop parameter {} set to {:?}", update.name(), update),
                Err(e) => warn!("Rejected loop parameter update: {}", e),
            }
        }
    }

    /// Run a single cycle, without any scheduling.
    ///
    /// Publishing and archiving failures are logged and do not fail the cycle.
    pub fn run_cycle(&mut self) -> Result<(MotorCommand, StatusReport), BalanceCtrlError> {
        self.apply_param_updates();

        let input = InputData {
            sens: self.store.snapshot(),
            cfg: self.cfg,
            stamp: Utc::now(),
        };

        let (output, report) = self.ctrl.proc(&input)?;

        if let Err(e) = self.sink.publish(&report, &output) {
            warn!("Could not publish cycle outputs: {}", e);
        }

        if let Err(e) = self.ctrl.write() {
            warn!("Could not archive BalanceCtrl: {}", e);
        }

        self.num_cycles += 1;

        Ok((output, report))
    }

    /// Run cycles until `alive` is cleared, or until `max_cycles` cycles have run in total.
    ///
    /// `alive` is checked once per cycle, before the cycle starts. Returns the number of cycles
    /// run by this call.
    pub fn run(&mut self, alive: &AtomicBool, max_cycles: Option<u64>) -> Result<u64, BalanceCtrlError> {
        let start_cycles = self.num_cycles;

        self.state = DriverState::Running;
        info!("Loop driver running at {} s period", self.cfg.period_s);

        let result = self.run_loop(alive, max_cycles);

        self.state = DriverState::Idle;
        let num_run = self.num_cycles - start_cycles;

        match result {
            Ok(()) => info!("Loop driver stopped after {} cycles", num_run),
            Err(ref e) => warn!("Loop driver stopped after {} cycles: {}", num_run, e),
        }

        result.map(|_| num_run)
    }

    fn run_loop(&mut self, alive: &AtomicBool, max_cycles: Option<u64>) -> Result<(), BalanceCtrlError> {
        while alive.load(Ordering::Relaxed) {
            if let Some(max) = max_cycles {
                if self.num_cycles >= max {
                    break;
                }
            }

            let cycle_start = Instant::now();

            self.run_cycle()?;

            // Period in force for the cycle just run, updates only land at the start of a cycle
            let period = Duration::from_secs_f64(self.cfg.period_s);
            let elapsed = cycle_start.elapsed();

            match period.checked_sub(elapsed) {
                Some(remaining) => {
                    self.num_consec_overruns = 0;
                    trace!("Cycle took {:?}, sleeping {:?}", elapsed, remaining);
                    thread::sleep(remaining);
                }
                None => {
                    self.num_consec_overruns += 1;

                    if self.num_consec_overruns <= OVERRUN_WARN_LIMIT
                        || self.num_consec_overruns % 100 == 0
                    {
                        warn!(
                            "Cycle overran by {:.6} s ({} consecutive)",
                            (elapsed - period).as_secs_f64(),
                            self.num_consec_overruns
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::balance_ctrl::InitData;
    use std::sync::{mpsc, Arc};

    #[derive(Default)]
    struct VecSink {
        published: Vec<(StatusReport, MotorCommand)>,
        fail: bool,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl TmSink for VecSink {
        type Error = String;

        fn publish(&mut self, report: &StatusReport, cmd: &MotorCommand) -> Result<(), String> {
            self.published.push((*report, *cmd));

            if let Some((n, ref alive)) = self.stop_after {
                if self.published.len() >= n {
                    alive.store(false, Ordering::Relaxed);
                }
            }

            match self.fail {
                true => Err("sink down".into()),
                false => Ok(()),
            }
        }
    }

    fn driver(sink: VecSink, cfg: LoopConfig) -> (Driver<VecSink>, mpsc::Sender<ParamUpdate>) {
        let mut ctrl = BalanceCtrl::default();
        ctrl.init(InitData::default()).unwrap();

        let (tx, rx) = mpsc::channel();

        (Driver::new(SensStore::default(), cfg, rx, ctrl, sink).unwrap(), tx)
    }

    fn fast_cfg() -> LoopConfig {
        LoopConfig {
            period_s: 0.001,
            ..Default::default()
        }
    }

    #[test]
    fn test_uninitialised_ctrl() {
        let (_tx, rx) = mpsc::channel();
        let mut d = Driver::new(
            SensStore::default(),
            LoopConfig::default(),
            rx,
            BalanceCtrl::default(),
            VecSink::default(),
        )
        .unwrap();

        assert!(d.run_cycle().is_err());
        assert!(d.run(&AtomicBool::new(true), Some(5)).is_err());
        assert_eq!(d.state(), DriverState::Idle);
        assert!(d.sink().published.is_empty());
    }

    #[test]
    fn test_cycle_publishes() {
        let (mut d, _tx) = driver(VecSink::default(), LoopConfig::default());

        let (out, report) = d.run_cycle().unwrap();

        assert_eq!(d.num_cycles(), 1);
        assert_eq!(d.sink().published.len(), 1);
        assert_eq!(d.sink().published[0].1, out);
        assert_eq!(d.sink().published[0].0.pwm_target, report.pwm_target);
    }

    #[test]
    fn test_sink_failure_not_fatal() {
        let (mut d, _tx) = driver(
            VecSink {
                fail: true,
                ..Default::default()
            },
            fast_cfg(),
        );

        assert_eq!(d.run(&AtomicBool::new(true), Some(3)).unwrap(), 3);
        assert_eq!(d.sink().published.len(), 3);
    }

    #[test]
    fn test_params_applied_at_cycle_start() {
        let (mut d, tx) = driver(VecSink::default(), LoopConfig::default());

        tx.send(ParamUpdate::ForwardGain(0.1)).unwrap();
        tx.send(ParamUpdate::Period(0.0)).unwrap();
        tx.send(ParamUpdate::TurnGain(1.0)).unwrap();
        tx.send(ParamUpdate::TurnGain(2.0)).unwrap();

        // Nothing applied until a cycle starts
        assert_eq!(d.cfg(), &LoopConfig::default());

        let (_, report) = d.run_cycle().unwrap();

        assert_eq!(d.cfg().forward_gain, 0.1);
        assert_eq!(d.cfg().turn_gain, 2.0);
        assert_eq!(d.cfg().period_s, 0.08);
        assert_eq!(report.cmd.forward_gain, 0.1);
        assert_eq!(report.cmd.turn_gain, 2.0);
    }

    #[test]
    fn test_closed_param_channel() {
        let (mut d, tx) = driver(VecSink::default(), LoopConfig::default());

        tx.send(ParamUpdate::VelLowpass(3.0)).unwrap();
        drop(tx);

        d.run_cycle().unwrap();
        d.run_cycle().unwrap();

        assert_eq!(d.cfg().vel_lowpass, 3.0);
    }

    #[test]
    fn test_stops_on_shutdown() {
        let alive = Arc::new(AtomicBool::new(true));
        let (mut d, _tx) = driver(
            VecSink {
                stop_after: Some((4, alive.clone())),
                ..Default::default()
            },
            fast_cfg(),
        );

        let n = d.run(&alive, None).unwrap();

        assert_eq!(n, 4);
        assert_eq!(d.state(), DriverState::Idle);
    }

    #[test]
    fn test_bad_initial_config() {
        let (_tx, rx) = mpsc::channel();
        let r = Driver::new(
            SensStore::default(),
            LoopConfig {
                period_s: -0.08,
                ..Default::default()
            },
            rx,
            BalanceCtrl::default(),
            VecSink::default(),
        );

        assert!(r.is_err());
    }

    #[test]
    fn test_oversized_period_ignored() {
        let (mut d, tx) = driver(VecSink::default(), fast_cfg());

        tx.send(ParamUpdate::Period(1e20)).unwrap();

        // The update is dropped at the cycle boundary and the loop keeps its period
        assert_eq!(d.run(&AtomicBool::new(true), Some(2)).unwrap(), 2);
        assert_eq!(d.cfg().period_s, 0.001);
        assert_eq!(d.state(), DriverState::Idle);
    }

    #[test]
    fn test_not_alive_runs_nothing() {
        let (mut d, _tx) = driver(VecSink::default(), fast_cfg());

        assert_eq!(d.run(&AtomicBool::new(false), None).unwrap(), 0);
        assert!(d.sink().published.is_empty());
    }

    #[test]
    fn test_period_schedule() {
        let (mut d, _tx) = driver(
            VecSink::default(),
            LoopConfig {
                period_s: 0.01,
                ..Default::default()
            },
        );

        let start = Instant::now();
        d.run(&AtomicBool::new(true), Some(5)).unwrap();

        // Five full periods are slept through, cycles are much shorter than the period
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
