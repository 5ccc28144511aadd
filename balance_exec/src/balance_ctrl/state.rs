//! Implementations for the BalanceCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::Serialize;

// Internal
use super::*;
use crate::{loop_cfg::LoopConfig, sens_store::SensSnapshot};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Balance control module state
#[derive(Default)]
pub struct BalanceCtrl {
    pub(crate) params: Params,
    initialised: bool,

    target: RefVector,
    velocity_lp: VelocityLowpass,

    pub(crate) report: Option<StatusReport>,
    pub(crate) output: Option<OutputData>,
    arch_report: Archiver,
}

/// Data needed to initialise BalanceCtrl.
#[derive(Default)]
pub struct InitData {
    pub params: Params,

    /// Archiver for the per-cycle report, use `Archiver::default()` to disable archiving.
    pub archiver: Archiver,
}

/// Input data to Balance Control.
#[derive(Clone, Copy, Debug)]
pub struct InputData {
    /// Snapshot of the sensor store taken at the start of the cycle
    pub sens: SensSnapshot,

    /// Loop configuration in force for this cycle
    pub cfg: LoopConfig,

    /// Capture time of the cycle
    pub stamp: DateTime<Utc>,
}

/// Output of BalanceCtrl, the motor setpoints for this cycle.
pub type OutputData = MotorCommand;

/// Status report for BalanceCtrl processing.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatusReport {
    pub stamp: DateTime<Utc>,

    pub cmd: VelocityCommand,
    pub state: StateVector,
    pub target: RefVector,

    /// Scalar control effort
    pub control: f64,

    /// Filtered combined wheel velocity.
    ///
    /// Units: radians/second
    pub velocity_lp: f64,

    /// Combined wheel rate target before the turn differential.
    ///
    /// Units: radians/second
    pub pwm_target: f64,

    pub wheels: WheelTargets,

    /// The position target was pulled back inside its window this cycle
    pub pos_target_limited: bool,

    /// At least one state component was NaN or infinite this cycle
    pub non_finite_state: bool,
}

/// Flat form of a cycle's report and output, one CSV row per cycle.
#[derive(Serialize)]
struct ArchRecord {
    time_s: f64,
    forward: f64,
    turn: f64,
    roll: f64,
    d_roll: f64,
    pitch_ow: f64,
    d_pitch_ow: f64,
    wheel_pos: f64,
    wheel_vel: f64,
    target_roll: f64,
    target_wheel_pos: f64,
    target_wheel_vel: f64,
    control: f64,
    velocity_lp: f64,
    pwm_target: f64,
    pwm_left: f64,
    pwm_right: f64,
    motor_left_ticks: f64,
    motor_right_ticks: f64,
    pos_target_limited: bool,
    non_finite_state: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for BalanceCtrl {
    type InitData = InitData;
    type InitError = BalanceCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = BalanceCtrlError;

    /// Initialise the BalanceCtrl module.
    ///
    /// Resets the reference vector to the initial target and clears the velocity filter.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.params.validate()?;

        self.target = RefVector(init_data.params.target_init);
        self.velocity_lp = VelocityLowpass::default();
        self.params = init_data.params;
        self.arch_report = init_data.archiver;

        self.report = None;
        self.output = None;
        self.initialised = true;

        debug!(
            "BalanceCtrl initialised with K = {:?}, w0 = {:?}",
            self.params.gain_k, self.target.0
        );

        Ok(())
    }

    /// Perform cyclic processing of Balance Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(BalanceCtrlError::NotInitialised);
        }

        let sens = &input_data.sens;
        let cmd = VelocityCommand::new(sens.cmd, &input_data.cfg);

        // Measured state
        let state = StateVector::assemble(&sens.orientation_imu, &sens.orientation_ow, &sens.wheel);

        let non_finite_state = !state.is_finite();
        if non_finite_state {
            warn!("Non-finite component in state vector: {:?}", state.0);
        }

        // Reference
        let pos_target_limited = self
            .target
            .advance(&state, &cmd, self.params.pos_window_rad);
        if pos_target_limited {
            debug!(
                "Wheel position target limited to {:.4} rad (measured {:.4} rad)",
                self.target.wheel_pos(),
                state.wheel_pos()
            );
        }

        // Control
        let control = control_law(&self.params.gain_k, &state, &self.target);
        let velocity_lp = self.velocity_lp.update(state.wheel_vel());
        let pwm_target = wheel_rate_target(velocity_lp, control, input_data.cfg.period_s);

        // Shaping
        let wheels = WheelTargets::from_combined(pwm_target, &cmd);
        let output = MotorCommand::from(wheels);

        trace!(
            "BalanceCtrl:\n    x: {:?}\n    w: {:?}\n    u: {:.4}, pwm: {:.4}, left: {:.4}, right: {:.4}",
            state.0,
            self.target.0,
            control,
            pwm_target,
            wheels.left_rads,
            wheels.right_rads
        );

        let report = StatusReport {
            stamp: input_data.stamp,
            cmd,
            state,
            target: self.target,
            control,
            velocity_lp,
            pwm_target,
            wheels,
            pos_target_limited,
            non_finite_state,
        };

        self.report = Some(report);
        self.output = Some(output);

        Ok((output, report))
    }
}

impl Archived for BalanceCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let (report, output) = match (self.report, self.output) {
            (Some(r), Some(o)) => (r, o),
            _ => return Ok(()),
        };

        self.arch_report.serialise(ArchRecord {
            time_s: session::get_elapsed_seconds(),
            forward: report.cmd.forward,
            turn: report.cmd.turn,
            roll: report.state.0[IDX_ROLL],
            d_roll: report.state.0[IDX_D_ROLL],
            pitch_ow: report.state.0[IDX_PITCH_OW],
            d_pitch_ow: report.state.0[IDX_D_PITCH_OW],
            wheel_pos: report.state.0[IDX_WHEEL_POS],
            wheel_vel: report.state.0[IDX_WHEEL_VEL],
            target_roll: report.target.0[IDX_ROLL],
            target_wheel_pos: report.target.0[IDX_WHEEL_POS],
            target_wheel_vel: report.target.0[IDX_WHEEL_VEL],
            control: report.control,
            velocity_lp: report.velocity_lp,
            pwm_target: report.pwm_target,
            pwm_left: report.wheels.left_rads,
            pwm_right: report.wheels.right_rads,
            motor_left_ticks: output.left_ticks,
            motor_right_ticks: output.right_ticks,
            pos_target_limited: report.pos_target_limited,
            non_finite_state: report.non_finite_state,
        })
    }
}

impl BalanceCtrl {
    /// Current reference vector.
    pub fn target(&self) -> &RefVector {
        &self.target
    }

    /// Current output of the wheel velocity filter.
    pub fn velocity_lp(&self) -> f64 {
        self.velocity_lp.value()
    }

    /// Parameters in use.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sens_store::{OperatorCmd, RawEncoder, SensStore};
    use approx::assert_relative_eq;

    fn init_ctrl() -> BalanceCtrl {
        let mut ctrl = BalanceCtrl::default();
        ctrl.init(InitData::default()).unwrap();
        ctrl
    }

    fn input(sens: SensSnapshot) -> InputData {
        InputData {
            sens,
            cfg: LoopConfig::default(),
            stamp: Utc::now(),
        }
    }

    #[test]
    fn test_proc_before_init() {
        let mut ctrl = BalanceCtrl::default();

        assert!(matches!(
            ctrl.proc(&input(SensSnapshot::default())),
            Err(BalanceCtrlError::NotInitialised)
        ));
    }

    #[test]
    fn test_bad_params_rejected() {
        let mut ctrl = BalanceCtrl::default();
        let mut params = Params::default();
        params.pos_window_rad = -1.0;

        assert!(ctrl
            .init(InitData {
                params,
                ..Default::default()
            })
            .is_err());
        assert!(ctrl.proc(&input(SensSnapshot::default())).is_err());
    }

    #[test]
    fn test_at_target_zero_output() {
        let mut ctrl = init_ctrl();

        let store = SensStore::default();
        store.update_orientation(
            crate::sens_store::OrientationSource::Imu,
            crate::sens_store::OrientationSample {
                roll: 0.1415,
                ..Default::default()
            },
        );

        let (out, report) = ctrl.proc(&input(store.snapshot())).unwrap();

        assert_eq!(report.control, 0.0);
        assert_eq!(report.pwm_target, 0.0);
        assert_eq!(out.left_ticks, 0.0);
        assert_eq!(out.right_ticks, 0.0);
        assert!(!report.pos_target_limited);
        assert!(!report.non_finite_state);
    }

    #[test]
    fn test_filter_persists_between_cycles() {
        let mut ctrl = init_ctrl();

        let store = SensStore::default();
        store.update_encoders(
            RawEncoder {
                position: 0.0,
                velocity: -8192.0,
            },
            RawEncoder {
                position: 0.0,
                velocity: 8192.0,
            },
        );

        let snap = store.snapshot();
        let (_, r1) = ctrl.proc(&input(snap)).unwrap();
        let (_, r2) = ctrl.proc(&input(snap)).unwrap();

        assert_relative_eq!(r1.velocity_lp, std::f64::consts::PI);
        assert_relative_eq!(r2.velocity_lp, 1.5 * std::f64::consts::PI);
        assert_eq!(ctrl.velocity_lp(), r2.velocity_lp);

        // Re-initialising clears it
        ctrl.init(InitData::default()).unwrap();
        assert_eq!(ctrl.velocity_lp(), 0.0);
    }

    #[test]
    fn test_non_finite_flagged() {
        let mut ctrl = init_ctrl();

        let mut snap = SensSnapshot::default();
        snap.orientation_ow.d_pitch = f64::INFINITY;

        let (out, report) = ctrl.proc(&input(snap)).unwrap();

        assert!(report.non_finite_state);
        assert!(!out.left_ticks.is_finite());
    }

    #[test]
    fn test_forward_moves_target() {
        let mut ctrl = init_ctrl();

        let mut snap = SensSnapshot::default();
        snap.cmd = OperatorCmd {
            forward: 1.0,
            turn: 0.0,
        };

        for _ in 0..4 {
            ctrl.proc(&input(snap)).unwrap();
        }

        assert_relative_eq!(ctrl.target().wheel_pos(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_archive_inactive() {
        let mut ctrl = init_ctrl();

        // Nothing to write yet, and a default archiver discards records
        assert!(ctrl.write().is_ok());
        ctrl.proc(&input(SensSnapshot::default())).unwrap();
        assert!(ctrl.write().is_ok());
    }

    #[test]
    fn test_archive_rows() {
        let path = std::env::temp_dir().join(format!(
            "balance_ctrl_report_{}.csv",
            std::process::id()
        ));
        let writer = util::archive::Writer::from_path(&path).unwrap();

        let mut ctrl = BalanceCtrl::default();
        ctrl.init(InitData {
            params: Params::default(),
            archiver: Archiver::from_writer(writer),
        })
        .unwrap();

        let mut snap = SensSnapshot::default();
        snap.cmd = OperatorCmd {
            forward: 1.0,
            turn: 0.5,
        };

        for _ in 0..2 {
            ctrl.proc(&input(snap)).unwrap();
            ctrl.write().unwrap();
        }

        // Each write is flushed, so the file is complete while the archiver is still open
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "time_s,forward,turn,roll,d_roll,pitch_ow,d_pitch_ow,wheel_pos,wheel_vel,\
             target_roll,target_wheel_pos,target_wheel_vel,control,velocity_lp,pwm_target,\
             pwm_left,pwm_right,motor_left_ticks,motor_right_ticks,pos_target_limited,\
             non_finite_state"
        );

        let rows: Vec<Vec<&str>> = lines[1..].iter().map(|l| l.split(',').collect()).collect();
        for row in rows.iter() {
            assert_eq!(row.len(), 21);
            assert_eq!(row[1], "1.0");
            assert_eq!(row[2], "0.5");
            assert_eq!(row[19], "false");
            assert_eq!(row[20], "false");
        }

        // Wheel position target moves by the forward increment every cycle
        let target_pos: Vec<f64> = rows.iter().map(|r| r[10].parse().unwrap()).collect();
        assert_relative_eq!(target_pos[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(target_pos[1], 0.1, epsilon = 1e-12);
    }
}
