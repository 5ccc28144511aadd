//! Main balance robot executable entry point.
//!
//! # Architecture
//!
//! The executable consists of:
//!
//!     - A sensor client thread, which writes every inbound sensor message into the sensor store
//!       and forwards parameter changes to the loop driver.
//!     - The loop driver on the main thread, which each cycle:
//!         - Applies pending parameter changes
//!         - Snapshots the sensor store
//!         - Runs balance control
//!         - Publishes telemetry and motor setpoints
//!         - Archives the cycle
//!
//! The loop runs until SIGINT/SIGTERM is received.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use structopt::StructOpt;

// Internal
use balance_lib::{
    balance_ctrl::{BalanceCtrl, InitData, Params},
    driver::Driver,
    sens_client::{Dispatcher, SensClient},
    sens_store::SensStore,
    tm_server::TmServer,
};
use comms_if::net::{zmq, NetParams};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "balance_exec", about = "Two wheeled balance robot controller")]
struct Opts {
    /// Balance control parameter file, relative to the params directory
    #[structopt(long, default_value = "balance_ctrl.toml")]
    params: String,

    /// Network parameter file, relative to the params directory
    #[structopt(long, default_value = "net.toml")]
    net_params: String,

    /// Don't write the per-cycle archive
    #[structopt(long)]
    no_archive: bool,

    /// Stop after this many cycles
    #[structopt(long)]
    max_cycles: Option<u64>,

    /// Terminal log level, the session log file always records at least debug
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("balance_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    info!("Balance Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load(&opts.net_params).wrap_err("Could not load net params")?;

    let ctrl_params: Params =
        util::params::load(&opts.params).wrap_err("Could not load balance control params")?;
    let loop_cfg = ctrl_params.loop_cfg;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let archiver = match opts.no_archive {
        true => {
            info!("Archiving disabled");
            Archiver::default()
        }
        false => Archiver::from_path(&session, "balance_ctrl/report.csv")
            .wrap_err("Failed to create the BalanceCtrl archive")?,
    };

    let mut balance_ctrl = BalanceCtrl::default();
    balance_ctrl
        .init(InitData {
            params: ctrl_params,
            archiver,
        })
        .wrap_err("Failed to initialise BalanceCtrl")?;
    info!("BalanceCtrl init complete");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();
    let store = SensStore::default();
    let (param_tx, param_rx) = mpsc::channel();

    let _sens_client = SensClient::new(
        &zmq_ctx,
        &net_params,
        Dispatcher::new(store.clone(), param_tx),
    )
    .wrap_err("Failed to initialise the SensClient")?;
    info!("SensClient connecting to {}", net_params.sens_endpoint);

    let tm_server =
        TmServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the TmServer")?;
    info!("TmServer bound to {}", net_params.tm_endpoint);

    // ---- SHUTDOWN HANDLING ----

    let alive = Arc::new(AtomicBool::new(true));
    {
        let alive = alive.clone();
        ctrlc::set_handler(move || alive.store(false, Ordering::Relaxed))
            .wrap_err("Failed to set the shutdown handler")?;
    }

    // ---- MAIN LOOP ----

    let mut driver = Driver::new(store, loop_cfg, param_rx, balance_ctrl, tm_server)
        .wrap_err("Invalid loop configuration")?;

    info!("Initialisation complete, starting loop\n");

    let num_cycles = driver
        .run(&alive, opts.max_cycles)
        .wrap_err("Loop driver failed")?;

    info!("End of execution after {} cycles", num_cycles);

    Ok(())
}
