//! Logging setup for an exec.
//!
//! Records go to two places: the terminal, at whatever level the operator asked for, and the
//! session log file, which always keeps at least debug records so a run can be inspected
//! afterwards even when the terminal was kept quiet.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Level, Record};
use std::fmt::{self, Display};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Least verbose level ever written to the log file.
const FILE_MIN_LEVEL: LevelFilter = LevelFilter::Debug;

/// Crates whose own logging is capped, they are very chatty at debug.
const QUIET_TARGETS: [(&str, LevelFilter); 1] = [("zmq", LevelFilter::Info)];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `term_level` sets what is printed to stdout. The session log file gets the same records or
/// more, never less than debug. Every line is prefixed with the seconds since the session epoch.
///
/// Must only be called once per process, `log` only accepts one global logger.
pub fn logger_init(
    term_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    let file_level = file_level(term_level);

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let term = fern::Dispatch::new()
        .level(term_level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                Line::new(record, message, level_tag(record.level()))
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .level(file_level)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                Line::new(record, message, record.level())
            ))
        })
        .chain(log_file);

    let mut root = fern::Dispatch::new().level(file_level.max(term_level));
    for &(target, level) in QUIET_TARGETS.iter() {
        root = root.level_for(target, level);
    }

    root.chain(term)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Terminal log level: {:?}", term_level);
    info!("    File log level: {:?}", file_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE
// ---------------------------------------------------------------------------

/// One formatted log line.
struct Line<'a, L: Display> {
    elapsed_s: f64,
    level: L,
    target: Option<&'a str>,
    message: &'a fmt::Arguments<'a>,
}

impl<'a, L: Display> Line<'a, L> {
    fn new(record: &'a Record, message: &'a fmt::Arguments<'a>, level: L) -> Self {
        Self {
            elapsed_s: session::get_elapsed_seconds(),
            level,
            // Only debug and trace records carry their target
            target: match record.level() > Level::Info {
                true => Some(record.target()),
                false => None,
            },
            message,
        }
    }
}

impl<'a, L: Display> Display for Line<'a, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:10.6} {:3}] ", self.elapsed_s, self.level)?;

        if let Some(t) = self.target {
            write!(f, "{}: ", t)?;
        }

        write!(f, "{}", self.message)
    }
}

/// Level written to the log file for a given terminal level.
fn file_level(term_level: LevelFilter) -> LevelFilter {
    term_level.max(FILE_MIN_LEVEL)
}

/// Coloured tag for the terminal.
fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
