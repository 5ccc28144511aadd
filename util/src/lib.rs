//! Utility library for the balance robot software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod logger;
pub mod maths;
pub mod module;
pub mod params;
pub mod session;
pub mod time;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the environment variable pointing at the software root, which
/// contains the `params` directory and where session directories are created.
pub const SW_ROOT_ENV_VAR: &str = "BALANCE_SW_ROOT";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<std::path::PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(std::path::PathBuf::from)
}
