//! Logging control for embedders.
//!
//! The engine logs through the `log` facade, so nothing is emitted until the
//! host process installs a logger. Hosts without one of their own can call
//! [`lance_init_logging`] once to route engine records to stderr.

use std::ffi::c_int;

use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Verbosity accepted by [`lance_init_logging`]. Unknown values clamp to
/// trace, the noisiest level.
pub const LANCE_LOG_OFF: u8 = 0;
pub const LANCE_LOG_ERROR: u8 = 1;
pub const LANCE_LOG_WARN: u8 = 2;
pub const LANCE_LOG_INFO: u8 = 3;
pub const LANCE_LOG_DEBUG: u8 = 4;
pub const LANCE_LOG_TRACE: u8 = 5;

fn level_filter(level: u8) -> LevelFilter {
    match level {
        LANCE_LOG_OFF => LevelFilter::Off,
        LANCE_LOG_ERROR => LevelFilter::Error,
        LANCE_LOG_WARN => LevelFilter::Warn,
        LANCE_LOG_INFO => LevelFilter::Info,
        LANCE_LOG_DEBUG => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Route engine log records to stderr at the given verbosity.
///
/// Returns 0 on success and -1 if a logger is already registered with the
/// `log` facade, in which case the existing logger keeps receiving records.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lance_init_logging(level: u8) -> c_int {
    // Record targets are the engine's module paths; thread ids are noise in
    // a single-file storage library.
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Error)
        .build();

    match TermLogger::init(
        level_filter(level),
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}
