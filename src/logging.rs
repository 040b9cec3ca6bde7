use env_logger::{Builder, Env};
use log::LevelFilter;

use crate::constants::LOG_ENV_VAR;

/// Initialize logging, given a verbosity level.
///
/// The level is the difference between `-v` and `-q` occurrences on the command line.
/// The environment variable [`LOG_ENV_VAR`], if set, takes precedence.
pub fn init(verbosity_level: i8) {
    let default_level = level_filter_from(verbosity_level);

    Builder::new()
        .filter_level(default_level)
        .parse_env(Env::new().filter(LOG_ENV_VAR))
        .format_timestamp_millis()
        .init();

    trace!("Logging initialized at level {default_level}");
}

fn level_filter_from(verbosity_level: i8) -> LevelFilter {
    match verbosity_level {
        i8::MIN..=-2 => LevelFilter::Off,
        -1 => LevelFilter::Error,
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        3..=i8::MAX => LevelFilter::Trace,
    }
}
