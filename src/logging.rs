//! Logging setup for embedders and tests
//!
//! The library only logs through the `log` facade. Binaries or job
//! runtimes that embed it call [`init`] once at startup.

use log::LevelFilter;

/// Map a verbosity count to a level filter
///
/// `quiet` wins over any verbosity.
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }

    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install an `env_logger` backend
///
/// Panics if a logger is already installed, like `env_logger::init`.
pub fn init(verbosity: u8, quiet: bool) {
    env_logger::Builder::new()
        .filter_level(level_for(verbosity, quiet))
        .format_timestamp(None)
        .init();
}

/// Install a test logger, ignoring an already-installed one
///
/// Honors `RUST_LOG` so failing tests can be rerun with output.
pub fn try_init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0, false), LevelFilter::Warn);
        assert_eq!(level_for(1, false), LevelFilter::Info);
        assert_eq!(level_for(2, false), LevelFilter::Debug);
        assert_eq!(level_for(7, false), LevelFilter::Trace);
    }

    #[test]
    fn test_quiet_overrides_verbosity() {
        assert_eq!(level_for(3, true), LevelFilter::Error);
    }

    #[test]
    fn test_try_init_is_repeatable() {
        try_init_for_tests();
        try_init_for_tests();
        log::debug!("logger installed");
    }
}
