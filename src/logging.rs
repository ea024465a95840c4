//! Logging setup.
//!
//! Logs go to stderr so stdout stays free for the board. `RUST_LOG`, when set,
//! replaces the level chosen from the command line flags.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the given flags: `--quiet` → warn, default → info,
/// `-v` → debug, `-vv` and more → trace (for this crate; dependencies stay at
/// warn unless tracing everything).
pub fn filter_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbose {
        0 => "warn,nowserving=info",
        1 => "warn,nowserving=debug",
        2 => "warn,nowserving=trace",
        _ => "trace",
    }
}

/// Install the global subscriber. Calling it twice is harmless (second call is ignored).
pub fn init(quiet: bool, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(quiet, verbose)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 0);

    if tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_levels() {
        assert_eq!(filter_directive(true, 3), "warn");
        assert_eq!(filter_directive(false, 0), "warn,nowserving=info");
        assert_eq!(filter_directive(false, 1), "warn,nowserving=debug");
        assert_eq!(filter_directive(false, 2), "warn,nowserving=trace");
        assert_eq!(filter_directive(false, 9), "trace");
    }

    #[test]
    fn test_directives_parse() {
        for verbose in 0..4 {
            assert!(EnvFilter::try_new(filter_directive(false, verbose)).is_ok());
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(true, 0);
        init(false, 2);
    }
}
