//! Test logging for the revstamp crates.
//!
//! Events from the revstamp crates are shown at `debug`, everything else at
//! `warn`, unless `RUST_LOG` says otherwise. Output goes through the test
//! writer so it only shows up for failing tests or with `--nocapture`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_TEST_FILTER: &str = "warn,revstamp_core=debug,revstamp_config=debug";

/// Install the test subscriber with [`DEFAULT_TEST_FILTER`]. Only the first
/// call in a process has an effect.
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_TEST_FILTER);
}

/// Install the test subscriber with `directives` as the fallback filter.
/// Returns `false` when a global subscriber was already set.
pub fn init_test_tracing_with(directives: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init()
        .is_ok()
}
