// logging.rs - tracing subscriber setup
//
// Tests and the diagnostic binary call `init()`; repeated calls are fine
// because only the first subscriber is installed.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`)
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_test_writer()
        .try_init();
}
