//! Tracing setup

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// Levels come from `WEBBIND_LOG` (e.g. `WEBBIND_LOG=webbind_core=trace`),
/// falling back to `webbind=info`. Output goes to stderr so command output
/// on stdout stays clean. Later calls are no-ops.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env("WEBBIND_LOG").unwrap_or_else(|_| EnvFilter::new("webbind=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .init();
    });
}
