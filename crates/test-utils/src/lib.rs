//! Shared helpers for the `tupledag` test suites.
//!
//! - [`builders`]: request builders and worker-output helpers.
//! - [`fixtures`]: a seeded ledger and the [`fixtures::Harness`] that runs
//!   each handler call as its own transaction.

pub mod builders;
pub mod fixtures;

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Route engine logs to the test harness.
///
/// Output is captured per test and only shown for failures (or with
/// `--nocapture`). `RUST_LOG` selects what is recorded, e.g.
/// `RUST_LOG=tupledag::dag=trace`; the default keeps engine info logs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,tupledag=info"));
        // Another test binary helper may have installed a subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
