// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Log output on stderr.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "QUERIFY_LOG";

/// `--verbose` forces debug output; otherwise `QUERIFY_LOG` decides and
/// only warnings are shown by default.
pub fn init(verbose: bool, ansi: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_ansi(ansi);

    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
