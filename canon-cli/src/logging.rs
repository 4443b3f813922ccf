//! Tracing initialization.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter, e.g. `CANON_LOG=canon_core=debug`.
pub const LOG_ENV: &str = "CANON_LOG";

/// Initialize logging to stderr so report output on stdout stays clean.
///
/// Falls back to `canon_core=info,canon=info` when `CANON_LOG` is unset or
/// invalid. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("canon_core=info,canon=info"));

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
