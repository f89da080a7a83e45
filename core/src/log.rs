// SPDX-License-Identifier: MPL-2.0

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber that prints to stderr.
///
/// Set the environment variable `RUST_LOG` to one of `trace`, `debug`, `info`, `warn`, or `error`.
/// Every executed instruction is logged at `trace`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_level(true)
        // The target is mostly just noise.
        .with_target(false)
        .without_time()
        .init();
}
