//! Tracing setup for binaries and ad-hoc tooling.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` for this crate and
/// `chain_sol` when `verbose`. Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "info,program_client=debug,chain_sol=debug"
    } else {
        "info"
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(fmt::layer().with_target(true))
        .try_init();
}
