use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::RuntimeError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. Fails if a subscriber is already
/// installed.
pub fn init_tracing(level: &str) -> Result<(), RuntimeError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| RuntimeError::Telemetry(e.to_string()))
}
