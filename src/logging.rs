//! Logging setup for hosts embedding the dialer

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn filter(level: &str) -> Result<EnvFilter> {
    let directive = format!("tun_dialer={}", level)
        .parse()
        .map_err(|e| Error::config(format!("Invalid log level {:?}: {}", level, e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Install a human-readable subscriber
///
/// `RUST_LOG` is honoured on top of `level`. Returns `Ok` without changes if
/// the host already installed a global subscriber.
pub fn init(level: &str) -> Result<()> {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter(level)?)
        .try_init();
    Ok(())
}

/// Install a JSON subscriber, for hosts shipping logs to a collector
pub fn init_json(level: &str) -> Result<()> {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(filter(level)?)
        .try_init();
    Ok(())
}
