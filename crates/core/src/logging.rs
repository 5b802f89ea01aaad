//! Tracing initialization for native runs
//!
//! The browser bundle installs its own console layer; see the frontend crate.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing, `RUST_LOG` taking precedence over `log_level`
pub fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_installs_once() {
        init_tracing("debug").unwrap();
        tracing::info!("tracing initialized");
        assert!(init_tracing("info").is_err());
    }
}
