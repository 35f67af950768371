//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppEnv;

/// Default filter when `RUST_LOG` is not set
pub fn default_directives(app_env: AppEnv) -> &'static str {
    if app_env.is_production() {
        "info,hyper=warn,reqwest=warn"
    } else {
        "debug,hyper=info,reqwest=info"
    }
}

/// Install the global subscriber: JSON lines in production, human-readable otherwise
pub fn init_logging(app_env: AppEnv) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(app_env)));

    let registry = tracing_subscriber::registry().with(filter);
    if app_env.is_production() {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }
    Ok(())
}
