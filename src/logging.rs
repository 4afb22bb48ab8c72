//! Subscriber setup for binaries and integrations embedding the popup runtime.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives, e.g. `transpop=debug`.
pub const LOG_ENV: &str = "TRANSPOP_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a stderr subscriber. Later calls leave the first subscriber in place.
pub fn init() {
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
        tracing::info!("logging initialised");
    }
}
