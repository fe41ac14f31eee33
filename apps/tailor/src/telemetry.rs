use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Installs the global tracing subscriber for an embedding application.
///
/// `RUST_LOG` in the environment wins; otherwise the crate logs at
/// `config.rust_log`. Safe to call more than once: later calls are ignored.
pub fn init_tracing(config: &Config) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!("Tailor client v{} logging initialized", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = Config {
            rust_log: "debug".to_string(),
            ..Config::default()
        };
        init_tracing(&config);
        init_tracing(&config);
    }
}
