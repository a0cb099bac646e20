//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize JSON tracing filtered by `service.log_level`
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.service.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::info!("Tracing initialized for service: {}", config.service.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        let config = Config::default();
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn test_invalid_filter_falls_back() {
        let mut config = Config::default();
        config.service.log_level = "[[not a filter".to_string();
        init_tracing(&config);
    }
}
