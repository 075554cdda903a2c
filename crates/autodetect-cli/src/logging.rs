use tracing_subscriber::EnvFilter;

use autodetect_core::LoggingConfig;

/// Env var holding an `EnvFilter` directive that overrides the config.
const LOG_ENV: &str = "AUTODETECT_LOG";

/// Install the stderr subscriber. A second call is a no-op.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
