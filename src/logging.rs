use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::Config;

/// Builds the subscriber the binary installs: stdout plus, when configured, an
/// appending log file. `RUST_LOG` takes precedence over the configured level.
///
/// Library code only emits events, so tests and embedders are free to install
/// their own subscriber instead.
pub fn subscriber(config: &Config) -> std::io::Result<Box<dyn Subscriber + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let stdout = fmt::layer().with_target(false);

    let registry = Registry::default().with(filter).with(stdout);

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            Ok(Box::new(registry.with(file_layer)))
        }
        None => Ok(Box::new(registry)),
    }
}
