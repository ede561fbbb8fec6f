use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::{Result, TickerError};
use crate::config::LoggingConfig;

/// Runtime on/off switch for log output.
///
/// Clones share one flag. The subscriber installed by [`init`] consults it
/// for every event, so flipping it takes effect immediately.
#[derive(Debug, Clone)]
pub struct LogSwitch {
    enabled: Arc<AtomicBool>,
}

impl LogSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for LogSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Install the global subscriber: `EnvFilter` (from `RUST_LOG`, falling
/// back to the configured level) and a fmt layer behind the returned switch.
pub fn init(config: &LoggingConfig) -> Result<LogSwitch> {
    let switch = LogSwitch::new(config.enabled);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let gate = switch.clone();
    let output = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_filter(filter_fn(move |_| gate.is_enabled()));

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| TickerError::Config(format!("Logging already initialised: {}", e)))?;

    Ok(switch)
}
