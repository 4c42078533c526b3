//! Simulation configuration (spec §6 "Configuration surface").

use std::time::Duration;

use scarab_net::EventLoggerFilter;

/// Everything the [`crate::simulation::Simulation`] constructor needs.
///
/// `host`/`port` default to `localhost`/`1234` (spec §6). `step_length` of
/// [`Duration::ZERO`] paired with a non-zero `number_steps` is a legitimate
/// "run as fast as possible" configuration, not an error.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub host: String,
    pub port: u16,
    pub number_steps: u64,
    pub step_length: Duration,
    pub logger: Option<EventLoggerConfig>,
}

/// Where and what the optional [`scarab_net::EventLogger`] writes.
///
/// `path: None` logs to stdout.
#[derive(Debug, Clone)]
pub struct EventLoggerConfig {
    pub path: Option<std::path::PathBuf>,
    pub filter: EventLoggerFilter,
}

/// Fatal configuration errors, raised at construction (spec §7
/// `ConfigurationError`).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("port {0} is out of range for a u16 listening port")]
    InvalidPort(u32),

    #[error("step count {0} cannot be negative")]
    InvalidSteps(i64),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1234,
            number_steps: 0,
            step_length: Duration::ZERO,
            logger: None,
        }
    }
}

impl SimulationConfig {
    /// Build a config from loosely typed inputs (as a CLI or config file
    /// would supply them), validating the two conditions spec §7 calls
    /// fatal: an out-of-range port and a negative step count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPort`] or [`ConfigError::InvalidSteps`].
    pub fn new(
        host: impl Into<String>,
        port: u32,
        number_steps: i64,
        step_length: Duration,
        logger: Option<EventLoggerConfig>,
    ) -> Result<Self, ConfigError> {
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidPort(port))?;
        let number_steps = u64::try_from(number_steps).map_err(|_| ConfigError::InvalidSteps(number_steps))?;
        Ok(Self {
            host: host.into(),
            port,
            number_steps,
            step_length,
            logger,
        })
    }
}
