use std::ffi::OsString;
use std::str::FromStr;

use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::ConfigError;

pub const LOG_LEVEL_ENV: &str = "BOXXY_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for CloudWatch.
    Json,
    Text,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to install log subscriber: {0}")]
pub struct LoggingError(#[from] SetGlobalDefaultError);

/// Logging settings, built once in `main` and handed to [`LogConfig::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub min_level: Level,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_env(format: LogFormat) -> Result<Self, ConfigError> {
        Self::from_lookup(format, |key| std::env::var_os(key))
    }

    pub fn from_lookup(
        format: LogFormat,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, ConfigError> {
        let min_level = match lookup(LOG_LEVEL_ENV) {
            Some(value) => parse_level(&value.to_string_lossy())?,
            None => Level::INFO,
        };
        Ok(Self { min_level, format })
    }

    pub fn subscriber<W>(&self, writer: W) -> Box<dyn Subscriber + Send + Sync>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        match self.format {
            LogFormat::Json => Box::new(
                tracing_subscriber::fmt()
                    .json()
                    .flatten_event(true)
                    .with_max_level(self.min_level)
                    .with_target(false)
                    .with_current_span(false)
                    .with_writer(writer)
                    .finish(),
            ),
            LogFormat::Text => Box::new(
                tracing_subscriber::fmt()
                    .with_max_level(self.min_level)
                    .with_target(false)
                    .with_writer(writer)
                    .finish(),
            ),
        }
    }

    /// Installs the process-wide subscriber. Logs always go to stderr so
    /// they never mix with a printed result.
    pub fn init(&self) -> Result<(), LoggingError> {
        tracing::subscriber::set_global_default(self.subscriber(std::io::stderr))?;
        Ok(())
    }
}

pub fn parse_level(value: &str) -> Result<Level, ConfigError> {
    Level::from_str(value.trim()).map_err(|_| ConfigError::InvalidLogLevel(value.to_string()))
}
