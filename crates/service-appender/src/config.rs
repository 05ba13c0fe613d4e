//! Appender configuration.

use crate::error::AppenderError;
use std::env;
use std::time::Duration;

/// Recommended to be 2-4x the threshold so appends rarely reallocate.
pub const BUFFER_CAPACITY_DEFAULT: usize = 512;
pub const BUFFER_THRESHOLD_DEFAULT: usize = 128;
pub const TIME_THRESHOLD_MS_DEFAULT: u64 = 1000;
pub const MAX_ENTRY_LENGTH_DEFAULT: usize = 8 * 1024;
pub const MAX_WORKERS_DEFAULT: usize = 4;
pub const POLL_INTERVAL_MS_DEFAULT: u64 = 1000;

/// Configuration for the buffered appender.
#[derive(Debug, Clone)]
pub struct AppenderConfig {
    /// Initial buffer capacity. A sizing hint only, never an upper bound;
    /// the queue keeps growing past it rather than dropping entries.
    pub buffer_capacity: usize,
    /// Number of buffered entries that triggers an immediate flush. Also
    /// bounds the size of a single dispatched batch.
    pub buffer_threshold: usize,
    /// Flush period for the timer, so a slowly filling or idle buffer is
    /// still flushed within this interval. 0 falls back to the default.
    pub time_threshold_ms: u64,
    /// Maximum wire message length in characters; longer messages are
    /// trimmed for remote delivery and preserved in full via the fallback
    /// sink. 0 falls back to the default.
    pub max_entry_length: usize,
    /// Upper bound on concurrently running flush workers.
    pub max_workers: usize,
    /// Poll interval used by `wait_for_finish` and `shutdown`.
    pub poll_interval_ms: u64,
    /// Application (component or sub-system) tag attached to every wire
    /// record. Defaults to the current process name.
    pub application_name: String,
    /// Machine address tag attached to every wire record.
    pub machine_address: String,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        AppenderConfig {
            buffer_capacity: BUFFER_CAPACITY_DEFAULT,
            buffer_threshold: BUFFER_THRESHOLD_DEFAULT,
            time_threshold_ms: TIME_THRESHOLD_MS_DEFAULT,
            max_entry_length: MAX_ENTRY_LENGTH_DEFAULT,
            max_workers: MAX_WORKERS_DEFAULT,
            poll_interval_ms: POLL_INTERVAL_MS_DEFAULT,
            application_name: default_application_name(),
            machine_address: env::var("HOSTNAME").unwrap_or_default(),
        }
    }
}

fn default_application_name() -> String {
    env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppenderError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppenderError::InvalidConfig(format!("cannot parse {name}={value}"))),
        Err(_) => Ok(None),
    }
}

impl AppenderConfig {
    /// Creates a configuration from `APPENDER_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, AppenderError> {
        let mut config = AppenderConfig::default();
        if let Some(value) = parse_env("APPENDER_BUFFER_CAPACITY")? {
            config.buffer_capacity = value;
        }
        if let Some(value) = parse_env("APPENDER_BUFFER_THRESHOLD")? {
            config.buffer_threshold = value;
        }
        if let Some(value) = parse_env("APPENDER_TIME_THRESHOLD_MS")? {
            config.time_threshold_ms = value;
        }
        if let Some(value) = parse_env("APPENDER_MAX_ENTRY_LENGTH")? {
            config.max_entry_length = value;
        }
        if let Some(value) = parse_env("APPENDER_MAX_WORKERS")? {
            config.max_workers = value;
        }
        if let Some(value) = parse_env("APPENDER_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = value;
        }
        if let Ok(value) = env::var("APPENDER_APPLICATION_NAME") {
            config.application_name = value;
        }
        if let Ok(value) = env::var("APPENDER_MACHINE_ADDRESS") {
            config.machine_address = value;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), AppenderError> {
        if self.buffer_threshold == 0 {
            return Err(AppenderError::InvalidConfig(
                "buffer_threshold must be greater than 0".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(AppenderError::InvalidConfig(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppenderError::InvalidConfig(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity hint with the zero-value fallback applied.
    pub(crate) fn effective_capacity(&self) -> usize {
        if self.buffer_capacity == 0 {
            BUFFER_CAPACITY_DEFAULT
        } else {
            self.buffer_capacity
        }
    }

    /// Timer period with the zero-value fallback applied.
    pub(crate) fn effective_period(&self) -> Duration {
        let ms = if self.time_threshold_ms == 0 {
            TIME_THRESHOLD_MS_DEFAULT
        } else {
            self.time_threshold_ms
        };
        Duration::from_millis(ms)
    }

    /// Trim threshold with the zero-value fallback applied.
    pub(crate) fn effective_max_entry_length(&self) -> usize {
        if self.max_entry_length == 0 {
            MAX_ENTRY_LENGTH_DEFAULT
        } else {
            self.max_entry_length
        }
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
