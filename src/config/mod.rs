pub mod retention;

use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Deserializer};

pub use retention::RetentionPolicy;

use crate::dispatch::constants;

/// Dispatcher configuration. Immutable once constructed; validated
/// before the dispatch task is allowed to start.
#[derive(Debug, PartialEq, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Destination group the stream lives in.
    pub log_group: String,
    /// Destination stream batches are appended to.
    pub log_stream: String,
    /// Retention applied to the group when it is created.
    pub retention_days: RetentionPolicy,
    /// Entry-count cap per batch; also the enqueue channel capacity.
    pub max_entries_per_batch: usize,
    /// Byte cap per batch, in the dispatcher's encoded-size accounting.
    pub max_batch_size_bytes: usize,
    /// Period of the unconditional flush timer, in milliseconds on the
    /// wire.
    #[serde(deserialize_with = "deserialize_flush_interval")]
    pub flush_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_group: String::new(),
            log_stream: String::new(),
            retention_days: RetentionPolicy::OneMonth,
            max_entries_per_batch: constants::MAX_ENTRIES_PER_BATCH,
            max_batch_size_bytes: constants::MAX_BATCH_SIZE_BYTES,
            flush_interval: Duration::from_secs(5),
        }
    }
}

fn deserialize_flush_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("log group must not be empty")]
    EmptyLogGroup,

    #[error("log stream must not be empty")]
    EmptyLogStream,

    #[error(
        "max entries per batch must be between 1 and {max}",
        max = constants::MAX_ENTRIES_PER_BATCH
    )]
    EntriesPerBatchOutOfRange,

    #[error(
        "max batch size must be between 1 and {max} bytes",
        max = constants::MAX_BATCH_SIZE_BYTES
    )]
    BatchSizeOutOfRange,

    /// A batch may not span more than 24 hours, so neither may the timer.
    #[error("flush interval must be positive and below 24 hours")]
    FlushIntervalOutOfRange,
}

impl Config {
    /// Reject any bound the sink would refuse before a dispatch task is
    /// ever spawned for this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_group.is_empty() {
            return Err(ConfigError::EmptyLogGroup);
        }
        if self.log_stream.is_empty() {
            return Err(ConfigError::EmptyLogStream);
        }
        if self.max_entries_per_batch == 0
            || self.max_entries_per_batch > constants::MAX_ENTRIES_PER_BATCH
        {
            return Err(ConfigError::EntriesPerBatchOutOfRange);
        }
        if self.max_batch_size_bytes == 0
            || self.max_batch_size_bytes > constants::MAX_BATCH_SIZE_BYTES
        {
            return Err(ConfigError::BatchSizeOutOfRange);
        }
        if self.flush_interval.is_zero()
            || self.flush_interval >= Duration::from_millis(constants::MAX_FLUSH_INTERVAL_MS)
        {
            return Err(ConfigError::FlushIntervalOutOfRange);
        }
        Ok(())
    }
}

/// Load and validate the configuration from `logship.yaml` in
/// `config_directory`, with `LOGSHIP_`-prefixed environment variables
/// taking precedence over the file.
pub fn get_config(config_directory: &Path) -> Result<Config, ConfigError> {
    let path = config_directory.join("logship.yaml");

    let figment = Figment::new()
        .merge(Yaml::file(&path))
        .merge(Env::prefixed("LOGSHIP_"));

    let config: Config = figment
        .extract()
        .map_err(|err| ConfigError::Parse(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_validation_on_empty_names() {
        let config = Config::default();
        assert_eq!(config.validate(), Err(ConfigError::EmptyLogGroup));
    }

    #[test]
    fn valid_config_passes() {
        let config = Config {
            log_group: "app".to_string(),
            log_stream: "web-1".to_string(),
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn entry_cap_bounds_are_enforced() {
        let mut config = Config {
            log_group: "app".to_string(),
            log_stream: "web-1".to_string(),
            max_entries_per_batch: 10_001,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EntriesPerBatchOutOfRange)
        );
        config.max_entries_per_batch = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::EntriesPerBatchOutOfRange)
        );
    }

    #[test]
    fn byte_cap_bounds_are_enforced() {
        let config = Config {
            log_group: "app".to_string(),
            log_stream: "web-1".to_string(),
            max_batch_size_bytes: 1_048_577,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BatchSizeOutOfRange));
    }

    #[test]
    fn flush_interval_must_stay_under_a_day() {
        let config = Config {
            log_group: "app".to_string(),
            log_stream: "web-1".to_string(),
            flush_interval: Duration::from_secs(24 * 60 * 60),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::FlushIntervalOutOfRange)
        );
    }

    #[test]
    fn get_config_reads_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "logship.yaml",
                r"
                log_group: app
                log_stream: web-1
                retention_days: 14
                max_entries_per_batch: 500
                max_batch_size_bytes: 262144
                flush_interval: 2500
                ",
            )?;

            let config = get_config(jail.directory()).expect("config should load");
            assert_eq!(
                config,
                Config {
                    log_group: "app".to_string(),
                    log_stream: "web-1".to_string(),
                    retention_days: RetentionPolicy::TwoWeeks,
                    max_entries_per_batch: 500,
                    max_batch_size_bytes: 262_144,
                    flush_interval: Duration::from_millis(2_500),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "logship.yaml",
                r"
                log_group: app
                log_stream: web-1
                max_entries_per_batch: 500
                ",
            )?;
            jail.set_env("LOGSHIP_MAX_ENTRIES_PER_BATCH", "250");
            jail.set_env("LOGSHIP_LOG_STREAM", "web-2");

            let config = get_config(jail.directory()).expect("config should load");
            assert_eq!(config.max_entries_per_batch, 250);
            assert_eq!(config.log_stream, "web-2");
            Ok(())
        });
    }

    #[test]
    fn get_config_rejects_out_of_range_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "logship.yaml",
                r"
                log_group: app
                log_stream: web-1
                max_entries_per_batch: 20000
                ",
            )?;

            let err = get_config(jail.directory()).expect_err("bounds must be enforced");
            assert_eq!(err, ConfigError::EntriesPerBatchOutOfRange);
            Ok(())
        });
    }

    #[test]
    fn get_config_rejects_unknown_retention() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "logship.yaml",
                r"
                log_group: app
                log_stream: web-1
                retention_days: 2
                ",
            )?;

            let err = get_config(jail.directory()).expect_err("retention set is closed");
            assert!(matches!(err, ConfigError::Parse(_)));
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults_which_fail_validation() {
        figment::Jail::expect_with(|jail| {
            let err = get_config(jail.directory()).expect_err("empty names are invalid");
            assert_eq!(err, ConfigError::EmptyLogGroup);
            Ok(())
        });
    }
}
