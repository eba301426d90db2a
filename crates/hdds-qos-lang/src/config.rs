// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration:
//!
//! ```toml
//! delimiter = ","
//! log_level = "info"
//!
//! [qos]
//! all = ["Reliability.Reliable", "History.KeepLast 10"]
//! publisher = ["Partition [sensors]"]
//! writer = ["OwnershipStrength 5"]
//!
//! [watch]
//! interval_ms = 1000
//! kinds = ["participant", "publication"]
//! ```

use crate::catalog::EntityKind;
use crate::error::QosError;
use crate::expression::{self, ParseOptions, DEFAULT_DELIMITER};
use crate::filter::EntityQos;
use crate::set::PolicySet;
use crate::snapshot::DiscoveryKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosConfig {
    /// Argument delimiter for flat policies.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Policy expressions per target.
    #[serde(default)]
    pub qos: QosSection,

    /// Discovery watch settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Expression lists per entity kind; `all` applies to every kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosSection {
    pub all: Vec<String>,
    pub topic: Vec<String>,
    pub publisher: Vec<String>,
    pub subscriber: Vec<String>,
    pub writer: Vec<String>,
    pub reader: Vec<String>,
}

impl QosSection {
    pub fn for_kind(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Topic => &self.topic,
            EntityKind::Publisher => &self.publisher,
            EntityKind::Subscriber => &self.subscriber,
            EntityKind::Writer => &self.writer,
            EntityKind::Reader => &self.reader,
        }
    }

    pub fn for_kind_mut(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Topic => &mut self.topic,
            EntityKind::Publisher => &mut self.publisher,
            EntityKind::Subscriber => &mut self.subscriber,
            EntityKind::Writer => &mut self.writer,
            EntityKind::Reader => &mut self.reader,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_kinds")]
    pub kinds: Vec<DiscoveryKind>,
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_kinds() -> Vec<DiscoveryKind> {
    DiscoveryKind::ALL.to_vec()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            kinds: default_kinds(),
        }
    }
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            log_level: default_log_level(),
            qos: QosSection::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl QosConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !expression::is_valid_delimiter(self.delimiter) {
            return Err(ConfigError::Invalid(format!(
                "Delimiter '{}' is reserved",
                self.delimiter
            )));
        }
        if self.watch.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "watch.interval_ms must be greater than zero".into(),
            ));
        }
        if self.watch.kinds.is_empty() {
            return Err(ConfigError::Invalid("watch.kinds is empty".into()));
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::with_delimiter(self.delimiter)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.interval_ms)
    }

    /// Build the filtered policy set of every entity kind.
    ///
    /// Each kind gets `all` plus its own list; a family present in both is
    /// a [`QosError::DuplicateFamily`] error.
    pub fn build(&self) -> Result<EntityQos, QosError> {
        let options = self.parse_options();
        let mut entity_qos = EntityQos::default();
        for kind in EntityKind::ALL {
            let expressions: Vec<&str> = self
                .qos
                .all
                .iter()
                .chain(self.qos.for_kind(kind))
                .map(String::as_str)
                .collect();
            let set = PolicySet::parse(&expressions, &options)?;
            entity_qos.fill(kind, &set);
        }
        Ok(entity_qos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = QosConfig::from_toml("").unwrap();
        assert_eq!(config, QosConfig::default());
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.watch.kinds.len(), 3);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
delimiter = "|"
log_level = "debug"

[qos]
all = ["Reliability.Reliable", "ResourceLimits 10 | 1 | 10"]
publisher = ["Partition [a | b]"]

[watch]
interval_ms = 250
kinds = ["publication"]
"#
        )
        .unwrap();

        let config = QosConfig::from_file(file.path()).unwrap();
        assert_eq!(config.delimiter, '|');
        assert_eq!(config.watch.kinds, vec![DiscoveryKind::Publication]);

        let built = config.build().unwrap();
        let writer = built.get(EntityKind::Writer).unwrap();
        assert_eq!(writer.len(), 2);
        let publisher = built.get(EntityKind::Publisher).unwrap();
        assert_eq!(publisher.families().collect::<Vec<_>>(), vec!["Partition"]);
        assert!(!built.dropped.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = QosConfig::from_file("/nonexistent/hdds-qos.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = QosConfig::from_toml("delimiter = ").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_reserved_delimiter_rejected() {
        let err = QosConfig::from_toml("delimiter = \";\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = QosConfig::from_toml("[watch]\ninterval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn test_empty_kinds_rejected() {
        let err = QosConfig::from_toml("[watch]\nkinds = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_all_and_kind_duplicate_family() {
        let config = QosConfig::from_toml(
            r#"
[qos]
all = ["History.KeepLast 1"]
reader = ["History.KeepAll"]
"#,
        )
        .unwrap();
        let err = config.build().unwrap_err();
        assert!(matches!(err, QosError::DuplicateFamily { ref family, .. } if family == "History"));
    }
}
