//! Store configuration
//!
//! [`StoreConfig`] is usually loaded from a TOML file:
//!
//! ```toml
//! history_root = "/var/lib/ci/config-history"
//! max_history_entries = 50
//! skip_duplicate_history = true
//!
//! [retry]
//! interval_ms = 500
//! max_attempts = 240
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files the listener never records unless configured otherwise
pub const DEFAULT_EXCLUDE_PATTERN: &str =
    r"queue\.xml|nodeMonitors\.xml|UpdateCenter\.xml|global-build-stats|LockableResourcesManager\.xml|MilestoneStep\.xml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory of all histories
    pub history_root: PathBuf,
    /// Retention cap per entity, 0 disables purging
    #[serde(deserialize_with = "lenient_max_entries")]
    pub max_history_entries: u32,
    /// Skip saves whose content equals the latest revision
    pub skip_duplicate_history: bool,
    /// Regex of configuration files the listener ignores
    pub exclude_pattern: Option<String>,
    /// Clash back-off of the allocator
    pub retry: RetryPolicy,
}

impl StoreConfig {
    /// Default configuration rooted at `history_root`
    #[inline]
    #[must_use]
    pub fn new(history_root: impl Into<PathBuf>) -> Self {
        Self {
            history_root: history_root.into(),
            ..Self::default()
        }
    }

    /// With retention cap
    #[inline]
    #[must_use]
    pub fn with_max_entries(mut self, max: u32) -> Self {
        self.max_history_entries = max;
        self
    }

    /// With duplicate suppression on or off
    #[inline]
    #[must_use]
    pub fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicate_history = skip;
        self
    }

    /// With allocator retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error on TOML syntax or type errors
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Toml` if it is not valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Interpret a textual retention cap
    ///
    /// Malformed, negative or zero values disable the cap.
    #[must_use]
    pub fn parse_max_entries(raw: &str) -> u32 {
        match raw.trim().parse::<i64>() {
            Ok(n) => clamp_entries(n),
            Err(_) => {
                tracing::warn!(value = raw, "invalid max_history_entries, history cap disabled");
                0
            }
        }
    }

    /// Exclude pattern in effect
    #[inline]
    #[must_use]
    pub fn effective_exclude_pattern(&self) -> Option<&str> {
        self.exclude_pattern.as_deref()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_root: PathBuf::from("config-history"),
            max_history_entries: 0,
            skip_duplicate_history: true,
            exclude_pattern: Some(DEFAULT_EXCLUDE_PATTERN.to_string()),
            retry: RetryPolicy::default(),
        }
    }
}

fn clamp_entries(n: i64) -> u32 {
    if n <= 0 {
        0
    } else {
        u32::try_from(n).unwrap_or(u32::MAX)
    }
}

fn lenient_max_entries<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => clamp_entries(n),
        Raw::Text(s) => StoreConfig::parse_max_entries(&s),
        Raw::Other(_) => {
            tracing::warn!("max_history_entries has an unsupported type, history cap disabled");
            0
        }
    })
}

/// Back-off policy for revision id clashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Wait between attempts, in milliseconds
    pub interval_ms: u64,
    /// Attempts before allocation fails
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Create policy
    #[inline]
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_attempts,
        }
    }

    /// Wait between attempts
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_attempts: 240,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.max_history_entries, 0);
        assert!(config.skip_duplicate_history);
        assert_eq!(config.retry.interval(), Duration::from_millis(500));
        assert_eq!(config.effective_exclude_pattern(), Some(DEFAULT_EXCLUDE_PATTERN));
    }

    #[test]
    fn parse_full_toml() {
        let config = StoreConfig::from_toml_str(
            r#"
            history_root = "/srv/history"
            max_history_entries = 12
            skip_duplicate_history = false

            [retry]
            interval_ms = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.history_root, PathBuf::from("/srv/history"));
        assert_eq!(config.max_history_entries, 12);
        assert!(!config.skip_duplicate_history);
        assert_eq!(config.retry.interval_ms, 5);
        assert_eq!(config.retry.max_attempts, 240);
    }

    #[test]
    fn max_entries_accepts_strings() {
        let config = StoreConfig::from_toml_str(r#"max_history_entries = "7""#).unwrap();
        assert_eq!(config.max_history_entries, 7);
    }

    #[test]
    fn malformed_max_entries_disables_cap() {
        for raw in [
            r#"max_history_entries = "lots""#,
            "max_history_entries = -3",
            "max_history_entries = true",
            "max_history_entries = 2.5",
        ] {
            let config = StoreConfig::from_toml_str(raw).unwrap();
            assert_eq!(config.max_history_entries, 0, "{raw}");
        }
    }

    #[test]
    fn parse_max_entries_rules() {
        assert_eq!(StoreConfig::parse_max_entries(" 10 "), 10);
        assert_eq!(StoreConfig::parse_max_entries("0"), 0);
        assert_eq!(StoreConfig::parse_max_entries("-1"), 0);
        assert_eq!(StoreConfig::parse_max_entries(""), 0);
        assert_eq!(StoreConfig::parse_max_entries("99999999999"), u32::MAX);
    }

    #[test]
    fn builder_methods() {
        let config = StoreConfig::new("/h")
            .with_max_entries(3)
            .with_skip_duplicates(false)
            .with_retry(RetryPolicy::new(Duration::from_millis(2), 9));
        assert_eq!(config.history_root, PathBuf::from("/h"));
        assert_eq!(config.max_history_entries, 3);
        assert!(!config.skip_duplicate_history);
        assert_eq!(config.retry.max_attempts, 9);
    }
}
