//! Timestamp-based revision identifiers
//!
//! Provides [`RevisionId`], the fixed-width name of one revision directory.
//! Ids are formatted so that lexical order equals chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// `chrono` format of a revision id (UTC, millisecond resolution)
pub const ID_FORMAT: &str = "%Y-%m-%d_%H-%M-%S_%3f";

/// Width of every formatted revision id
pub const ID_WIDTH: usize = 23;

static ID_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}_\d{3}$").expect("static regex compiles")
});

/// Identifier of one revision
///
/// The id doubles as the revision directory name, e.g. `2026-10-16_09-05-01_042`.
/// Immutable and cheap to compare; ordering is plain string ordering, which is
/// chronological because the format is fixed width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionId(String);

impl RevisionId {
    /// Format an instant into a revision id
    #[inline]
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant.format(ID_FORMAT).to_string())
    }

    /// Parse a directory name, accepting only the exact revision shape
    ///
    /// # Errors
    /// Returns error if the name does not match the fixed-width format or
    /// does not denote a valid instant
    pub fn parse(name: &str) -> Result<Self, RevisionIdError> {
        if !ID_SHAPE.is_match(name) {
            return Err(RevisionIdError::Malformed(name.to_string()));
        }
        NaiveDateTime::parse_from_str(name, ID_FORMAT)
            .map_err(|e| RevisionIdError::InvalidInstant {
                id: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self(name.to_string()))
    }

    /// Check whether a directory name is recognized as a revision
    #[inline]
    #[must_use]
    pub fn is_revision_name(name: &str) -> bool {
        Self::parse(name).is_ok()
    }

    /// The instant this id was sampled at
    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        // Construction guarantees the string parses.
        NaiveDateTime::parse_from_str(&self.0, ID_FORMAT)
            .map(|naive| naive.and_utc())
            .unwrap_or_default()
    }

    /// Get the id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RevisionId {
    type Err = RevisionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RevisionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for RevisionId {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl serde::Serialize for RevisionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RevisionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing revision ids
#[derive(Debug, thiserror::Error)]
pub enum RevisionIdError {
    /// Name does not have the fixed-width revision shape
    #[error("not a revision id: '{0}'")]
    Malformed(String),

    /// Shape matches but the fields are out of range
    #[error("revision id '{id}' is not a valid instant: {reason}")]
    InvalidInstant { id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 5, 1).unwrap() + Duration::milliseconds(42)
    }

    #[test]
    fn formats_fixed_width() {
        let id = RevisionId::from_instant(instant());
        assert_eq!(id.as_str(), "2026-10-16_09-05-01_042");
        assert_eq!(id.as_str().len(), ID_WIDTH);
    }

    #[test]
    fn parse_roundtrips_instant() {
        let id = RevisionId::parse("2026-10-16_09-05-01_042").unwrap();
        assert_eq!(id.instant(), instant());
    }

    #[test]
    fn rejects_foreign_names() {
        assert!(!RevisionId::is_revision_name("config.xml"));
        assert!(!RevisionId::is_revision_name("2026-10-16_09-05-01"));
        assert!(!RevisionId::is_revision_name("job_deleted_20261016_090501_042"));
        assert!(matches!(
            RevisionId::parse("2026-13-40_25-61-61_000"),
            Err(RevisionIdError::InvalidInstant { .. })
        ));
    }

    #[test]
    fn lexical_order_is_chronological() {
        let early = RevisionId::from_instant(instant());
        let late = RevisionId::from_instant(instant() + Duration::milliseconds(1));
        let much_later = RevisionId::from_instant(instant() + Duration::days(400));
        assert!(early < late);
        assert!(late < much_later);
        assert!(early.as_str() < much_later.as_str());
    }

    #[test]
    fn serde_as_plain_string() {
        let id = RevisionId::from_instant(instant());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2026-10-16_09-05-01_042\"");
        let back: RevisionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RevisionId>("\"nope\"").is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_order_follows_instants(a in 0i64..4_102_444_800_000, b in 0i64..4_102_444_800_000) {
            let ta = Utc.timestamp_millis_opt(a).unwrap();
            let tb = Utc.timestamp_millis_opt(b).unwrap();
            let (ia, ib) = (RevisionId::from_instant(ta), RevisionId::from_instant(tb));
            proptest::prop_assert_eq!(ia.cmp(&ib), a.cmp(&b));
            proptest::prop_assert_eq!(ia.as_str().len(), ID_WIDTH);
        }
    }
}
