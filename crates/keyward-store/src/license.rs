//! License record types and validity evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored license entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// Store-assigned identity.
    pub id: i64,
    /// License key, unique across all records.
    pub key: String,
    /// Application this key belongs to.
    pub app_name: String,
    /// Expiration instant in UTC. Ignored when `unlimited` is set.
    pub expires_at: DateTime<Utc>,
    /// Whether the key never expires.
    pub unlimited: bool,
}

impl LicenseRecord {
    /// Whether this record is valid at `now`.
    ///
    /// Unlimited keys are always valid. Otherwise the boundary is
    /// inclusive: a key expiring exactly at `now` is still valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.unlimited || self.expires_at >= now
    }
}

/// Fields for creating a record or replacing an existing one.
///
/// An update replaces all mutable fields at once; there is no partial patch.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDraft {
    /// License key.
    pub key: String,
    /// Owning application name.
    pub app_name: String,
    /// Expiration instant in UTC.
    pub expires_at: DateTime<Utc>,
    /// Whether the key never expires.
    #[serde(default)]
    pub unlimited: bool,
}

/// Outcome of checking a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Record found and currently valid.
    Valid,
    /// Record found but its expiration has passed.
    Expired,
    /// No matching record.
    NotFound,
}

impl Verdict {
    /// Judge an optional lookup result at `now`.
    pub fn for_record(record: Option<&LicenseRecord>, now: DateTime<Utc>) -> Self {
        match record {
            None => Self::NotFound,
            Some(r) if r.is_valid_at(now) => Self::Valid,
            Some(_) => Self::Expired,
        }
    }
}
