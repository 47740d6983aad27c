use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Synchronization status of a product with respect to the remote platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Exists locally, never successfully pushed remotely
    LocalOnly,
    /// Local and remote copies agree as of the last push
    Synced,
    /// The last remote create or update was rejected or unreachable
    SyncFailed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::LocalOnly => "local_only",
            SyncStatus::Synced => "synced",
            SyncStatus::SyncFailed => "sync_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local_only" => Some(SyncStatus::LocalOnly),
            "synced" => Some(SyncStatus::Synced),
            "sync_failed" => Some(SyncStatus::SyncFailed),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog product. The local row is the system of record; `remote_id`
/// is only set after the first successful remote create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Decimal string with at most 2 fractional digits, e.g. "9.99"
    pub price: String,
    pub image_url: Option<String>,
    pub owner: String,
    pub remote_id: Option<i64>,
    pub status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether a local update should be pushed to the remote platform.
    ///
    /// Only products that are currently in sync get automatic pushes;
    /// anything else waits for an explicit sync.
    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some() && self.status == SyncStatus::Synced
    }
}

/// Partial update to a product's user-editable fields. `None` means the
/// field was not supplied and must be left untouched, locally and remotely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
    }
}

/// Validates a product name: non-empty, at most 255 characters.
pub fn validate_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() <= 255
}

/// Validates a price string: a positive decimal with at most 2 fractional
/// digits, e.g. "5", "5.5", "12.99".
pub fn validate_price(price: &str) -> bool {
    let (whole, frac) = match price.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (price, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if let Some(f) = frac {
        if f.is_empty() || f.len() > 2 || !f.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    // Must be strictly positive
    price.bytes().any(|b| (b'1'..=b'9').contains(&b))
}
