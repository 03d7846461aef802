//! Canonical listing schema all sources are normalized into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact details extracted from a listing, when the source exposes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A rental listing in the unified schema.
///
/// Identity is `(source, source_id)`: two listings sharing both are the same
/// entity and at most one survives deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Name of the source this listing came from.
    pub source: String,
    /// Stable identity within the source: the source-local id when the
    /// source provides one, otherwise a content fingerprint.
    pub source_id: String,
    /// True when `source_id` is a fingerprint rather than a source-local id.
    #[serde(default, skip_serializing)]
    pub fingerprinted: bool,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Monthly rent as a plain number.
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub location: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<f32>,
    /// Living area in square meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_sqm: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Detail page URL at the source.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
}

fn default_active() -> bool {
    true
}

impl Listing {
    /// Deduplication key for this listing.
    ///
    /// Id-bearing listings key on `(source, local id)`. Fingerprinted
    /// listings key on the fingerprint alone, so mirrors of the same
    /// listing on different id-less sources collapse to one entry.
    pub fn dedup_key(&self) -> DedupKey {
        if self.fingerprinted {
            DedupKey::Fingerprint(self.source_id.clone())
        } else {
            DedupKey::SourceLocal(self.source.clone(), self.source_id.clone())
        }
    }
}

/// Global deduplication key, applied across sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    /// Source name + source-local id.
    SourceLocal(String, String),
    /// Content fingerprint for sources without stable ids. Lossy: two
    /// genuinely distinct listings with identical title, price and location
    /// collide, which only happens when the source gives no id at all.
    Fingerprint(String),
}
