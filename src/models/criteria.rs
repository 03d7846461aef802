//! Search criteria value object.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from criteria validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("city is required and must be non-empty")]
    MissingCity,
}

/// Normalized search criteria, consumed read-only by every adapter.
///
/// Adapters that cannot express a given field server-side ignore it;
/// the manager applies the numeric bounds again after normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rooms: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rooms: Option<f32>,
    /// Minimum living area in square meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub districts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl SearchCriteria {
    /// Create criteria for a city with no further bounds.
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ..Default::default()
        }
    }

    /// Validate required fields. Whitespace-only cities are rejected.
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.city.trim().is_empty() {
            return Err(CriteriaError::MissingCity);
        }
        Ok(())
    }

    /// Check a price against the configured bounds.
    pub fn price_in_range(&self, price: f64) -> bool {
        if let Some(min) = self.min_price {
            if price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if price > max {
                return false;
            }
        }
        true
    }

    /// Check rooms against the configured bounds. Unknown room counts pass.
    pub fn rooms_in_range(&self, rooms: Option<f32>) -> bool {
        let Some(rooms) = rooms else { return true };
        if let Some(min) = self.min_rooms {
            if rooms < min {
                return false;
            }
        }
        if let Some(max) = self.max_rooms {
            if rooms > max {
                return false;
            }
        }
        true
    }

    /// Check size against the configured bounds. Unknown sizes pass.
    pub fn size_in_range(&self, size: Option<f32>) -> bool {
        let Some(size) = size else { return true };
        if let Some(min) = self.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// Check a district against the requested set. Listings without a known
    /// district pass (best-effort narrowing, never strict).
    pub fn district_matches(&self, district: Option<&str>) -> bool {
        if self.districts.is_empty() {
            return true;
        }
        let Some(district) = district else {
            return true;
        };
        let wanted = district.to_lowercase();
        self.districts.iter().any(|d| d.to_lowercase() == wanted)
    }
}
