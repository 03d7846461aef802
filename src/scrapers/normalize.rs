//! Normalization of raw records into canonical listings, plus global
//! deduplication.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use super::config::SourceConfig;
use super::RawRecord;
use crate::models::{DedupKey, Listing, SearchCriteria};

/// Parse a price string into a plain number.
///
/// Handles the formats listing sites actually emit: "850 €", "1.200 €",
/// "€1,250", "1250 EUR", "1.234.567,89", "700.5". Returns `None` when no
/// digits survive cleanup.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == ',');
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let value = if dots > 0 && commas > 0 {
        // Both separators: the rightmost one is the decimal separator.
        let last_dot = cleaned.rfind('.').unwrap_or(0);
        let last_comma = cleaned.rfind(',').unwrap_or(0);
        let decimal = if last_dot > last_comma { '.' } else { ',' };
        split_on_decimal(cleaned, decimal)
    } else if dots + commas == 1 {
        let sep = if dots == 1 { '.' } else { ',' };
        let after = cleaned.rsplit(sep).next().unwrap_or("");
        // A single separator followed by exactly three digits is a
        // thousands group ("1.200"); anything else is a decimal point.
        if after.len() == 3 {
            cleaned.replace(['.', ','], "")
        } else {
            split_on_decimal(cleaned, sep)
        }
    } else if dots + commas > 1 {
        // Repeated identical separators are thousands groups.
        cleaned.replace(['.', ','], "")
    } else {
        cleaned.to_string()
    };

    value.parse().ok()
}

fn split_on_decimal(cleaned: &str, decimal: char) -> String {
    let idx = cleaned.rfind(decimal).unwrap_or(cleaned.len());
    let integer: String = cleaned[..idx]
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    let fraction: String = cleaned[idx..]
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("{integer}.{fraction}")
}

/// Extract the first number from free text ("2,5 Zimmer", "64 m²").
pub fn parse_number(raw: &str) -> Option<f32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());
    re.find(raw)?.as_str().replace(',', ".").parse().ok()
}

fn squash(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Content fingerprint for id-less records: normalized title + price +
/// normalized location. Lossy by design — two genuinely distinct listings
/// with identical title, price and location collide, which only happens
/// when the source exposes no stable id.
fn fingerprint(title: &str, price: f64, location: &str) -> String {
    format!("fp:{}:{:.2}:{}", squash(title), price, squash(location))
}

/// Map one raw record into the canonical schema.
///
/// Returns `None` when the record must be dropped: unparsable price, or no
/// stable id together with no fingerprint material (neither title nor
/// location). Drops are counted by the caller, never escalated to a
/// source-level error.
pub fn normalize(
    record: &RawRecord,
    config: &SourceConfig,
    criteria: &SearchCriteria,
) -> Option<Listing> {
    let price = match record.price.as_deref().and_then(parse_price) {
        Some(price) => price,
        None => {
            trace!(
                "{}: dropping record without parsable price: {:?}",
                config.name,
                record.title
            );
            return None;
        }
    };

    let title = record.title.clone().unwrap_or_default();
    let location = record.location.clone().unwrap_or_default();

    let (source_id, fingerprinted) = match &record.source_local_id {
        Some(id) => (id.clone(), false),
        None => {
            if title.trim().is_empty() && location.trim().is_empty() {
                trace!("{}: dropping record with no identity material", config.name);
                return None;
            }
            (fingerprint(&title, price, &location), true)
        }
    };

    // "City, District" locations carry the district in the second segment.
    let district = location
        .split_once(',')
        .map(|(_, d)| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Some(Listing {
        source: config.name.clone(),
        source_id,
        fingerprinted,
        title,
        description: record.description.clone().unwrap_or_default(),
        price,
        currency: config.currency.clone(),
        location,
        city: criteria.city.clone(),
        district,
        rooms: record.rooms.as_deref().and_then(parse_number),
        size_sqm: record.size.as_deref().and_then(parse_number),
        images: record.images.clone(),
        url: record
            .link
            .clone()
            .unwrap_or_else(|| config.base_url.clone()),
        published_at: None,
        updated_at: None,
        active: true,
        features: Vec::new(),
        contact: None,
    })
}

/// Tracks dedup keys across one aggregation run.
///
/// Feed listings in registry order: the first listing seen for a key wins,
/// which is what makes "first-seen source in registry order" hold.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the listing is new; false when its key was already taken.
    pub fn insert(&mut self, listing: &Listing) -> bool {
        self.seen.insert(listing.dedup_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::config::ExtractionRules;
    use crate::scrapers::SourceMode;

    fn config(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            base_url: "https://src.example".to_string(),
            search_url: String::new(),
            mode: SourceMode::Html,
            extract: ExtractionRules::default(),
            pagination: None,
            rate_limit: Default::default(),
            enabled: true,
            render: false,
            currency: "EUR".to_string(),
        }
    }

    fn record(title: &str, price: &str, location: &str) -> RawRecord {
        RawRecord {
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            location: Some(location.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("850 €"), Some(850.0));
        assert_eq!(parse_price("1.200 €"), Some(1200.0));
        assert_eq!(parse_price("€1,250"), Some(1250.0));
        assert_eq!(parse_price("1250 EUR"), Some(1250.0));
        assert_eq!(parse_price("1.234.567,89"), Some(1_234_567.89));
        assert_eq!(parse_price("700.5"), Some(700.5));
        assert_eq!(parse_price("949,50"), Some(949.5));
        assert_eq!(parse_price("auf Anfrage"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("2,5 Zimmer"), Some(2.5));
        assert_eq!(parse_number("64 m²"), Some(64.0));
        assert_eq!(parse_number("ca. 80,5 m²"), Some(80.5));
        assert_eq!(parse_number("k.A."), None);
    }

    #[test]
    fn test_normalize_drops_unparsable_price() {
        let criteria = SearchCriteria::for_city("Berlin");
        let rec = record("Wohnung", "Preis auf Anfrage", "Berlin");
        assert!(normalize(&rec, &config("a"), &criteria).is_none());
    }

    #[test]
    fn test_normalize_extracts_district() {
        let criteria = SearchCriteria::for_city("Berlin");
        let listing = normalize(&record("Wohnung", "900", "Berlin, Mitte"), &config("a"), &criteria)
            .unwrap();
        assert_eq!(listing.district.as_deref(), Some("Mitte"));
        assert_eq!(listing.city, "Berlin");
        assert_eq!(listing.currency, "EUR");
    }

    #[test]
    fn test_fingerprint_fallback_collapses_identicals() {
        let criteria = SearchCriteria::for_city("Berlin");
        // Two id-less sources carrying the same mirrored listing.
        let a = normalize(&record("Schöne Wohnung", "900 €", "Berlin, Mitte"), &config("a"), &criteria)
            .unwrap();
        let b = normalize(&record("Schöne  Wohnung", "900", "berlin, mitte"), &config("b"), &criteria)
            .unwrap();
        assert!(a.fingerprinted && b.fingerprinted);
        assert_eq!(a.dedup_key(), b.dedup_key());

        let mut dedup = Deduplicator::new();
        assert!(dedup.insert(&a));
        assert!(!dedup.insert(&b));
    }

    #[test]
    fn test_id_bearing_listings_do_not_collide_across_sources() {
        let criteria = SearchCriteria::for_city("Berlin");
        let mut rec = record("Wohnung", "900", "Berlin");
        rec.source_local_id = Some("42".to_string());
        let a = normalize(&rec, &config("a"), &criteria).unwrap();
        let b = normalize(&rec, &config("b"), &criteria).unwrap();

        let mut dedup = Deduplicator::new();
        assert!(dedup.insert(&a));
        assert!(dedup.insert(&b));
        // Same id twice from the same source is still a duplicate.
        assert!(!dedup.insert(&a));
    }

    #[test]
    fn test_normalize_drops_record_without_identity_material() {
        let criteria = SearchCriteria::for_city("Berlin");
        let rec = RawRecord {
            price: Some("500".to_string()),
            ..Default::default()
        };
        assert!(normalize(&rec, &config("a"), &criteria).is_none());
    }
}
