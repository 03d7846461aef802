//! Configuration-driven source adapter.
//!
//! One implementation covers every configured source: the `SourceConfig`
//! supplies the search URL template, the extraction rules (CSS selectors in
//! HTML mode, dot-notation paths in JSON mode) and the pagination
//! descriptor. Fetches go through the injected [`PageRenderer`].

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::config::{ExtractionRules, SourceConfig, SourceMode};
use super::error::ScrapeError;
use super::renderer::PageRenderer;
use super::{FetchedPage, PageToken, RawRecord, SourceAdapter};
use crate::models::SearchCriteria;

/// Adapter for a single configured source.
pub struct ConfigurableAdapter {
    config: SourceConfig,
    renderer: Arc<dyn PageRenderer>,
}

impl ConfigurableAdapter {
    pub fn new(config: SourceConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { config, renderer }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Build the search URL for a page number, substituting criteria fields
    /// into the template. Query pairs whose placeholder the criteria leave
    /// unset are dropped; an unfilled placeholder outside the query string
    /// is a config error.
    pub fn build_search_url(
        &self,
        criteria: &SearchCriteria,
        page: u32,
    ) -> Result<String, ScrapeError> {
        let mut url = self.config.search_url.clone();

        let substitutions: Vec<(&str, Option<String>)> = vec![
            ("city", Some(urlencoding::encode(&criteria.city).into_owned())),
            ("page", Some(page.to_string())),
            ("min_price", criteria.min_price.map(fmt_num)),
            ("max_price", criteria.max_price.map(fmt_num)),
            ("min_rooms", criteria.min_rooms.map(|v| fmt_num(v as f64))),
            ("max_rooms", criteria.max_rooms.map(|v| fmt_num(v as f64))),
            ("min_size", criteria.min_size.map(|v| fmt_num(v as f64))),
            ("max_size", criteria.max_size.map(|v| fmt_num(v as f64))),
        ];
        for (name, value) in substitutions {
            if let Some(value) = value {
                url = url.replace(&format!("{{{name}}}"), &value);
            }
        }

        let (base, query) = match url.split_once('?') {
            Some((base, query)) => (base.to_string(), Some(query.to_string())),
            None => (url, None),
        };
        if base.contains('{') {
            return Err(ScrapeError::InvalidConfig(format!(
                "unfilled placeholder in search URL path: {base}"
            )));
        }

        match query {
            Some(query) => {
                let kept: Vec<&str> = query
                    .split('&')
                    .filter(|pair| !pair.contains('{') && !pair.is_empty())
                    .collect();
                if kept.is_empty() {
                    Ok(base)
                } else {
                    Ok(format!("{}?{}", base, kept.join("&")))
                }
            }
            None => Ok(base),
        }
    }

    fn page_url(&self, criteria: &SearchCriteria, page: &PageToken) -> Result<String, ScrapeError> {
        match page {
            PageToken::Number(n) => self.build_search_url(criteria, *n),
            PageToken::Url(url) => Ok(url.clone()),
        }
    }

    fn parse_body(&self, body: &str, page: &PageToken) -> Result<FetchedPage, ScrapeError> {
        match self.config.mode {
            SourceMode::Html => extract_html_page(
                body,
                &self.config,
                match page {
                    PageToken::Number(n) => *n,
                    PageToken::Url(_) => 0,
                },
            ),
            SourceMode::Json => extract_json_page(
                body,
                &self.config.extract,
                match page {
                    PageToken::Number(n) => *n,
                    PageToken::Url(_) => 1,
                },
            ),
        }
    }
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[async_trait]
impl SourceAdapter for ConfigurableAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        page: &PageToken,
    ) -> Result<FetchedPage, ScrapeError> {
        let url = self.page_url(criteria, page)?;
        debug!("fetching {} page {:?}", self.config.name, page);
        let body = self.renderer.fetch(&url).await?;
        self.parse_body(&body, page)
    }
}

/// Parse a selector from config, mapping syntax errors to config errors.
fn parse_selector(rule: &str, field: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(rule)
        .map_err(|e| ScrapeError::InvalidConfig(format!("bad selector for {field}: {e}")))
}

/// Collapsed text content of the first match for a selector, if any.
fn select_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// First match's attribute value, resolved against the base URL when it is
/// a relative path.
fn select_attr(
    element: ElementRef<'_>,
    selector: &Selector,
    attr: &str,
    base_url: &str,
) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|value| resolve_url(base_url, value))
}

/// Resolve a path to a full URL, handling both absolute and relative paths.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match Url::parse(base_url).and_then(|base| base.join(path)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{base_url}{path}"),
    }
}

/// Extract one page of records from an HTML body.
fn extract_html_page(
    html: &str,
    config: &SourceConfig,
    page_number: u32,
) -> Result<FetchedPage, ScrapeError> {
    let rules = &config.extract;
    let document = Html::parse_document(html);

    let container = parse_selector(&rules.listing, "listing")?;
    let title = rules
        .title
        .as_deref()
        .map(|r| parse_selector(r, "title"))
        .transpose()?;
    let price = rules
        .price
        .as_deref()
        .map(|r| parse_selector(r, "price"))
        .transpose()?;
    let location = rules
        .location
        .as_deref()
        .map(|r| parse_selector(r, "location"))
        .transpose()?;
    let rooms = rules
        .rooms
        .as_deref()
        .map(|r| parse_selector(r, "rooms"))
        .transpose()?;
    let size = rules
        .size
        .as_deref()
        .map(|r| parse_selector(r, "size"))
        .transpose()?;
    let description = rules
        .description
        .as_deref()
        .map(|r| parse_selector(r, "description"))
        .transpose()?;
    let image = rules
        .image
        .as_deref()
        .map(|r| parse_selector(r, "image"))
        .transpose()?;
    let link = rules
        .link
        .as_deref()
        .map(|r| parse_selector(r, "link"))
        .transpose()?;

    let containers: Vec<ElementRef<'_>> = document.select(&container).collect();
    if containers.is_empty() {
        return Err(ScrapeError::Extraction(format!(
            "selector {:?} matched no listing containers",
            rules.listing
        )));
    }

    let base_url = &config.base_url;
    let mut records = Vec::with_capacity(containers.len());
    for element in &containers {
        let record = RawRecord {
            source_local_id: rules
                .id
                .as_deref()
                .and_then(|attr| element.value().attr(attr))
                .map(|s| s.to_string()),
            title: title.as_ref().and_then(|s| select_text(*element, s)),
            price: price.as_ref().and_then(|s| select_text(*element, s)),
            location: location.as_ref().and_then(|s| select_text(*element, s)),
            rooms: rooms.as_ref().and_then(|s| select_text(*element, s)),
            size: size.as_ref().and_then(|s| select_text(*element, s)),
            description: description.as_ref().and_then(|s| select_text(*element, s)),
            images: image
                .as_ref()
                .and_then(|s| select_attr(*element, s, "src", base_url))
                .into_iter()
                .collect(),
            link: link
                .as_ref()
                .and_then(|s| select_attr(*element, s, "href", base_url)),
        };
        if !record.is_empty() {
            records.push(record);
        }
    }

    // Next page: explicit link when configured, otherwise numeric paging.
    let (has_more, next_page) = match config
        .pagination
        .as_ref()
        .and_then(|p| p.next_selector.as_deref())
    {
        Some(rule) => {
            let next = parse_selector(rule, "pagination.next")?;
            let next_url = document
                .select(&next)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(|href| resolve_url(base_url, href));
            (next_url.is_some(), next_url.map(PageToken::Url))
        }
        None => {
            let has_more = !records.is_empty() && page_number > 0;
            (
                has_more,
                has_more.then(|| PageToken::Number(page_number + 1)),
            )
        }
    };

    Ok(FetchedPage {
        records,
        has_more,
        next_page,
        total_reported: None,
    })
}

/// Extract a value from nested JSON using a dot-notation path.
pub fn json_path<'a>(data: &'a serde_json::Value, path: &str) -> &'a serde_json::Value {
    if path.is_empty() {
        return data;
    }
    let mut current = data;
    for key in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(key).unwrap_or(&serde_json::Value::Null),
            serde_json::Value::Array(arr) => match key.parse::<usize>() {
                Ok(idx) => arr.get(idx).unwrap_or(&serde_json::Value::Null),
                Err(_) => &serde_json::Value::Null,
            },
            _ => &serde_json::Value::Null,
        };
    }
    current
}

fn json_string(data: &serde_json::Value, path: &str) -> Option<String> {
    match json_path(data, path) {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract one page of records from a JSON API response.
fn extract_json_page(
    body: &str,
    rules: &ExtractionRules,
    page_number: u32,
) -> Result<FetchedPage, ScrapeError> {
    let data: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ScrapeError::Extraction(format!("response is not valid JSON: {e}")))?;

    let results_path = rules.results_path.as_deref().unwrap_or("results");
    let items = match json_path(&data, results_path) {
        serde_json::Value::Array(items) => items,
        _ => {
            return Err(ScrapeError::Extraction(format!(
                "no result array at {results_path:?}"
            )))
        }
    };

    let field = |item: &serde_json::Value, rule: &Option<String>| -> Option<String> {
        rule.as_deref().and_then(|path| json_string(item, path))
    };

    let records: Vec<RawRecord> = items
        .iter()
        .map(|item| RawRecord {
            source_local_id: field(item, &rules.id),
            title: field(item, &rules.title),
            price: field(item, &rules.price),
            location: field(item, &rules.location),
            rooms: field(item, &rules.rooms),
            size: field(item, &rules.size),
            description: field(item, &rules.description),
            images: field(item, &rules.image).into_iter().collect(),
            link: field(item, &rules.link),
        })
        .filter(|r| !r.is_empty())
        .collect();

    let total_reported = rules
        .total_path
        .as_deref()
        .and_then(|path| json_path(&data, path).as_u64());

    let has_more = !records.is_empty();
    Ok(FetchedPage {
        records,
        has_more,
        next_page: has_more.then(|| PageToken::Number(page_number + 1)),
        total_reported,
    })
}
