//! Vehicle attribute lookup by scraping a public registration-check page.
//!
//! The page lays out vehicle facts as `<tr><th>Label</th><td>Value</td></tr>`
//! rows, with MOT and tax summaries in `div.block-result` panels. Parsing is
//! a pure function ([`parse_vehicle_page`]) so it can be tested offline.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use spotted_core::plate::normalize_plate;
use spotted_core::vehicle::VehicleAttributes;

use crate::error::LookupError;

const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.9";

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("valid regex"));

static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("valid regex"));

static BLOCK_RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div\b[^>]*\bclass\s*=\s*["'][^"']*\bblock-result\b[^"']*["'][^>]*>(.*?)</div>"#)
        .expect("valid regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of vehicle attributes for a registration plate.
///
/// A plate the source does not know yields [`VehicleAttributes::default`]
/// rather than an error.
#[async_trait]
pub trait AttributeLookup: Send + Sync {
    async fn lookup(&self, plate: &str) -> Result<VehicleAttributes, LookupError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

pub struct CarCheckClient {
    client: reqwest::Client,
    base_url: String,
}

impl CarCheckClient {
    /// * `base_url` - Check page prefix, e.g. `https://www.carcheck.co.uk/check/`.
    pub fn new(base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Page URL for a plate; the plate is normalized first.
    pub fn check_url(&self, plate: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            normalize_plate(plate)
        )
    }
}

#[async_trait]
impl AttributeLookup for CarCheckClient {
    async fn lookup(&self, plate: &str) -> Result<VehicleAttributes, LookupError> {
        let url = self.check_url(plate);
        tracing::debug!(%url, "Requesting vehicle check page");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, MOBILE_USER_AGENT)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::info!(plate, "Vehicle check page not found");
            return Ok(VehicleAttributes::default());
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LookupError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let html = response.text().await?;
        let attributes = parse_vehicle_page(&html);
        tracing::info!(
            plate,
            fields = attributes.present_fields().len(),
            "Vehicle attributes scraped"
        );
        Ok(attributes)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract vehicle attributes from a check page.
///
/// Each field comes from the first table row whose text contains the
/// label (case-insensitive), taking that row's first `<td>`. Missing rows
/// and empty cells stay `None`.
pub fn parse_vehicle_page(html: &str) -> VehicleAttributes {
    let rows: Vec<Row> = ROW_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|inner| Row::parse(inner.as_str()))
        .collect();

    let row_value = |label: &str| -> Option<String> {
        let needle = label.to_lowercase();
        rows.iter()
            .filter(|row| row.text.to_lowercase().contains(&needle))
            .find_map(|row| row.first_cell.clone())
    };

    let blocks: Vec<String> = BLOCK_RESULT_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|inner| html_text(inner.as_str()))
        .collect();

    let block_value = |label: &str| -> Option<String> {
        let needle = label.to_lowercase();
        blocks
            .iter()
            .find(|text| text.to_lowercase().contains(&needle))
            .filter(|text| !text.is_empty())
            .cloned()
    };

    VehicleAttributes {
        brand: row_value("Make"),
        model: row_value("Model"),
        color: row_value("Colour"),
        year: row_value("Year of manufacture"),
        engine_size: row_value("Engine capacity"),
        cylinders: row_value("Cylinders"),
        fuel_type: row_value("Fuel type"),
        mot_status: block_value("MOT"),
        tax_status: block_value("Tax"),
        power: row_value("Power"),
        top_speed: row_value("Top speed"),
        zero_to_sixty: row_value("0 - 60 mph"),
    }
}

struct Row {
    /// Whole-row text, used for label matching.
    text: String,
    first_cell: Option<String>,
}

impl Row {
    fn parse(inner: &str) -> Self {
        let first_cell = CELL_RE
            .captures(inner)
            .and_then(|caps| caps.get(1))
            .map(|cell| html_text(cell.as_str()))
            .filter(|text| !text.is_empty());
        Self {
            text: html_text(inner),
            first_cell,
        }
    }
}

/// Visible text of an HTML fragment with whitespace collapsed.
fn html_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
