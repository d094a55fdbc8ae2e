//! Plain-text and JSON rendering for command output.

use serde::Serialize;
use spotted_core::rarity::is_rare;
use spotted_core::statistics::{CollectionStatistics, PerformanceRecord, StatItem};
use spotted_core::types::{RecordId, Timestamp};
use spotted_core::vehicle::{status_is_valid, AttributeField, VehicleRecord};

const NOT_AVAILABLE: &str = "Not available";

/// One row of `list` output. Media bytes are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: RecordId,
    pub plate: String,
    pub date: Timestamp,
    pub title: Option<String>,
    pub media_count: usize,
    /// Capture time of the newest media item.
    pub last_spotted: Option<Timestamp>,
    pub rare: bool,
}

impl From<&VehicleRecord> for RecordSummary {
    fn from(record: &VehicleRecord) -> Self {
        Self {
            id: record.id,
            plate: record.plate.clone(),
            date: record.created_at,
            title: record.attributes.display_name(),
            media_count: record.media.len(),
            last_spotted: record.latest_media().map(|m| m.captured_at),
            rare: is_rare(&record.attributes),
        }
    }
}

pub fn summary_line(summary: &RecordSummary) -> String {
    let mut line = format!(
        "{}  {}  {:<10}  {}  ({} media",
        summary.id,
        summary.date.format("%Y-%m-%d"),
        summary.plate,
        summary.title.as_deref().unwrap_or("Unknown vehicle"),
        summary.media_count,
    );
    match summary.last_spotted {
        Some(at) if at.date_naive() != summary.date.date_naive() => {
            line.push_str(&format!(", last {})", at.format("%Y-%m-%d")));
        }
        _ => line.push(')'),
    }
    if summary.rare {
        line.push_str("  [rare]");
    }
    line
}

/// Full detail view of a record: header, every attribute row, media list.
pub fn detail_text(record: &VehicleRecord) -> String {
    let mut lines = vec![
        format!("Plate: {}", record.plate),
        format!("Spotted: {}", record.created_at.format("%-d %b %Y %H:%M UTC")),
        format!("Id: {}", record.id),
        String::new(),
    ];

    for (field, value) in record.attributes.detail_rows() {
        let value = match (field, value) {
            (AttributeField::MotStatus | AttributeField::TaxStatus, Some(status)) => {
                let mark = if status_is_valid(status) { "ok" } else { "!!" };
                format!("{status} [{mark}]")
            }
            (_, Some(v)) => v.to_string(),
            (_, None) => NOT_AVAILABLE.to_string(),
        };
        lines.push(format!("{:<12} {value}", format!("{}:", field.label())));
    }

    lines.push(String::new());
    lines.push(format!("Media ({}):", record.media.len()));
    for (index, item) in record.media.iter().enumerate() {
        let kind = if item.payload.is_video() { "video" } else { "image" };
        lines.push(format!(
            "  [{index}] {kind}  {} bytes  {}",
            item.payload.bytes().len(),
            item.captured_at.format("%Y-%m-%d %H:%M")
        ));
    }

    lines.join("\n")
}

pub fn stats_text(stats: &CollectionStatistics) -> String {
    let mut lines = vec![
        format!("Total spots: {}", stats.total_spots),
        format!("This month:  {}", stats.spots_this_month),
        String::new(),
    ];

    let superlatives = [
        ("Highest power", &stats.highest_power, AttributeField::Power),
        ("Top speed", &stats.highest_top_speed, AttributeField::TopSpeed),
        ("Quickest 0-60", &stats.quickest_zero_to_sixty, AttributeField::ZeroToSixty),
    ];
    for (heading, record, field) in superlatives {
        lines.push(format!("{heading}: {}", superlative_text(record.as_ref(), field)));
    }

    push_distribution(&mut lines, "Top brands", &stats.brand_distribution);
    push_distribution(&mut lines, "Top colours", &stats.color_distribution);

    lines.push(String::new());
    lines.push("Monthly activity:".to_string());
    for bucket in &stats.monthly_activity {
        lines.push(format!("  {}  {}", bucket.month.format("%b %Y"), bucket.count));
    }

    lines.join("\n")
}

fn superlative_text(record: Option<&PerformanceRecord>, field: AttributeField) -> String {
    let Some(record) = record else {
        return "-".to_string();
    };
    let figure = match field {
        AttributeField::Power => record.power.as_deref(),
        AttributeField::TopSpeed => record.top_speed.as_deref(),
        _ => record.zero_to_sixty.as_deref(),
    };
    format!("{} ({})", record.title, figure.unwrap_or(NOT_AVAILABLE))
}

fn push_distribution(lines: &mut Vec<String>, heading: &str, items: &[StatItem]) {
    lines.push(String::new());
    lines.push(format!("{heading}:"));
    if items.is_empty() {
        lines.push("  -".to_string());
    }
    for item in items {
        lines.push(format!("  {:<16} {}", item.name, item.count));
    }
}
