//! Collection statistics derived from a store snapshot.
//!
//! Everything here is recomputed from scratch on each call; collections
//! are small (hundreds of records) so nothing is cached. Callers pass
//! `now` explicitly so month boundaries are deterministic in tests.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::metrics::{parse_power, top_speed_rank, zero_to_sixty_rank};
use crate::types::{RecordId, Timestamp};
use crate::vehicle::{AttributeField, VehicleRecord};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of entries in a distribution chart.
pub const DEFAULT_TOP_N: usize = 5;
/// Months before the current one shown in the activity chart.
pub const DEFAULT_MONTHS_BACK: u32 = 6;
/// Bucket name for records missing the grouped attribute.
pub const UNKNOWN_LABEL: &str = "Unknown";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Attribute a distribution is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupField {
    Brand,
    Color,
}

impl GroupField {
    fn attribute(self) -> AttributeField {
        match self {
            Self::Brand => AttributeField::Brand,
            Self::Color => AttributeField::Color,
        }
    }
}

/// One bar of a distribution chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatItem {
    pub name: String,
    pub count: usize,
}

/// Number of records created in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyBucket {
    /// First day of the month.
    pub month: NaiveDate,
    pub count: usize,
}

/// Performance figure a superlative is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    Power,
    TopSpeed,
    ZeroToSixty,
}

impl PerformanceMetric {
    fn attribute(self) -> AttributeField {
        match self {
            Self::Power => AttributeField::Power,
            Self::TopSpeed => AttributeField::TopSpeed,
            Self::ZeroToSixty => AttributeField::ZeroToSixty,
        }
    }

    /// Comparable score for the scraped text. Power that cannot be parsed
    /// is skipped; speed and acceleration fall back to a worst-case rank.
    fn score(self, text: &str) -> Option<f64> {
        match self {
            Self::Power => parse_power(text).map(f64::from),
            Self::TopSpeed => Some(f64::from(top_speed_rank(Some(text)))),
            Self::ZeroToSixty => Some(zero_to_sixty_rank(Some(text))),
        }
    }

    /// Strict comparison so the earliest record wins ties.
    fn beats(self, candidate: f64, best: f64) -> bool {
        match self {
            Self::Power | Self::TopSpeed => candidate > best,
            Self::ZeroToSixty => candidate < best,
        }
    }
}

/// The record holding a performance superlative, with its raw figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceRecord {
    pub record_id: RecordId,
    /// `"Brand Model"`.
    pub title: String,
    pub power: Option<String>,
    pub top_speed: Option<String>,
    pub zero_to_sixty: Option<String>,
}

// ---------------------------------------------------------------------------
// Computations
// ---------------------------------------------------------------------------

/// Records created in the calendar month (UTC) containing `now`.
pub fn spots_in_current_month(records: &[VehicleRecord], now: Timestamp) -> usize {
    records
        .iter()
        .filter(|r| r.created_at.year() == now.year() && r.created_at.month() == now.month())
        .count()
}

/// Most common values of `field`, descending by count with ties broken by
/// name. Missing values count under [`UNKNOWN_LABEL`].
pub fn top_n_by_field(records: &[VehicleRecord], field: GroupField, n: usize) -> Vec<StatItem> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let name = record
            .attributes
            .get(field.attribute())
            .unwrap_or(UNKNOWN_LABEL);
        *counts.entry(name).or_default() += 1;
    }

    let mut items: Vec<StatItem> = counts
        .into_iter()
        .map(|(name, count)| StatItem {
            name: name.to_string(),
            count,
        })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    items.truncate(n);
    items
}

/// Dense monthly counts, oldest first: `months_back` earlier months plus
/// the current one. Months without records appear with a count of zero.
pub fn monthly_activity(
    records: &[VehicleRecord],
    months_back: u32,
    now: Timestamp,
) -> Vec<MonthlyBucket> {
    let current = month_start(now);
    (0..=months_back)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(|month| MonthlyBucket {
            month,
            count: records
                .iter()
                .filter(|r| month_start(r.created_at) == month)
                .count(),
        })
        .collect()
}

/// The record with the best value of `metric`: highest power or top speed,
/// lowest 0-60. Records without the figure or without brand and model are
/// skipped. The first record in snapshot order wins ties.
pub fn superlative(records: &[VehicleRecord], metric: PerformanceMetric) -> Option<PerformanceRecord> {
    let mut best: Option<(&VehicleRecord, f64)> = None;

    for record in records {
        let attrs = &record.attributes;
        if attrs.brand.is_none() || attrs.model.is_none() {
            continue;
        }
        let Some(score) = attrs.get(metric.attribute()).and_then(|t| metric.score(t)) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, best_score)) => metric.beats(score, best_score),
        };
        if better {
            best = Some((record, score));
        }
    }

    best.and_then(|(record, _)| performance_record(record))
}

fn performance_record(record: &VehicleRecord) -> Option<PerformanceRecord> {
    let attrs = &record.attributes;
    Some(PerformanceRecord {
        record_id: record.id,
        title: attrs.display_name()?,
        power: attrs.power.clone(),
        top_speed: attrs.top_speed.clone(),
        zero_to_sixty: attrs.zero_to_sixty.clone(),
    })
}

fn month_start(ts: Timestamp) -> NaiveDate {
    let date = ts.date_naive();
    date.with_day(1).unwrap_or(date)
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Everything the statistics screen shows, computed in one pass per view.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatistics {
    pub total_spots: usize,
    pub spots_this_month: usize,
    pub highest_power: Option<PerformanceRecord>,
    pub highest_top_speed: Option<PerformanceRecord>,
    pub quickest_zero_to_sixty: Option<PerformanceRecord>,
    pub brand_distribution: Vec<StatItem>,
    pub color_distribution: Vec<StatItem>,
    pub monthly_activity: Vec<MonthlyBucket>,
}

impl CollectionStatistics {
    pub fn compute(records: &[VehicleRecord], now: Timestamp) -> Self {
        Self {
            total_spots: records.len(),
            spots_this_month: spots_in_current_month(records, now),
            highest_power: superlative(records, PerformanceMetric::Power),
            highest_top_speed: superlative(records, PerformanceMetric::TopSpeed),
            quickest_zero_to_sixty: superlative(records, PerformanceMetric::ZeroToSixty),
            brand_distribution: top_n_by_field(records, GroupField::Brand, DEFAULT_TOP_N),
            color_distribution: top_n_by_field(records, GroupField::Color, DEFAULT_TOP_N),
            monthly_activity: monthly_activity(records, DEFAULT_MONTHS_BACK, now),
        }
    }
}
