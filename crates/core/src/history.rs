//! Search and filtering for the saved-vehicles history list.

use chrono::{Duration, Months};
use serde::{Deserialize, Serialize};

use crate::rarity::is_rare;
use crate::types::Timestamp;
use crate::vehicle::VehicleRecord;

/// Preset filters offered by the history list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryFilter {
    #[default]
    All,
    LastWeek,
    LastMonth,
    ByBrand,
    Rare,
}

impl HistoryFilter {
    pub const ALL: [HistoryFilter; 5] = [
        Self::All,
        Self::LastWeek,
        Self::LastMonth,
        Self::ByBrand,
        Self::Rare,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::LastWeek => "Last Week",
            Self::LastMonth => "Last Month",
            Self::ByBrand => "By Brand",
            Self::Rare => "Rare Cars",
        }
    }
}

/// Whether `record` matches a free-text search over plate, brand and model.
/// An empty search matches everything.
pub fn matches_search(record: &VehicleRecord, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let attrs = &record.attributes;
    [Some(record.plate.as_str()), attrs.brand.as_deref(), attrs.model.as_deref()]
        .into_iter()
        .flatten()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
}

/// Apply the search text, then the preset filter.
///
/// `ByBrand` keeps every record but sorts by brand (missing brands first);
/// the other presets keep snapshot order.
pub fn filter_history<'a>(
    records: &'a [VehicleRecord],
    search: &str,
    filter: HistoryFilter,
    now: Timestamp,
) -> Vec<&'a VehicleRecord> {
    let mut matched: Vec<&VehicleRecord> = records
        .iter()
        .filter(|r| matches_search(r, search))
        .collect();

    match filter {
        HistoryFilter::All => {}
        HistoryFilter::LastWeek => {
            let cutoff = now - Duration::days(7);
            matched.retain(|r| r.created_at >= cutoff);
        }
        HistoryFilter::LastMonth => {
            let cutoff = now.checked_sub_months(Months::new(1)).unwrap_or(now);
            matched.retain(|r| r.created_at >= cutoff);
        }
        HistoryFilter::ByBrand => {
            matched.sort_by(|a, b| {
                let a = a.attributes.brand.as_deref().unwrap_or("");
                let b = b.attributes.brand.as_deref().unwrap_or("");
                a.cmp(b)
            });
        }
        HistoryFilter::Rare => matched.retain(|r| is_rare(&r.attributes)),
    }

    matched
}
