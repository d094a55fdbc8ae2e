//! Shareable summary card for a single spotted vehicle.

use serde::Serialize;

use crate::rarity::is_rare;
use crate::registration::{RarityTier, RegistrationDirectory};
use crate::types::Timestamp;
use crate::vehicle::{AttributeField, VehicleRecord};

/// Performance fields shown on the card, in order.
const CARD_STATS: [AttributeField; 3] = [
    AttributeField::Power,
    AttributeField::TopSpeed,
    AttributeField::ZeroToSixty,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardStat {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareCard {
    /// `"Brand Model"` when both are known.
    pub title: Option<String>,
    pub plate: String,
    /// `Common` when the registration count is unknown.
    pub tier: RarityTier,
    pub registration_count: Option<u32>,
    /// Performance-based rarity, independent of the registration tier.
    pub high_performance: bool,
    pub stats: Vec<CardStat>,
    pub spotted_on: Timestamp,
    pub has_image: bool,
}

impl ShareCard {
    pub fn for_record(record: &VehicleRecord, directory: &RegistrationDirectory) -> Self {
        let attrs = &record.attributes;
        let registration_count =
            directory.registration_count(attrs.brand.as_deref(), attrs.model.as_deref());
        let tier = registration_count
            .map(RarityTier::from_registration_count)
            .unwrap_or_default();

        let stats = CARD_STATS
            .iter()
            .filter_map(|&field| {
                attrs.get(field).map(|value| CardStat {
                    label: field.label(),
                    value: value.to_string(),
                })
            })
            .collect();

        Self {
            title: attrs.display_name(),
            plate: record.plate.clone(),
            tier,
            registration_count,
            high_performance: is_rare(attrs),
            stats,
            spotted_on: record.created_at,
            has_image: record.latest_image().is_some(),
        }
    }

    /// Plain-text rendering, one line per card section.
    pub fn render_text(&self) -> String {
        let mut lines = vec!["SPOTTED".to_string()];

        let heading = self.title.as_deref().unwrap_or("Unknown vehicle");
        lines.push(format!("{heading} [{}]", self.tier.label()));
        lines.push(format!("Plate: {}", self.plate));

        if let Some(count) = self.registration_count {
            lines.push(format!("Only {count} registered in UK"));
        }
        if self.high_performance {
            lines.push("High performance".to_string());
        }
        if !self.stats.is_empty() {
            let stats: Vec<String> = self
                .stats
                .iter()
                .map(|s| format!("{}: {}", s.label, s.value))
                .collect();
            lines.push(stats.join(" | "));
        }

        lines.push(format!(
            "Spotted on {}",
            self.spotted_on.format("%-d %b %Y %H:%M UTC")
        ));
        lines.join("\n")
    }
}
