//! Registration-count rarity tiers.
//!
//! Complements the performance-based [`is_rare`](crate::rarity::is_rare)
//! check with a tier derived from how many examples of a model are
//! registered in the UK.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Seed registration counts keyed by `"Brand Model"`.
const SEED_REGISTRATIONS: &[(&str, u32)] = &[
    ("BMW M3", 892),
    ("BMW M4", 743),
    ("Porsche 911", 1243),
    ("Ferrari 488", 156),
    ("Lamborghini Huracan", 89),
    ("Audi RS6", 1567),
    ("Mercedes AMG GT", 423),
    ("Aston Martin DB11", 234),
    ("McLaren 720S", 98),
];

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityTier {
    #[default]
    Common,
    Rare,
    VeryRare,
    UltraRare,
}

impl RarityTier {
    /// Tier for a number of registered vehicles.
    pub fn from_registration_count(count: u32) -> Self {
        match count {
            0..=100 => Self::UltraRare,
            101..=500 => Self::VeryRare,
            501..=1000 => Self::Rare,
            _ => Self::Common,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Rare => "Rare",
            Self::VeryRare => "Very Rare",
            Self::UltraRare => "Ultra Rare",
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Lookup table of registration counts per brand and model.
#[derive(Debug, Clone, Default)]
pub struct RegistrationDirectory {
    counts: HashMap<String, u32>,
}

impl RegistrationDirectory {
    /// Directory preloaded with the built-in seed counts.
    pub fn seeded() -> Self {
        Self::from_entries(
            SEED_REGISTRATIONS
                .iter()
                .map(|&(name, count)| (name.to_string(), count)),
        )
    }

    /// Directory built from caller-supplied `("Brand Model", count)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            counts: entries
                .into_iter()
                .map(|(name, count)| (directory_key(&name), count))
                .collect(),
        }
    }

    /// Registered count, when both brand and model are known and listed.
    /// Matching ignores case, so scraped upper-case makes still resolve.
    pub fn registration_count(&self, brand: Option<&str>, model: Option<&str>) -> Option<u32> {
        let (brand, model) = (brand?, model?);
        self.counts
            .get(&directory_key(&format!("{brand} {model}")))
            .copied()
    }
}

fn directory_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
