//! Saved vehicle data model: scraped attributes, captured media, and the
//! record that aggregates both under one plate.
//!
//! The serialized shape of [`VehicleRecord`] is the persisted layout:
//! `{id, date, plate, images: [{imageBytes?, videoBytes?, date}], details}`
//! with media bytes base64-encoded and absent attributes omitted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::plate::normalize_plate;
use crate::types::{RecordId, Timestamp};

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Attributes scraped from the registration lookup site. Every field is
/// free-form text and may be absent.
///
/// A re-scrape produces a whole new value that replaces the old one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cylinders: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mot_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_to_sixty: Option<String>,
}

/// Identifies one attribute field, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeField {
    Brand,
    Model,
    Color,
    Year,
    EngineSize,
    Cylinders,
    FuelType,
    Power,
    TopSpeed,
    ZeroToSixty,
    MotStatus,
    TaxStatus,
}

impl AttributeField {
    /// Every field, in the order a detail view lists them.
    pub const ALL: [AttributeField; 12] = [
        Self::Brand,
        Self::Model,
        Self::Color,
        Self::Year,
        Self::EngineSize,
        Self::Cylinders,
        Self::FuelType,
        Self::Power,
        Self::TopSpeed,
        Self::ZeroToSixty,
        Self::MotStatus,
        Self::TaxStatus,
    ];

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Brand => "Make",
            Self::Model => "Model",
            Self::Color => "Color",
            Self::Year => "Year",
            Self::EngineSize => "Engine",
            Self::Cylinders => "Cylinders",
            Self::FuelType => "Fuel",
            Self::Power => "Power",
            Self::TopSpeed => "Top Speed",
            Self::ZeroToSixty => "0-60 mph",
            Self::MotStatus => "MOT Status",
            Self::TaxStatus => "Tax Status",
        }
    }
}

impl VehicleAttributes {
    /// Value of a single field, if present.
    pub fn get(&self, field: AttributeField) -> Option<&str> {
        let value = match field {
            AttributeField::Brand => &self.brand,
            AttributeField::Model => &self.model,
            AttributeField::Color => &self.color,
            AttributeField::Year => &self.year,
            AttributeField::EngineSize => &self.engine_size,
            AttributeField::Cylinders => &self.cylinders,
            AttributeField::FuelType => &self.fuel_type,
            AttributeField::Power => &self.power,
            AttributeField::TopSpeed => &self.top_speed,
            AttributeField::ZeroToSixty => &self.zero_to_sixty,
            AttributeField::MotStatus => &self.mot_status,
            AttributeField::TaxStatus => &self.tax_status,
        };
        value.as_deref()
    }

    /// Every field paired with its optional value, in display order.
    pub fn detail_rows(&self) -> Vec<(AttributeField, Option<&str>)> {
        AttributeField::ALL
            .iter()
            .map(|&field| (field, self.get(field)))
            .collect()
    }

    /// Only the fields that carry a value, in display order.
    pub fn present_fields(&self) -> Vec<(AttributeField, &str)> {
        AttributeField::ALL
            .iter()
            .filter_map(|&field| self.get(field).map(|v| (field, v)))
            .collect()
    }

    /// `"Brand Model"` when both are known.
    pub fn display_name(&self) -> Option<String> {
        match (&self.brand, &self.model) {
            (Some(brand), Some(model)) => Some(format!("{brand} {model}")),
            _ => None,
        }
    }

    /// True when no field carries a value (e.g. after a lookup miss).
    pub fn is_empty(&self) -> bool {
        AttributeField::ALL.iter().all(|&f| self.get(f).is_none())
    }
}

/// Whether an MOT or tax status text reports a valid status.
pub fn status_is_valid(status: &str) -> bool {
    status.contains("Valid")
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Captured bytes of a single media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Image(Vec<u8>),
    Video(Vec<u8>),
}

impl MediaPayload {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Image(b) | Self::Video(b) => b,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }
}

/// A photo or video attached to a record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MediaItemRepr", into = "MediaItemRepr")]
pub struct MediaItem {
    pub payload: MediaPayload,
    pub captured_at: Timestamp,
}

impl MediaItem {
    pub fn image(bytes: Vec<u8>, captured_at: Timestamp) -> Self {
        Self {
            payload: MediaPayload::Image(bytes),
            captured_at,
        }
    }

    pub fn video(bytes: Vec<u8>, captured_at: Timestamp) -> Self {
        Self {
            payload: MediaPayload::Video(bytes),
            captured_at,
        }
    }
}

/// Persisted form of [`MediaItem`]: exactly one of the two byte fields is set.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaItemRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_bytes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_bytes: Option<String>,
    date: Timestamp,
}

impl TryFrom<MediaItemRepr> for MediaItem {
    type Error = String;

    fn try_from(repr: MediaItemRepr) -> Result<Self, Self::Error> {
        let decode = |encoded: &str| {
            BASE64
                .decode(encoded)
                .map_err(|e| format!("invalid base64 media bytes: {e}"))
        };
        let payload = match (repr.image_bytes, repr.video_bytes) {
            (Some(image), None) => MediaPayload::Image(decode(&image)?),
            (None, Some(video)) => MediaPayload::Video(decode(&video)?),
            (Some(_), Some(_)) => {
                return Err("media item has both imageBytes and videoBytes".to_string())
            }
            (None, None) => {
                return Err("media item has neither imageBytes nor videoBytes".to_string())
            }
        };
        Ok(Self {
            payload,
            captured_at: repr.date,
        })
    }
}

impl From<MediaItem> for MediaItemRepr {
    fn from(item: MediaItem) -> Self {
        let (image_bytes, video_bytes) = match &item.payload {
            MediaPayload::Image(b) => (Some(BASE64.encode(b)), None),
            MediaPayload::Video(b) => (None, Some(BASE64.encode(b))),
        };
        Self {
            image_bytes,
            video_bytes,
            date: item.captured_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One spotted vehicle: every capture of a plate plus its latest attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: RecordId,
    /// Set on first save and never changed.
    #[serde(rename = "date")]
    pub created_at: Timestamp,
    /// As entered; see [`VehicleRecord::normalized_plate`] for the lookup key.
    pub plate: String,
    /// Newest first.
    #[serde(rename = "images")]
    pub media: Vec<MediaItem>,
    #[serde(rename = "details")]
    pub attributes: VehicleAttributes,
}

impl VehicleRecord {
    pub fn normalized_plate(&self) -> String {
        normalize_plate(&self.plate)
    }

    /// The most recent capture.
    pub fn latest_media(&self) -> Option<&MediaItem> {
        self.media.first()
    }

    /// The most recent still image, skipping videos.
    pub fn latest_image(&self) -> Option<&[u8]> {
        self.media.iter().find_map(|m| match &m.payload {
            MediaPayload::Image(bytes) => Some(bytes.as_slice()),
            MediaPayload::Video(_) => None,
        })
    }
}
