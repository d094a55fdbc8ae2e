//! Capture-to-record flow: recognize a plate, look up the vehicle, save.

use std::sync::Arc;

use spotted_core::error::CoreError;
use spotted_core::store::{SnapshotPersistence, VehicleRecordStore};
use spotted_core::types::RecordId;
use spotted_core::vehicle::{MediaItem, VehicleAttributes};

use crate::error::LookupError;
use crate::recognizer::PlateRecognizer;
use crate::scraper::AttributeLookup;

/// Result of a successful [`SpotPipeline::spot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpotOutcome {
    pub record_id: RecordId,
    /// Plate as stored for a new record (upper case).
    pub plate: String,
    pub score: f64,
    /// `true` when the capture was merged into an existing record.
    pub merged: bool,
    pub attributes: VehicleAttributes,
}

pub struct SpotPipeline {
    recognizer: Arc<dyn PlateRecognizer>,
    lookup: Arc<dyn AttributeLookup>,
}

impl SpotPipeline {
    pub fn new(recognizer: Arc<dyn PlateRecognizer>, lookup: Arc<dyn AttributeLookup>) -> Self {
        Self { recognizer, lookup }
    }

    /// Read the plate from `image`, fetch its attributes and save `media`
    /// under it.
    ///
    /// `image` is what gets uploaded for recognition; `media` is what gets
    /// stored, which may be a video the image was taken from. Nothing is
    /// saved unless both remote steps succeed.
    pub async fn spot<P: SnapshotPersistence>(
        &self,
        store: &mut VehicleRecordStore<P>,
        image: &[u8],
        media: MediaItem,
    ) -> Result<SpotOutcome, LookupError> {
        let response = self.recognizer.recognize(image).await?;
        let best = response.best_match().ok_or(LookupError::NoPlateFound)?;
        let plate = best.plate.to_uppercase();
        let score = best.score;
        tracing::info!(plate = %plate, score, "Plate recognized");

        let attributes = self.lookup.lookup(&plate).await?;

        let merged = store.find_by_plate(&plate).is_some();
        let record_id = store.save(&plate, media, attributes.clone());

        Ok(SpotOutcome {
            record_id,
            plate,
            score,
            merged,
            attributes,
        })
    }

    /// Save a capture under a plate typed in by hand, optionally skipping
    /// the attribute lookup.
    pub async fn add_manual<P: SnapshotPersistence>(
        &self,
        store: &mut VehicleRecordStore<P>,
        plate: &str,
        media: MediaItem,
        lookup: bool,
    ) -> Result<RecordId, LookupError> {
        let plate = plate.trim();
        if plate.is_empty() {
            return Err(CoreError::Validation("Plate must not be empty".into()).into());
        }
        let attributes = if lookup {
            self.lookup.lookup(plate).await?
        } else {
            VehicleAttributes::default()
        };
        Ok(store.save(plate, media, attributes))
    }

    /// Correct a record's plate and replace its attributes with a fresh
    /// lookup of the new plate. The record's media is kept.
    pub async fn refresh_plate<P: SnapshotPersistence>(
        &self,
        store: &mut VehicleRecordStore<P>,
        id: RecordId,
        new_plate: &str,
    ) -> Result<VehicleAttributes, LookupError> {
        if store.get(id).is_none() {
            return Err(CoreError::NotFound {
                entity: "vehicle",
                id,
            }
            .into());
        }
        let new_plate = new_plate.trim();
        if new_plate.is_empty() {
            return Err(CoreError::Validation("Plate must not be empty".into()).into());
        }
        let attributes = self.lookup.lookup(new_plate).await?;
        store.update_attributes_and_plate(id, new_plate, attributes.clone())?;
        Ok(attributes)
    }
}
