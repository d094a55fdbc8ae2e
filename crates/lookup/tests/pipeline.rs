//! Integration tests for the spotting pipeline against in-process fakes.
//!
//! Verifies that:
//! - The highest-scoring plate is saved upper case with looked-up attributes
//! - A second capture of the same plate merges into the existing record
//! - No plate, or a failing lookup, leaves the store untouched
//! - `refresh_plate` replaces plate and attributes but keeps media

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::Utc;
use spotted_core::error::CoreError;
use spotted_core::store::{InMemoryPersistence, VehicleRecordStore};
use spotted_core::types::RecordId;
use spotted_core::vehicle::{MediaItem, VehicleAttributes};
use spotted_lookup::recognizer::{
    BoundingBox, DetectedVehicle, PlateRecognizer, PlateRegion, PlateResponse, PlateResult,
};
use spotted_lookup::{AttributeLookup, LookupError, SpotPipeline};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Returns canned candidates regardless of the image.
struct FakeRecognizer {
    candidates: Vec<(&'static str, f64)>,
}

#[async_trait]
impl PlateRecognizer for FakeRecognizer {
    async fn recognize(&self, _image: &[u8]) -> Result<PlateResponse, LookupError> {
        let bbox = BoundingBox { xmin: 0, ymin: 0, xmax: 10, ymax: 10 };
        let results = self
            .candidates
            .iter()
            .map(|&(plate, score)| PlateResult {
                bounding_box: bbox,
                plate: plate.to_string(),
                region: PlateRegion { code: "gb".into(), score: 0.9 },
                vehicle: DetectedVehicle { kind: "Sedan".into(), score: 0.9, bounding_box: bbox },
                score,
            })
            .collect();
        Ok(PlateResponse {
            results,
            timestamp: "2024-03-09T14:30:00Z".into(),
            version: 1,
            camera_id: None,
        })
    }
}

/// Serves attributes from a table keyed by plate and records every query.
#[derive(Default)]
struct FakeLookup {
    table: HashMap<String, VehicleAttributes>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl FakeLookup {
    fn with(plate: &str, attributes: VehicleAttributes) -> Self {
        let mut lookup = Self::default();
        lookup.table.insert(plate.to_string(), attributes);
        lookup
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttributeLookup for FakeLookup {
    async fn lookup(&self, plate: &str) -> Result<VehicleAttributes, LookupError> {
        self.queries.lock().unwrap().push(plate.to_string());
        if self.fail {
            return Err(LookupError::Api { status: 503, body: "down".into() });
        }
        Ok(self.table.get(plate).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn attrs(brand: &str, model: &str) -> VehicleAttributes {
    VehicleAttributes {
        brand: Some(brand.into()),
        model: Some(model.into()),
        ..Default::default()
    }
}

fn pipeline(
    candidates: Vec<(&'static str, f64)>,
    lookup: FakeLookup,
) -> (SpotPipeline, Arc<FakeLookup>) {
    let lookup = Arc::new(lookup);
    let pipeline = SpotPipeline::new(Arc::new(FakeRecognizer { candidates }), lookup.clone());
    (pipeline, lookup)
}

fn empty_store() -> VehicleRecordStore<InMemoryPersistence> {
    VehicleRecordStore::open(InMemoryPersistence::default())
}

fn photo() -> MediaItem {
    MediaItem::image(vec![0xFF, 0xD8], Utc::now())
}

// ---------------------------------------------------------------------------
// spot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spot_saves_best_candidate_upper_case() {
    let (pipeline, lookup) = pipeline(
        vec![("ab12cdx", 0.4), ("ab12cde", 0.95)],
        FakeLookup::with("AB12CDE", attrs("BMW", "M3")),
    );
    let mut store = empty_store();

    let outcome = pipeline.spot(&mut store, &[1, 2, 3], photo()).await.unwrap();

    assert_eq!(outcome.plate, "AB12CDE");
    assert!(!outcome.merged);
    assert_eq!(lookup.queries(), vec!["AB12CDE"]);

    let record = store.get(outcome.record_id).unwrap();
    assert_eq!(record.plate, "AB12CDE");
    assert_eq!(record.attributes.brand.as_deref(), Some("BMW"));
    assert_eq!(store.persistence().saved().len(), 1);
}

#[tokio::test]
async fn second_capture_merges_into_existing_record() {
    let (pipeline, _) = pipeline(vec![("ab12cde", 0.9)], FakeLookup::with("AB12CDE", attrs("BMW", "M3")));
    let mut store = empty_store();
    store.save("AB12 CDE", photo(), VehicleAttributes::default());

    let video = MediaItem::video(vec![9, 9], Utc::now());
    let outcome = pipeline.spot(&mut store, &[1], video.clone()).await.unwrap();

    assert!(outcome.merged);
    assert_eq!(store.len(), 1);
    let record = store.get(outcome.record_id).unwrap();
    assert_eq!(record.plate, "AB12 CDE");
    assert_eq!(record.media.len(), 2);
    assert_eq!(record.media[0], video);
    assert_eq!(record.attributes.model.as_deref(), Some("M3"));
}

#[tokio::test]
async fn no_plate_found_saves_nothing() {
    let (pipeline, lookup) = pipeline(vec![], FakeLookup::default());
    let mut store = empty_store();

    let err = pipeline.spot(&mut store, &[1], photo()).await.unwrap_err();

    assert_matches!(err, LookupError::NoPlateFound);
    assert!(store.is_empty());
    assert!(lookup.queries().is_empty());
}

#[tokio::test]
async fn failed_lookup_saves_nothing() {
    let failing = FakeLookup { fail: true, ..Default::default() };
    let (pipeline, _) = pipeline(vec![("ab12cde", 0.9)], failing);
    let mut store = empty_store();

    let err = pipeline.spot(&mut store, &[1], photo()).await.unwrap_err();

    assert_matches!(err, LookupError::Api { status: 503, .. });
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// add_manual
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_manual_without_lookup_stores_empty_attributes() {
    let (pipeline, lookup) = pipeline(vec![], FakeLookup::with("XY99ZZZ", attrs("FORD", "GT")));
    let mut store = empty_store();

    let id = pipeline.add_manual(&mut store, " XY99 ZZZ ", photo(), false).await.unwrap();

    let record = store.get(id).unwrap();
    assert_eq!(record.plate, "XY99 ZZZ");
    assert!(record.attributes.is_empty());
    assert!(lookup.queries().is_empty());
}

#[tokio::test]
async fn add_manual_rejects_blank_plate() {
    let (pipeline, _) = pipeline(vec![], FakeLookup::default());
    let mut store = empty_store();

    let err = pipeline.add_manual(&mut store, "   ", photo(), true).await.unwrap_err();

    assert_matches!(err, LookupError::Core(CoreError::Validation(_)));
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// refresh_plate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_plate_replaces_plate_and_attributes_keeping_media() {
    let (pipeline, lookup) = pipeline(vec![], FakeLookup::with("AB12CDF", attrs("AUDI", "RS6")));
    let mut store = empty_store();
    let id = store.save("AB12CDE", photo(), attrs("BMW", "M3"));

    let attributes = pipeline.refresh_plate(&mut store, id, "AB12CDF").await.unwrap();

    assert_eq!(attributes.brand.as_deref(), Some("AUDI"));
    assert_eq!(lookup.queries(), vec!["AB12CDF"]);
    let record = store.get(id).unwrap();
    assert_eq!(record.plate, "AB12CDF");
    assert_eq!(record.attributes.model.as_deref(), Some("RS6"));
    assert_eq!(record.media.len(), 1);
}

#[tokio::test]
async fn refresh_plate_unknown_id_skips_lookup() {
    let (pipeline, lookup) = pipeline(vec![], FakeLookup::default());
    let mut store = empty_store();

    let err = pipeline
        .refresh_plate(&mut store, RecordId::new_v4(), "AB12CDE")
        .await
        .unwrap_err();

    assert_matches!(err, LookupError::Core(CoreError::NotFound { entity: "vehicle", .. }));
    assert!(lookup.queries().is_empty());
}

#[tokio::test]
async fn refresh_plate_to_another_records_plate_conflicts() {
    let (pipeline, _) = pipeline(vec![], FakeLookup::default());
    let mut store = empty_store();
    let first = store.save("AAA111", photo(), VehicleAttributes::default());
    store.save("BBB222", photo(), VehicleAttributes::default());

    let err = pipeline.refresh_plate(&mut store, first, "bbb 222").await.unwrap_err();

    assert_matches!(err, LookupError::Core(CoreError::Conflict(_)));
    assert_eq!(store.get(first).unwrap().plate, "AAA111");
}
