//! In-memory collection of saved vehicle records.
//!
//! [`VehicleRecordStore`] is the only mutator of persisted state. Every
//! mutation rewrites the whole snapshot through a [`SnapshotPersistence`]
//! backend. Persistence failures are logged and swallowed: the in-memory
//! collection stays authoritative for the session and the next successful
//! mutation re-persists everything.
//!
//! The store holds at most one record per normalized plate. Mutations take
//! `&mut self`; a host sharing the store between tasks must wrap it in a
//! mutex because find-or-create is check-then-act.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::CoreError;
use crate::plate::{normalize_plate, plates_match};
use crate::types::{RecordId, Timestamp};
use crate::vehicle::{MediaItem, VehicleAttributes, VehicleRecord};

// ---------------------------------------------------------------------------
// Persistence boundary
// ---------------------------------------------------------------------------

/// Backing store that loads and saves the full record snapshot.
pub trait SnapshotPersistence {
    fn load_all(&self) -> Result<Vec<VehicleRecord>, CoreError>;
    fn save_all(&self, records: &[VehicleRecord]) -> Result<(), CoreError>;
}

/// Keeps the last saved snapshot in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    saved: Mutex<Vec<VehicleRecord>>,
}

impl InMemoryPersistence {
    pub fn new(records: Vec<VehicleRecord>) -> Self {
        Self {
            saved: Mutex::new(records),
        }
    }

    /// Copy of the last saved snapshot.
    pub fn saved(&self) -> Vec<VehicleRecord> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SnapshotPersistence for InMemoryPersistence {
    fn load_all(&self) -> Result<Vec<VehicleRecord>, CoreError> {
        self.saved
            .lock()
            .map(|s| s.clone())
            .map_err(|_| CoreError::Internal("in-memory snapshot lock poisoned".into()))
    }

    fn save_all(&self, records: &[VehicleRecord]) -> Result<(), CoreError> {
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| CoreError::Internal("in-memory snapshot lock poisoned".into()))?;
        *saved = records.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Change notification
// ---------------------------------------------------------------------------

/// Emitted to subscribers after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A previously unseen plate was saved.
    Created(RecordId),
    /// New media was merged into an existing record.
    Merged(RecordId),
    /// Plate and attributes were replaced by an edit.
    Updated(RecordId),
    /// One media item was pruned from a record.
    MediaRemoved { id: RecordId, index: usize },
    Deleted(RecordId),
}

impl StoreChange {
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Created(id)
            | Self::Merged(id)
            | Self::Updated(id)
            | Self::Deleted(id)
            | Self::MediaRemoved { id, .. } => *id,
        }
    }
}

/// Handle returned by [`VehicleRecordStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StoreChange) + Send>;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct VehicleRecordStore<P> {
    records: Vec<VehicleRecord>,
    persistence: P,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    load_error: Option<CoreError>,
}

impl<P: SnapshotPersistence> VehicleRecordStore<P> {
    /// Load the persisted snapshot. A load failure is logged, kept in
    /// [`load_error`](Self::load_error), and the store starts empty. The
    /// backend must preserve an unreadable snapshot itself before the next
    /// save replaces it.
    pub fn open(persistence: P) -> Self {
        match persistence.load_all() {
            Ok(records) => {
                tracing::info!(count = records.len(), "Loaded saved vehicles");
                Self::with_records(records, persistence)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load saved vehicles, starting empty");
                let mut store = Self::with_records(Vec::new(), persistence);
                store.load_error = Some(e);
                store
            }
        }
    }

    /// Build a store around records that are already in memory. Records
    /// sharing a normalized plate are merged. Nothing is persisted until the
    /// first mutation.
    pub fn with_records(records: Vec<VehicleRecord>, persistence: P) -> Self {
        Self {
            records: merge_duplicate_plates(records),
            persistence,
            subscribers: Vec::new(),
            next_subscription: 0,
            load_error: None,
        }
    }

    /// Why the snapshot could not be loaded, if [`open`](Self::open) failed
    /// to read it.
    pub fn load_error(&self) -> Option<&CoreError> {
        self.load_error.as_ref()
    }

    // ---- reads ----

    /// Read-only view in stable insertion order.
    pub fn snapshot(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&VehicleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Find the record whose plate normalizes equal to `plate`.
    pub fn find_by_plate(&self, plate: &str) -> Option<&VehicleRecord> {
        self.records.iter().find(|r| plates_match(&r.plate, plate))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    // ---- mutations ----

    /// Save a capture, merging into the existing record for the same
    /// normalized plate. Returns the affected record's id.
    pub fn save(
        &mut self,
        plate: &str,
        media: MediaItem,
        attributes: VehicleAttributes,
    ) -> RecordId {
        self.save_at(plate, media, attributes, Utc::now())
    }

    /// [`save`](Self::save) with an explicit creation time for new records.
    ///
    /// On merge the new media is prepended and the attributes replaced; the
    /// stored plate text is left as it was.
    pub fn save_at(
        &mut self,
        plate: &str,
        media: MediaItem,
        attributes: VehicleAttributes,
        now: Timestamp,
    ) -> RecordId {
        let key = normalize_plate(plate);
        let change = match self.position_by_plate(&key) {
            Some(idx) => {
                let record = &mut self.records[idx];
                record.media.insert(0, media);
                record.attributes = attributes;
                tracing::info!(record_id = %record.id, plate = %record.plate, "Merged with existing vehicle");
                StoreChange::Merged(record.id)
            }
            None => {
                let record = VehicleRecord {
                    id: RecordId::new_v4(),
                    created_at: now,
                    plate: plate.to_string(),
                    media: vec![media],
                    attributes,
                };
                tracing::info!(record_id = %record.id, plate = %record.plate, "Created new vehicle");
                let id = record.id;
                self.records.push(record);
                StoreChange::Created(id)
            }
        };

        let id = change.record_id();
        self.commit(change);
        id
    }

    /// Replace the plate text and attributes of an existing record, leaving
    /// its media untouched.
    ///
    /// Fails with [`CoreError::NotFound`] for an unknown id and with
    /// [`CoreError::Conflict`] when the new plate already belongs to a
    /// different record.
    pub fn update_attributes_and_plate(
        &mut self,
        id: RecordId,
        new_plate: &str,
        new_attributes: VehicleAttributes,
    ) -> Result<(), CoreError> {
        if new_plate.trim().is_empty() {
            return Err(CoreError::Validation("Plate must not be empty".into()));
        }
        let idx = self.position_by_id(id)?;

        let key = normalize_plate(new_plate);
        if let Some(other) = self.position_by_plate(&key).filter(|&other| other != idx) {
            return Err(CoreError::Conflict(format!(
                "Plate '{new_plate}' already belongs to vehicle {}",
                self.records[other].id
            )));
        }

        let record = &mut self.records[idx];
        record.plate = new_plate.to_string();
        record.attributes = new_attributes;
        tracing::info!(record_id = %id, plate = %new_plate, "Updated vehicle plate and details");

        self.commit(StoreChange::Updated(id));
        Ok(())
    }

    /// Prune one media item. A record must keep at least one item; delete
    /// the record instead of removing its last capture.
    pub fn remove_media(&mut self, id: RecordId, index: usize) -> Result<MediaItem, CoreError> {
        let idx = self.position_by_id(id)?;
        let media = &mut self.records[idx].media;
        if index >= media.len() {
            return Err(CoreError::Validation(format!(
                "Media index {index} out of range (vehicle has {} items)",
                media.len()
            )));
        }
        if media.len() == 1 {
            return Err(CoreError::Validation(
                "Cannot remove the only media item; delete the vehicle instead".into(),
            ));
        }
        let removed = media.remove(index);
        tracing::info!(record_id = %id, index, "Removed media item");

        self.commit(StoreChange::MediaRemoved { id, index });
        Ok(removed)
    }

    /// Delete a record and all of its media. Returns `false` (and persists
    /// nothing) when the id is unknown.
    pub fn delete(&mut self, id: RecordId) -> bool {
        let Some(idx) = self.records.iter().position(|r| r.id == id) else {
            tracing::debug!(record_id = %id, "Delete ignored, vehicle not found");
            return false;
        };
        let removed = self.records.remove(idx);
        tracing::info!(record_id = %id, plate = %removed.plate, "Deleted vehicle");

        self.commit(StoreChange::Deleted(id));
        true
    }

    // ---- subscriptions ----

    /// Register a callback invoked after every mutation.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&StoreChange) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    // ---- private helpers ----

    fn position_by_plate(&self, key: &str) -> Option<usize> {
        self.records.iter().position(|r| r.normalized_plate() == key)
    }

    fn position_by_id(&self, id: RecordId) -> Result<usize, CoreError> {
        self.records
            .iter()
            .position(|r| r.id == id)
            .ok_or(CoreError::NotFound {
                entity: "vehicle",
                id,
            })
    }

    /// Persist the snapshot, then notify subscribers.
    fn commit(&mut self, change: StoreChange) {
        self.persist();
        for (_, callback) in &mut self.subscribers {
            callback(&change);
        }
    }

    fn persist(&self) {
        match self.persistence.save_all(&self.records) {
            Ok(()) => tracing::debug!(count = self.records.len(), "Saved vehicles"),
            Err(e) => tracing::error!(
                error = %e,
                count = self.records.len(),
                "Failed to persist vehicles, keeping in-memory state"
            ),
        }
    }
}

/// Fold records that share a normalized plate into the first occurrence.
///
/// Older snapshots may predate whitespace-insensitive matching. The merged
/// record keeps the first record's id, plate and attributes, the earliest
/// creation date, and all media newest first.
fn merge_duplicate_plates(records: Vec<VehicleRecord>) -> Vec<VehicleRecord> {
    let mut merged: Vec<VehicleRecord> = Vec::with_capacity(records.len());
    for record in records {
        let key = record.normalized_plate();
        match merged.iter_mut().find(|r| r.normalized_plate() == key) {
            Some(existing) => {
                tracing::warn!(
                    kept = %existing.id,
                    dropped = %record.id,
                    plate = %existing.plate,
                    "Merging duplicate saved vehicles"
                );
                existing.created_at = existing.created_at.min(record.created_at);
                existing.media.extend(record.media);
                existing
                    .media
                    .sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
            }
            None => merged.push(record),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    use super::*;

    /// Persistence double that counts writes and can be told to fail.
    #[derive(Default)]
    struct FlakyPersistence {
        inner: InMemoryPersistence,
        writes: AtomicUsize,
        fail: AtomicBool,
    }

    impl SnapshotPersistence for FlakyPersistence {
        fn load_all(&self) -> Result<Vec<VehicleRecord>, CoreError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Persistence("disk on fire".into()));
            }
            self.inner.load_all()
        }

        fn save_all(&self, records: &[VehicleRecord]) -> Result<(), CoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Persistence("disk on fire".into()));
            }
            self.inner.save_all(records)
        }
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn image(tag: u8, at: Timestamp) -> MediaItem {
        MediaItem::image(vec![tag], at)
    }

    fn attrs(brand: &str) -> VehicleAttributes {
        VehicleAttributes {
            brand: Some(brand.into()),
            ..Default::default()
        }
    }

    fn store() -> VehicleRecordStore<FlakyPersistence> {
        VehicleRecordStore::open(FlakyPersistence::default())
    }

    // -- save --

    #[test]
    fn save_creates_record_with_plate_as_given() {
        let mut store = store();
        let id = store.save_at("ab12 cde", image(1, t0()), attrs("FORD"), t0());

        let record = store.get(id).unwrap();
        assert_eq!(record.plate, "ab12 cde");
        assert_eq!(record.created_at, t0());
        assert_eq!(record.media.len(), 1);
        assert_eq!(record.attributes.brand.as_deref(), Some("FORD"));
        assert_eq!(store.persistence().inner.saved().len(), 1);
    }

    #[test]
    fn equal_normalized_plates_merge_newest_media_first() {
        let mut store = store();
        let t1 = t0() + Duration::days(3);
        let first = store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        let second = store.save_at("ab12cde", image(2, t1), attrs("FORD MOTOR"), t1);

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        let record = store.get(first).unwrap();
        assert_eq!(record.media[0], image(2, t1));
        assert_eq!(record.media[1], image(1, t0()));
        assert_eq!(record.attributes.brand.as_deref(), Some("FORD MOTOR"));
        assert_eq!(record.plate, "AB12 CDE", "merge must not overwrite plate text");
        assert_eq!(record.created_at, t0(), "creation date is set once");
    }

    #[test]
    fn different_normalized_plates_create_distinct_records() {
        let mut store = store();
        let a = store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        let b = store.save_at("AB12 CDF", image(2, t0()), attrs("FORD"), t0());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn persistence_failure_keeps_in_memory_state_and_retries_later() {
        let mut store = store();
        store.persistence().fail.store(true, Ordering::SeqCst);
        let id = store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        assert!(store.get(id).is_some());
        assert!(store.persistence().inner.saved().is_empty());

        store.persistence().fail.store(false, Ordering::SeqCst);
        store.save_at("XY99 ZZZ", image(2, t0()), attrs("BMW"), t0());
        assert_eq!(store.persistence().inner.saved().len(), 2);
    }

    #[test]
    fn load_failure_starts_empty() {
        let persistence = FlakyPersistence::default();
        persistence.fail.store(true, Ordering::SeqCst);
        let store = VehicleRecordStore::open(persistence);
        assert!(store.is_empty());
    }

    // -- update_attributes_and_plate --

    #[test]
    fn update_replaces_plate_and_attributes_but_not_media() {
        let mut store = store();
        let id = store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        store
            .update_attributes_and_plate(id, "AB12 CDF", attrs("VAUXHALL"))
            .unwrap();

        let record = store.get(id).unwrap();
        assert_eq!(record.plate, "AB12 CDF");
        assert_eq!(record.attributes, attrs("VAUXHALL"));
        assert_eq!(record.media, vec![image(1, t0())]);
        assert!(store.find_by_plate("ab12cdf").is_some());
        assert!(store.find_by_plate("ab12cde").is_none());
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = store();
        let writes_before = store.persistence().writes.load(Ordering::SeqCst);
        let result = store.update_attributes_and_plate(RecordId::new_v4(), "AB12", attrs("X"));
        assert_matches!(result, Err(CoreError::NotFound { entity: "vehicle", .. }));
        assert_eq!(store.persistence().writes.load(Ordering::SeqCst), writes_before);
    }

    #[test]
    fn update_to_another_records_plate_conflicts() {
        let mut store = store();
        let a = store.save_at("AAA 111", image(1, t0()), attrs("A"), t0());
        store.save_at("BBB 222", image(2, t0()), attrs("B"), t0());

        let result = store.update_attributes_and_plate(a, "bbb222", attrs("A"));
        assert_matches!(result, Err(CoreError::Conflict(_)));
        assert_eq!(store.get(a).unwrap().plate, "AAA 111");
    }

    #[test]
    fn update_may_reformat_own_plate() {
        let mut store = store();
        let a = store.save_at("AAA111", image(1, t0()), attrs("A"), t0());
        store
            .update_attributes_and_plate(a, "AAA 111", attrs("A"))
            .unwrap();
        assert_eq!(store.get(a).unwrap().plate, "AAA 111");
    }

    #[test]
    fn update_rejects_blank_plate() {
        let mut store = store();
        let a = store.save_at("AAA111", image(1, t0()), attrs("A"), t0());
        assert_matches!(
            store.update_attributes_and_plate(a, "  ", attrs("A")),
            Err(CoreError::Validation(_))
        );
    }

    // -- delete --

    #[test]
    fn delete_removes_record() {
        let mut store = store();
        let id = store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        assert!(store.delete(id));
        assert!(store.is_empty());
        assert!(store.persistence().inner.saved().is_empty());
    }

    #[test]
    fn delete_unknown_id_leaves_snapshot_unchanged() {
        let mut store = store();
        store.save_at("AB12 CDE", image(1, t0()), attrs("FORD"), t0());
        let before = store.snapshot().to_vec();
        let writes_before = store.persistence().writes.load(Ordering::SeqCst);

        assert!(!store.delete(RecordId::new_v4()));
        assert_eq!(store.snapshot(), before.as_slice());
        assert_eq!(store.persistence().writes.load(Ordering::SeqCst), writes_before);
    }

    // -- remove_media --

    #[test]
    fn remove_media_prunes_one_item() {
        let mut store = store();
        let id = store.save_at("AB12", image(1, t0()), attrs("A"), t0());
        store.save_at("AB12", image(2, t0()), attrs("A"), t0());

        let removed = store.remove_media(id, 0).unwrap();
        assert_eq!(removed, image(2, t0()));
        assert_eq!(store.get(id).unwrap().media, vec![image(1, t0())]);
    }

    #[test]
    fn remove_media_refuses_last_item_and_bad_index() {
        let mut store = store();
        let id = store.save_at("AB12", image(1, t0()), attrs("A"), t0());
        assert_matches!(store.remove_media(id, 0), Err(CoreError::Validation(_)));
        assert_matches!(store.remove_media(id, 5), Err(CoreError::Validation(_)));
        assert_matches!(
            store.remove_media(RecordId::new_v4(), 0),
            Err(CoreError::NotFound { .. })
        );
    }

    // -- subscriptions --

    #[test]
    fn subscribers_see_every_change_until_unsubscribed() {
        let mut store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        let id = store.save_at("AB12", image(1, t0()), attrs("A"), t0());
        store.save_at("ab 12", image(2, t0()), attrs("A"), t0());
        store.update_attributes_and_plate(id, "AB13", attrs("B")).unwrap();
        assert!(store.unsubscribe(sub));
        store.delete(id);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StoreChange::Created(id),
                StoreChange::Merged(id),
                StoreChange::Updated(id),
            ]
        );
        assert!(!store.unsubscribe(sub));
    }

    // -- load --

    #[test]
    fn open_merges_duplicate_plates_from_old_snapshots() {
        let t1 = t0() + Duration::days(1);
        let older = VehicleRecord {
            id: RecordId::new_v4(),
            created_at: t0(),
            plate: "AB12 CDE".into(),
            media: vec![image(1, t0())],
            attributes: attrs("FORD"),
        };
        let dup = VehicleRecord {
            id: RecordId::new_v4(),
            created_at: t1,
            plate: "AB12CDE".into(),
            media: vec![image(2, t1)],
            attributes: attrs("OTHER"),
        };
        let store = VehicleRecordStore::open(InMemoryPersistence::new(vec![older.clone(), dup]));

        assert_eq!(store.len(), 1);
        let record = &store.snapshot()[0];
        assert_eq!(record.id, older.id);
        assert_eq!(record.media, vec![image(2, t1), image(1, t0())]);
        assert_eq!(record.attributes, attrs("FORD"));
    }

    #[test]
    fn with_records_keeps_one_record_per_plate() {
        let first = VehicleRecord {
            id: RecordId::new_v4(),
            created_at: t0(),
            plate: "XY99 ZZZ".into(),
            media: vec![image(1, t0())],
            attributes: attrs("FORD"),
        };
        let second = VehicleRecord {
            id: RecordId::new_v4(),
            plate: "xy99zzz".into(),
            media: vec![image(2, t0())],
            ..first.clone()
        };
        let mut store =
            VehicleRecordStore::with_records(vec![first.clone(), second], InMemoryPersistence::default());
        assert_eq!(store.len(), 1);

        let id = store.save_at("XY99ZZZ", image(3, t0()), attrs("FORD"), t0());
        assert_eq!(id, first.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().media.len(), 3);
    }

    #[test]
    fn failed_load_is_recorded() {
        let persistence = FlakyPersistence::default();
        persistence.fail.store(true, Ordering::SeqCst);
        let store = VehicleRecordStore::open(persistence);
        assert!(store.is_empty());
        assert_matches!(store.load_error(), Some(CoreError::Persistence(_)));

        let healthy = VehicleRecordStore::open(InMemoryPersistence::default());
        assert!(healthy.load_error().is_none());
    }
}
