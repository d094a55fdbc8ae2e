//! Vehicle snapshot persistence on top of [`SettingsStore`].

use chrono::Utc;
use spotted_core::error::CoreError;
use spotted_core::store::SnapshotPersistence;
use spotted_core::vehicle::VehicleRecord;

use crate::error::DbError;
use crate::settings::SettingsStore;

/// Settings key holding the JSON array of saved vehicles.
pub const SAVED_VEHICLES_KEY: &str = "SavedVehicles";

/// Prefix of the keys an undecodable snapshot is copied to, followed by a
/// UTC timestamp.
pub const CORRUPT_BACKUP_PREFIX: &str = "SavedVehicles-corrupt-";

#[derive(Debug, Clone)]
pub struct VehicleSnapshotStore {
    settings: SettingsStore,
}

impl VehicleSnapshotStore {
    pub fn new(settings: SettingsStore) -> Self {
        Self { settings }
    }

    fn load(&self) -> Result<Vec<VehicleRecord>, DbError> {
        let Some(bytes) = self.settings.read(SAVED_VEHICLES_KEY)? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            self.back_up_corrupt(&bytes);
            DbError::from(e)
        })
    }

    /// Copy an unreadable snapshot aside so the next save cannot destroy it.
    fn back_up_corrupt(&self, bytes: &[u8]) {
        let key = format!("{CORRUPT_BACKUP_PREFIX}{}", Utc::now().format("%Y%m%dT%H%M%S%3fZ"));
        match self.settings.write(&key, bytes) {
            Ok(()) => tracing::warn!(backup = %key, "Saved vehicles unreadable, original kept aside"),
            Err(e) => tracing::error!(error = %e, "Failed to back up unreadable saved vehicles"),
        }
    }

    fn save(&self, records: &[VehicleRecord]) -> Result<(), DbError> {
        let bytes = serde_json::to_vec(records)?;
        self.settings.write(SAVED_VEHICLES_KEY, &bytes)
    }
}

impl SnapshotPersistence for VehicleSnapshotStore {
    fn load_all(&self) -> Result<Vec<VehicleRecord>, CoreError> {
        Ok(self.load()?)
    }

    fn save_all(&self, records: &[VehicleRecord]) -> Result<(), CoreError> {
        self.save(records)?;
        tracing::info!(count = records.len(), "Saved vehicles count");
        Ok(())
    }
}
