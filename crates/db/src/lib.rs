//! File-backed persistence for the spotted-vehicles collection.
//!
//! [`SettingsStore`] is a small key/value store (one JSON file per key)
//! standing in for a platform settings store. [`VehicleSnapshotStore`]
//! keeps the full vehicle snapshot under a single key and implements the
//! core's [`SnapshotPersistence`](spotted_core::store::SnapshotPersistence).

pub mod error;
pub mod settings;
pub mod vehicles;

pub use error::DbError;
pub use settings::SettingsStore;
pub use vehicles::{VehicleSnapshotStore, CORRUPT_BACKUP_PREFIX, SAVED_VEHICLES_KEY};
