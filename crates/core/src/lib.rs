//! Domain logic for the vehicle spotting collection.
//!
//! Holds the record store with merge-by-plate semantics, the scraped-text
//! metric parsers, and the read-side statistics built on them. The crate
//! performs no I/O of its own; persistence is reached through
//! [`store::SnapshotPersistence`].

pub mod error;
pub mod history;
pub mod metrics;
pub mod plate;
pub mod rarity;
pub mod registration;
pub mod share_card;
pub mod statistics;
pub mod store;
pub mod types;
pub mod vehicle;
