//! # Metadata Sync Module
//!
//! Publishes metadata about locally stored images to the document store.
//!
//! ## Overview
//!
//! A sync run is strictly sequential:
//! - The [`inventory`] reader lists `<code>.jpg` files in a folder
//! - The [`synchronizer`] computes each image's public URL, looks up the
//!   stored record and emits an upsert only where the URL changed
//! - All upserts go to the store as one bulk write
//!
//! Re-running with nothing changed produces no writes at all.

pub mod error;
pub mod inventory;
pub mod synchronizer;

pub use error::{Result, SyncError};
pub use inventory::{Inventory, InventoryReader, LocalImage};
pub use synchronizer::{MetadataSynchronizer, SyncDecision, SyncReport, SyncTarget};
