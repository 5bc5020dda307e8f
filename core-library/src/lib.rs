//! # Image Library Module
//!
//! Owns the image metadata store and the types shared by the crawl and sync
//! phases.
//!
//! ## Overview
//!
//! This module manages:
//! - The `ImageCode` key type and the `ImageRecord` document
//! - SQLite connection pooling and embedded migrations
//! - The `DocumentStore` repository used by the synchronizer

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{ImageCode, ImageRecord};
pub use repositories::{BulkWriteResult, DocumentStore, SqliteImageStore, UpsertOperation};
