//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations.
//!
//! ## Available Repositories
//!
//! - `DocumentStore` - Image metadata records keyed by code, with ordered bulk
//!   upserts

pub mod image;

pub use image::{BulkWriteResult, DocumentStore, SqliteImageStore, UpsertOperation};
