//! # Host Bridge Traits
//!
//! Capability traits the crawler and synchronizer depend on, implemented per
//! host by a bridge crate.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and
//! platform-specific implementations. Core logic only ever talks to these
//! traits, which keeps the fetch pipeline and the synchronizer testable with
//! in-memory doubles.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests with per-request timeouts
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Directory listing and file writes
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should:
//!
//! - Convert library-specific errors to `BridgeError`
//! - Report timeouts as [`BridgeError::Timeout`] so callers can tell them apart
//! - Include error context (e.g., file paths, URLs)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared by every fetch worker.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, LogLevel, SystemClock};
