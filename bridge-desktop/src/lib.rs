//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(30))?;
//!     let fs = TokioFileSystem::new();
//!
//!     // Hand both to the fetch worker pool
//! }
//! ```

mod filesystem;
mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
