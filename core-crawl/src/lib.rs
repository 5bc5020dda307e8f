//! # Crawl Module
//!
//! Fetches one image per code over a contiguous code range, rejects error
//! pages served in place of images and stores the rest in a dated output
//! folder.
//!
//! ## Overview
//!
//! - [`range`] turns `start..=end` into a restartable sequence of codes
//! - [`validator`] decides whether a response body is a real image
//! - [`pool`] runs a fixed number of fetch workers over the sequence
//! - [`outcome`] holds the per-code results and the run summary
//!
//! ## Usage
//!
//! ```ignore
//! use core_crawl::{CodeRange, FetchWorkerPool};
//!
//! let range = CodeRange::new(100, 102)?;
//! let pool = FetchWorkerPool::new(settings, http_client, file_system)?;
//! let report = pool.run(&range, &output_dir).await?;
//! println!("{}", report.summary());
//! ```

pub mod error;
pub mod outcome;
pub mod pool;
pub mod range;
pub mod validator;

pub use error::{CrawlError, Result};
pub use outcome::{CrawlReport, FetchOutcome};
pub use pool::FetchWorkerPool;
pub use range::CodeRange;
pub use validator::{ContentValidator, RejectReason, Validation};
