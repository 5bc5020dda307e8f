//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the crawler workspace:
//! - Logging and tracing infrastructure
//! - Configuration loading and validation
//!
//! ## Overview
//!
//! The binary builds its settings exactly once at startup through this
//! crate and hands the resulting immutable structs down to the core crates.
//! Nothing below this layer reads the process environment.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
