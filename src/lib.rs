//! Workspace placeholder crate.
//!
//! This crate exists to expose feature flags that map to the individual
//! workspace crates (`core-crawl`, `core-sync`). Host applications can depend
//! on `crawler-workspace` and enable the documented features without wiring
//! each crate individually.

#[cfg(feature = "crawl")]
pub use core_crawl as crawl;

#[cfg(feature = "sync")]
pub use core_sync as sync;
