//! # Metadata Synchronizer
//!
//! Diffs the local inventory against stored records and submits the minimal
//! set of upserts.
//!
//! ## Overview
//!
//! Every local image gets a target URL:
//!
//! ```text
//! https://<raw_host>/<owner>/<repo>/<branch>/<folder>/<code>.jpg
//! ```
//!
//! A code needs an upsert if it has no stored record, or if the stored `url`
//! differs from the target. Only the URL is compared; image content is not.
//!
//! ```text
//! Absent ──sync──> Stored(U1) ──url change──> Stored(U2)
//!                      │
//!                      └──same url──> Stored(U1)   (no write)
//! ```
//!
//! Lookups run one after another and any lookup failure aborts the run before
//! anything is written. All upserts are then submitted in one bulk write.

use crate::error::{Result, SyncError};
use crate::inventory::Inventory;
use bridge_traits::time::Clock;
use core_library::{DocumentStore, ImageCode, ImageRecord, LibraryError, UpsertOperation};
use core_runtime::config::SyncSettings;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where synchronized images are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub raw_host: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    /// Folder segment of the URL, without leading or trailing slashes
    pub folder: String,
}

impl SyncTarget {
    /// Build a target from settings plus the folder argument.
    ///
    /// The folder is used as given apart from separator cleanup: backslashes
    /// become `/`, and leading `./` plus trailing `/` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidTarget`] if nothing is left of the folder.
    pub fn from_settings(settings: &SyncSettings, folder: &str) -> Result<Self> {
        let folder = normalize_folder(folder);
        if folder.is_empty() {
            return Err(SyncError::InvalidTarget(
                "folder must name at least one path segment".to_string(),
            ));
        }

        Ok(Self {
            raw_host: settings.raw_host.clone(),
            repo_owner: settings.repo_owner.clone(),
            repo_name: settings.repo_name.clone(),
            branch: settings.branch.clone(),
            folder,
        })
    }

    pub fn base_url(&self) -> String {
        format!(
            "https://{}/{}/{}/{}",
            self.raw_host, self.repo_owner, self.repo_name, self.branch
        )
    }

    pub fn url_for(&self, code: ImageCode) -> String {
        format!("{}/{}/{}", self.base_url(), self.folder, code.file_name())
    }
}

fn normalize_folder(raw: &str) -> String {
    let mut folder = raw.trim().replace('\\', "/");
    while let Some(rest) = folder.strip_prefix("./") {
        folder = rest.to_string();
    }
    folder.trim_end_matches('/').to_string()
}

/// What a single local image needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    Unchanged,
    Insert,
    Update,
}

impl SyncDecision {
    /// Compare a stored record, if any, against the URL the image should have.
    pub fn decide(existing: Option<&ImageRecord>, target_url: &str) -> Self {
        match existing {
            None => SyncDecision::Insert,
            Some(record) if record.url != target_url => SyncDecision::Update,
            Some(_) => SyncDecision::Unchanged,
        }
    }
}

/// Counts for one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Valid images found locally
    pub scanned: usize,
    /// `.jpg` files skipped for malformed names
    pub skipped: usize,
    pub unchanged: usize,
    /// Upserts submitted in the bulk write
    pub operations: usize,
    pub inserted: u64,
    pub modified: u64,
    pub skipped_files: Vec<String>,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} images: {} inserted, {} modified, {} unchanged, {} skipped",
            self.scanned, self.inserted, self.modified, self.unchanged, self.skipped
        )
    }
}

/// Synchronizes local image metadata into a [`DocumentStore`].
pub struct MetadataSynchronizer {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl MetadataSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Look up every code and build the upserts it needs.
    ///
    /// Returns the operations plus the number of unchanged codes. One
    /// timestamp is taken for the whole batch.
    ///
    /// # Errors
    ///
    /// Any failed lookup is a [`SyncError::DocumentStoreConnection`].
    pub async fn plan(
        &self,
        codes: impl IntoIterator<Item = ImageCode>,
        target: &SyncTarget,
    ) -> Result<(Vec<UpsertOperation>, usize)> {
        let now = self.clock.unix_timestamp_millis();
        let mut operations = Vec::new();
        let mut unchanged = 0;

        for code in codes {
            let target_url = target.url_for(code);
            let existing = self
                .store
                .find_by_code(&code.code())
                .await
                .map_err(|e| {
                    warn!(code = %code, error = %e, "Lookup failed, aborting sync");
                    SyncError::DocumentStoreConnection(e.to_string())
                })?;

            match SyncDecision::decide(existing.as_ref(), &target_url) {
                SyncDecision::Unchanged => {
                    unchanged += 1;
                }
                SyncDecision::Insert => {
                    debug!(code = %code, "New record");
                    operations.push(UpsertOperation::insert(
                        code,
                        target_url,
                        target.folder.clone(),
                        now,
                    ));
                }
                SyncDecision::Update => {
                    debug!(code = %code, "Stored url is stale");
                    operations.push(UpsertOperation::update(
                        code,
                        target_url,
                        target.folder.clone(),
                        now,
                    ));
                }
            }
        }

        Ok((operations, unchanged))
    }

    /// Run a full sync of `inventory` against `target`.
    ///
    /// No bulk write is issued when every code is unchanged.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DocumentStoreConnection`] if a lookup fails (nothing is
    ///   written)
    /// - [`SyncError::BulkWrite`] if the bulk write fails part-way, with the
    ///   counts that were applied
    #[instrument(
        skip_all,
        fields(
            owner = %target.repo_owner,
            repo = %target.repo_name,
            branch = %target.branch,
            folder = %target.folder
        )
    )]
    pub async fn sync(&self, inventory: &Inventory, target: &SyncTarget) -> Result<SyncReport> {
        let (operations, unchanged) = self.plan(inventory.codes(), target).await?;

        let mut report = SyncReport {
            scanned: inventory.images.len(),
            skipped: inventory.skipped(),
            unchanged,
            operations: operations.len(),
            skipped_files: inventory
                .malformed
                .iter()
                .map(|e| match e {
                    SyncError::MalformedFilename { name } => name.clone(),
                    other => other.to_string(),
                })
                .collect(),
            ..SyncReport::default()
        };

        if operations.is_empty() {
            info!(unchanged, "Nothing to write");
            return Ok(report);
        }

        let result = self
            .store
            .bulk_upsert(&operations)
            .await
            .map_err(|e| match e {
                LibraryError::BulkWrite {
                    inserted,
                    modified,
                    message,
                } => SyncError::BulkWrite {
                    inserted,
                    modified,
                    message,
                },
                other => SyncError::Store(other),
            })?;

        report.inserted = result.inserted;
        report.modified = result.modified;

        info!(
            operations = report.operations,
            inserted = report.inserted,
            modified = report.modified,
            unchanged = report.unchanged,
            "Sync finished"
        );

        Ok(report)
    }
}
