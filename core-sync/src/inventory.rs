//! Local image inventory

use crate::error::{Result, SyncError};
use bridge_traits::storage::FileSystemAccess;
use core_library::models::IMAGE_EXTENSION;
use core_library::ImageCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// An image file found in the inventory folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub code: ImageCode,
    pub path: PathBuf,
}

/// Result of listing one folder
#[derive(Debug, Default)]
pub struct Inventory {
    /// Valid images, sorted by number
    pub images: Vec<LocalImage>,
    /// `.jpg` entries whose name is not a canonical code
    pub malformed: Vec<SyncError>,
}

impl Inventory {
    pub fn codes(&self) -> impl Iterator<Item = ImageCode> + '_ {
        self.images.iter().map(|image| image.code)
    }

    pub fn skipped(&self) -> usize {
        self.malformed.len()
    }
}

/// Classify a directory entry name.
///
/// Returns `None` for names that are not `.jpg` files, and
/// `Some(Err(MalformedFilename))` for `.jpg` names whose stem is not a
/// canonical code.
pub fn parse_file_name(name: &str) -> Option<Result<ImageCode>> {
    let stem = name.strip_suffix(IMAGE_EXTENSION)?.strip_suffix('.')?;

    Some(ImageCode::parse(stem).map_err(|_| SyncError::MalformedFilename {
        name: name.to_string(),
    }))
}

/// Reads the `<code>.jpg` files of a folder.
pub struct InventoryReader {
    file_system: Arc<dyn FileSystemAccess>,
}

impl InventoryReader {
    pub fn new(file_system: Arc<dyn FileSystemAccess>) -> Self {
        Self { file_system }
    }

    /// # Errors
    ///
    /// Fails with [`SyncError::Bridge`] if the folder is missing or cannot be
    /// listed. Malformed names are collected in [`Inventory::malformed`].
    #[instrument(skip_all, fields(folder = %folder.display()))]
    pub async fn read(&self, folder: &Path) -> Result<Inventory> {
        let entries = self.file_system.list_directory(folder).await?;
        let mut inventory = Inventory::default();

        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(parsed) = parse_file_name(name) else {
                continue;
            };

            match self.file_system.metadata(&path).await {
                Ok(meta) if meta.is_directory => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!(entry = %name, error = %e, "Cannot stat entry, skipping");
                    continue;
                }
            }

            match parsed {
                Ok(code) => inventory.images.push(LocalImage { code, path }),
                Err(e) => {
                    warn!(entry = %name, "Skipping file with malformed name");
                    inventory.malformed.push(e);
                }
            }
        }

        inventory.images.sort_by_key(|image| image.code);

        info!(
            images = inventory.images.len(),
            skipped = inventory.skipped(),
            "Read local inventory"
        );

        Ok(inventory)
    }
}
