//! Storage and File System Abstractions
//!
//! Provides a platform-agnostic trait for the file I/O the crawler needs:
//! creating the output folder, writing image files and listing a folder
//! during synchronization.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// What the inventory reader needs to know about a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub is_directory: bool,
}

/// File system access trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn save(fs: &dyn FileSystemAccess, dir: &Path, data: Bytes) -> Result<()> {
///     fs.create_dir_all(dir).await?;
///     fs.write_file(&dir.join("s1.jpg"), data).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write data to a file, creating it or replacing its contents
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// List the entries of a directory, in no particular order.
    ///
    /// A missing directory is an error, not an empty listing.
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}
