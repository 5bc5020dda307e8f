//! Domain models for the image library
//!
//! [`ImageCode`] is the key shared by the crawler, the local image folder and
//! the document store. [`ImageRecord`] is the stored document.

use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every canonical code
pub const CODE_PREFIX: char = 's';

/// Extension of stored image files
pub const IMAGE_EXTENSION: &str = "jpg";

// =============================================================================
// Image code
// =============================================================================

/// Identifier of a remote image: `"s"` followed by a non-negative number.
///
/// The number and the string form are always derivable from each other.
/// Parsing only accepts the canonical string, so `s007` is rejected: it would
/// otherwise name the same number as `s7` under a different key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageCode(u64);

impl ImageCode {
    /// Largest number the store can hold (`INTEGER` is a signed 64-bit column)
    pub const MAX_NUMBER: u64 = i64::MAX as u64;

    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }

    /// Canonical string form, e.g. `s88248`
    pub fn code(&self) -> String {
        format!("{}{}", CODE_PREFIX, self.0)
    }

    /// Name of the local file holding this image, e.g. `s88248.jpg`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.code(), IMAGE_EXTENSION)
    }

    /// Parse a canonical code string.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidInput`] if the string lacks the `s`
    /// prefix, contains anything but ASCII digits after it, has redundant
    /// leading zeros, or is above [`ImageCode::MAX_NUMBER`].
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |message: &str| LibraryError::InvalidInput {
            field: "code".to_string(),
            message: format!("'{}' {}", raw, message),
        };

        let digits = raw
            .strip_prefix(CODE_PREFIX)
            .ok_or_else(|| invalid("must start with 's'"))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("must be 's' followed by decimal digits"));
        }

        if digits.len() > 1 && digits.starts_with('0') {
            return Err(invalid("has redundant leading zeros"));
        }

        match digits.parse::<u64>() {
            Ok(number) if number <= Self::MAX_NUMBER => Ok(Self(number)),
            _ => Err(invalid("is out of range")),
        }
    }
}

impl From<u64> for ImageCode {
    fn from(number: u64) -> Self {
        Self::new(number)
    }
}

impl FromStr for ImageCode {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageCode {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageCode> for String {
    fn from(code: ImageCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ImageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CODE_PREFIX, self.0)
    }
}

// =============================================================================
// Image record
// =============================================================================

/// Metadata document stored for every synchronized image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ImageRecord {
    /// Canonical code, unique across the store
    pub code: String,
    /// Numeric part of the code
    pub number: i64,
    /// Public URL the image is served from
    pub url: String,
    /// Folder segment the image was published under
    pub folder: String,
    /// Unix milliseconds; set once on insert
    pub created_at: i64,
    /// Unix milliseconds of the last upsert
    pub updated_at: i64,
}
