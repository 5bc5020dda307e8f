//! Code range enumeration

use crate::error::{CrawlError, Result};
use chrono::NaiveDate;
use core_library::ImageCode;
use std::iter::Map;
use std::ops::RangeInclusive;

/// Lazy iterator over the codes of a [`CodeRange`], in ascending order
pub type Codes = Map<RangeInclusive<u64>, fn(u64) -> ImageCode>;

/// Inclusive range of image numbers to crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    start: u64,
    end: u64,
}

impl CodeRange {
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidRange`] if `start > end`, and
    /// [`CrawlError::CodeOutOfRange`] if `end` is above
    /// [`ImageCode::MAX_NUMBER`].
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(CrawlError::InvalidRange { start, end });
        }
        if end > ImageCode::MAX_NUMBER {
            return Err(CrawlError::CodeOutOfRange {
                number: end,
                max: ImageCode::MAX_NUMBER,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// A fresh sequence over every code in the range. Each call starts over.
    pub fn iter(&self) -> Codes {
        (self.start..=self.end).map(ImageCode::new as fn(u64) -> ImageCode)
    }

    /// Number of codes in the range, `end - start + 1`. Never zero, and exact
    /// because `end` is capped at [`ImageCode::MAX_NUMBER`].
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Folder name for a crawl run on `date`: `images_<YYYYMMDD>_<start>_to_<end>`
    pub fn output_dir_name(&self, date: NaiveDate) -> String {
        format!(
            "images_{}_{}_to_{}",
            date.format("%Y%m%d"),
            self.start,
            self.end
        )
    }
}

impl IntoIterator for &CodeRange {
    type Item = ImageCode;
    type IntoIter = Codes;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
