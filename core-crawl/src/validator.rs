//! Content validation for downloaded payloads
//!
//! The remote site answers unknown codes with `200 OK` and an HTML error page,
//! so a successful status says nothing about the body. Two checks run in
//! order and the first failure decides the reason:
//!
//! 1. the bytes must fully decode as an image, format guessed from content
//! 2. the body, read as lossy UTF-8, must not contain the sentinel text

use core_runtime::config::DEFAULT_SENTINEL_TEXT;
use std::borrow::Cow;
use std::fmt;
use tracing::trace;

/// Why a payload was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    NotAnImage,
    SentinelErrorText,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotAnImage => "not_an_image",
            RejectReason::SentinelErrorText => "sentinel_error_text",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(RejectReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Decides whether a response body is a genuine image.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    sentinel: String,
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL_TEXT)
    }
}

impl ContentValidator {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Validate raw bytes together with the text view of the same response.
    pub fn validate(&self, bytes: &[u8], text: &str) -> Validation {
        if let Err(e) = image::load_from_memory(bytes) {
            trace!(error = %e, size = bytes.len(), "Payload does not decode as an image");
            return Validation::Invalid(RejectReason::NotAnImage);
        }

        if text.contains(self.sentinel.as_str()) {
            return Validation::Invalid(RejectReason::SentinelErrorText);
        }

        Validation::Valid
    }

    /// Validate a body, deriving its text view with lossy UTF-8 decoding.
    pub fn validate_body(&self, body: &[u8]) -> Validation {
        let text: Cow<'_, str> = String::from_utf8_lossy(body);
        self.validate(body, &text)
    }
}
