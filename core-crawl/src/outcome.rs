//! Per-code fetch outcomes and the run report

use crate::validator::RejectReason;
use core_library::ImageCode;
use std::path::{Path, PathBuf};

/// Result of one fetch attempt. Produced once per code and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Image validated and written to `path`; `bytes` is its size
    Success {
        code: ImageCode,
        bytes: usize,
        path: PathBuf,
    },
    /// Response arrived but is not a usable image
    RejectedContent {
        code: ImageCode,
        reason: RejectReason,
    },
    /// Transport error or non-success HTTP status
    NetworkFailure { code: ImageCode, cause: String },
    /// Image was valid but could not be written locally
    StorageFailure { code: ImageCode, cause: String },
}

impl FetchOutcome {
    pub fn code(&self) -> ImageCode {
        match self {
            FetchOutcome::Success { code, .. }
            | FetchOutcome::RejectedContent { code, .. }
            | FetchOutcome::NetworkFailure { code, .. }
            | FetchOutcome::StorageFailure { code, .. } => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, FetchOutcome::RejectedContent { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FetchOutcome::NetworkFailure { .. } | FetchOutcome::StorageFailure { .. }
        )
    }
}

/// Summary of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    output_dir: PathBuf,
    outcomes: Vec<FetchOutcome>,
}

impl CrawlReport {
    pub fn new(output_dir: impl Into<PathBuf>, outcomes: Vec<FetchOutcome>) -> Self {
        Self {
            output_dir: output_dir.into(),
            outcomes,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Outcomes in completion order
    pub fn outcomes(&self) -> &[FetchOutcome] {
        &self.outcomes
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_rejected()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn outcome_for(&self, code: ImageCode) -> Option<&FetchOutcome> {
        self.outcomes.iter().find(|o| o.code() == code)
    }

    pub fn summary(&self) -> String {
        format!(
            "Downloaded {} images out of {} attempts",
            self.succeeded(),
            self.attempted()
        )
    }
}
