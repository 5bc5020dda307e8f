//! # Configuration Module
//!
//! Provides configuration management for the crawler and the metadata
//! synchronizer.
//!
//! ## Overview
//!
//! Each command gets one immutable settings struct, built once at process
//! start. Settings can come from two places:
//!
//! - [`CrawlSettings::from_env`] / [`SyncSettings::from_env`] read the
//!   documented environment variables (see [`env_keys`]).
//! - [`CrawlSettings::builder`] / [`SyncSettings::builder`] construct them
//!   programmatically, mainly for tests.
//!
//! Both paths end in the same `validate()` call, so an invalid value fails the
//! same way regardless of where it came from.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SyncSettings;
//!
//! let settings = SyncSettings::from_env()?;
//! println!("syncing into {}/{}", settings.repo_owner, settings.repo_name);
//! ```
//!
//! ## Error Handling
//!
//! Every missing required variable is reported together:
//!
//! ```
//! use core_runtime::config::SyncSettings;
//! use core_runtime::Error;
//!
//! let err = SyncSettings::from_lookup(|_| None).unwrap_err();
//! assert!(matches!(err, Error::MissingConfig { .. }));
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use std::time::Duration;

/// Default remote endpoint; `{code}` is replaced with the image code.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://fgo.vn/tai-anh-ve/?id={code}";

/// Marker the remote site embeds in the HTML page it serves for unknown codes.
pub const DEFAULT_SENTINEL_TEXT: &str = "Mã hình ảnh không đúng!";

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_RAW_HOST: &str = "raw.githubusercontent.com";

/// Placeholder substituted by the image code in endpoint templates
pub const CODE_PLACEHOLDER: &str = "{code}";

const MAX_CONCURRENCY: usize = 256;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Environment variable names read by the `from_env` constructors
pub mod env_keys {
    pub const CRAWL_ENDPOINT: &str = "CRAWL_ENDPOINT";
    pub const CRAWL_CONCURRENCY: &str = "CRAWL_CONCURRENCY";
    pub const CRAWL_TIMEOUT_SECS: &str = "CRAWL_TIMEOUT_SECS";
    pub const CRAWL_SENTINEL: &str = "CRAWL_SENTINEL";

    pub const IMAGE_DB_URL: &str = "IMAGE_DB_URL";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const REPO_OWNER: &str = "REPO_OWNER";
    pub const REPO_NAME: &str = "REPO_NAME";
    pub const REPO_BRANCH: &str = "REPO_BRANCH";
    pub const RAW_CONTENT_HOST: &str = "RAW_CONTENT_HOST";

    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Reads a variable through `lookup`, treating blank values as absent.
pub(crate) fn lookup_non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(Error::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// Crawl settings
// ============================================================================

/// Settings for the fetch phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// URL template containing a `{code}` placeholder
    pub endpoint_template: String,

    /// Number of fetch workers (and therefore in-flight requests)
    pub concurrency: usize,

    /// Upper bound for a single request, body included
    pub request_timeout: Duration,

    /// Text whose presence marks a response as the site's error page
    pub sentinel_text: String,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sentinel_text: DEFAULT_SENTINEL_TEXT.to_string(),
        }
    }
}

impl CrawlSettings {
    pub fn builder() -> CrawlSettingsBuilder {
        CrawlSettingsBuilder::default()
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Load through an arbitrary variable lookup. Every crawl setting has a
    /// default, so this only fails on malformed values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(template) = lookup_non_empty(&lookup, env_keys::CRAWL_ENDPOINT) {
            builder = builder.endpoint_template(template);
        }
        if let Some(raw) = lookup_non_empty(&lookup, env_keys::CRAWL_CONCURRENCY) {
            builder = builder.concurrency(parse_positive(env_keys::CRAWL_CONCURRENCY, &raw)?);
        }
        if let Some(raw) = lookup_non_empty(&lookup, env_keys::CRAWL_TIMEOUT_SECS) {
            let secs: u64 = parse_positive(env_keys::CRAWL_TIMEOUT_SECS, &raw)?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(sentinel) = lookup_non_empty(&lookup, env_keys::CRAWL_SENTINEL) {
            builder = builder.sentinel_text(sentinel);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The endpoint template contains `{code}` and is an http(s) URL
    /// - Concurrency is in `1..=256`
    /// - The request timeout is non-zero and at most ten minutes
    /// - The sentinel text is not empty
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint_template.contains(CODE_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "Endpoint template must contain {}: {}",
                CODE_PLACEHOLDER, self.endpoint_template
            )));
        }

        if !(self.endpoint_template.starts_with("http://")
            || self.endpoint_template.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "Endpoint template must be an http(s) URL: {}",
                self.endpoint_template
            )));
        }

        if self.concurrency == 0 {
            return Err(Error::Config(
                "Concurrency must be at least 1".to_string(),
            ));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(Error::Config(format!(
                "Concurrency exceeds maximum of {}",
                MAX_CONCURRENCY
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout > Duration::from_secs(MAX_REQUEST_TIMEOUT_SECS) {
            return Err(Error::Config(format!(
                "Request timeout exceeds maximum of {} seconds",
                MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        if self.sentinel_text.is_empty() {
            return Err(Error::Config(
                "Sentinel text cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Substitute a code into the endpoint template
    pub fn endpoint_for(&self, code: &str) -> String {
        self.endpoint_template.replace(CODE_PLACEHOLDER, code)
    }
}

/// Builder for [`CrawlSettings`]; unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct CrawlSettingsBuilder {
    endpoint_template: Option<String>,
    concurrency: Option<usize>,
    request_timeout: Option<Duration>,
    sentinel_text: Option<String>,
}

impl CrawlSettingsBuilder {
    pub fn endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = Some(template.into());
        self
    }

    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = Some(workers);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn sentinel_text(mut self, text: impl Into<String>) -> Self {
        self.sentinel_text = Some(text.into());
        self
    }

    pub fn build(self) -> Result<CrawlSettings> {
        let defaults = CrawlSettings::default();
        let settings = CrawlSettings {
            endpoint_template: self
                .endpoint_template
                .unwrap_or(defaults.endpoint_template),
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            sentinel_text: self.sentinel_text.unwrap_or(defaults.sentinel_text),
        };

        settings.validate()?;
        Ok(settings)
    }
}

// ============================================================================
// Sync settings
// ============================================================================

/// Settings for the metadata synchronization phase.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Document store connection string (may carry credentials)
    pub connection_string: String,

    /// Owner of the repository the images are published from
    pub repo_owner: String,

    /// Name of the repository the images are published from
    pub repo_name: String,

    /// Branch the images are published on
    pub branch: String,

    /// Host serving raw repository content
    pub raw_host: String,
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSettings")
            .field(
                "connection_string",
                &redact_if_sensitive("connection_string", &self.connection_string),
            )
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("branch", &self.branch)
            .field("raw_host", &self.raw_host)
            .finish()
    }
}

impl SyncSettings {
    pub fn builder() -> SyncSettingsBuilder {
        SyncSettingsBuilder::default()
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// `IMAGE_DB_URL` wins over `DATABASE_URL` when both are set. All missing
    /// required variables are reported in a single
    /// [`Error::MissingConfig`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(url) = lookup_non_empty(&lookup, env_keys::IMAGE_DB_URL)
            .or_else(|| lookup_non_empty(&lookup, env_keys::DATABASE_URL))
        {
            builder = builder.connection_string(url);
        }
        if let Some(owner) = lookup_non_empty(&lookup, env_keys::REPO_OWNER) {
            builder = builder.repo_owner(owner);
        }
        if let Some(name) = lookup_non_empty(&lookup, env_keys::REPO_NAME) {
            builder = builder.repo_name(name);
        }
        if let Some(branch) = lookup_non_empty(&lookup, env_keys::REPO_BRANCH) {
            builder = builder.branch(branch);
        }
        if let Some(host) = lookup_non_empty(&lookup, env_keys::RAW_CONTENT_HOST) {
            builder = builder.raw_host(host);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Repository owner", &self.repo_owner),
            ("Repository name", &self.repo_name),
            ("Branch", &self.branch),
        ] {
            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(Error::Config(format!(
                    "{} must be a single path segment without whitespace: '{}'",
                    name, value
                )));
            }
        }

        if self.raw_host.contains("://") || self.raw_host.ends_with('/') {
            return Err(Error::Config(format!(
                "Raw content host must be a bare host name: '{}'",
                self.raw_host
            )));
        }

        Ok(())
    }
}

/// Builder for [`SyncSettings`].
#[derive(Debug, Default)]
pub struct SyncSettingsBuilder {
    connection_string: Option<String>,
    repo_owner: Option<String>,
    repo_name: Option<String>,
    branch: Option<String>,
    raw_host: Option<String>,
}

impl SyncSettingsBuilder {
    pub fn connection_string(mut self, url: impl Into<String>) -> Self {
        self.connection_string = Some(url.into());
        self
    }

    pub fn repo_owner(mut self, owner: impl Into<String>) -> Self {
        self.repo_owner = Some(owner.into());
        self
    }

    pub fn repo_name(mut self, name: impl Into<String>) -> Self {
        self.repo_name = Some(name.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn raw_host(mut self, host: impl Into<String>) -> Self {
        self.raw_host = Some(host.into());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] naming every absent required field,
    /// or [`Error::Config`] if a present value is invalid.
    pub fn build(self) -> Result<SyncSettings> {
        let mut missing = Vec::new();
        if self.connection_string.is_none() {
            missing.push(format!("{} (or {})", env_keys::IMAGE_DB_URL, env_keys::DATABASE_URL));
        }
        if self.repo_owner.is_none() {
            missing.push(env_keys::REPO_OWNER.to_string());
        }
        if self.repo_name.is_none() {
            missing.push(env_keys::REPO_NAME.to_string());
        }

        match (self.connection_string, self.repo_owner, self.repo_name) {
            (Some(connection_string), Some(repo_owner), Some(repo_name)) => {
                let settings = SyncSettings {
                    connection_string,
                    repo_owner,
                    repo_name,
                    branch: self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                    raw_host: self.raw_host.unwrap_or_else(|| DEFAULT_RAW_HOST.to_string()),
                };
                settings.validate()?;
                Ok(settings)
            }
            _ => Err(Error::MissingConfig { keys: missing }),
        }
    }
}
