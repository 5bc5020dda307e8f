use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid range: start {start} is greater than end {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Code number {number} is above the largest storable number {max}")]
    CodeOutOfRange { number: u64, max: u64 },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
