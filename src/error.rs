//! Error types for expiremap.
//!
//! The map operations themselves never fail. Errors only arise while
//! constructing a map: either the configuration is rejected or the
//! background reclaimer could not be started.

use thiserror::Error;

/// Errors that can occur while constructing an [`ExpiringMap`](crate::ExpiringMap).
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration parameter is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reclaimer thread or its runtime could not be created
    #[error("failed to start reclaimer: {0}")]
    ReclaimerSpawn(#[from] std::io::Error),
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;
