//! Map configuration.
//!
//! All knobs have defaults matching the classic expiring-map layout:
//! 16 initial buckets, a 0.75 load factor and a one second sweep period.

use crate::error::{Error, Result};
use std::time::Duration;

/// Number of buckets a freshly constructed map starts with.
pub const DEFAULT_INITIAL_BUCKETS: usize = 16;

/// Entries-per-bucket ratio above which the table doubles.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;

/// Delay between two background sweeps.
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Configuration for an [`ExpiringMap`](crate::ExpiringMap).
///
/// # Example
///
/// ```
/// use expiremap::MapConfig;
/// use std::time::Duration;
///
/// let config = MapConfig::default()
///     .with_initial_buckets(64)
///     .with_sweep_period(Duration::from_millis(250));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Bucket count at construction (default: 16)
    pub initial_buckets: usize,

    /// Resize once `len > load_factor * bucket_count` (default: 0.75)
    pub load_factor: f64,

    /// Interval between background sweeps (default: 1s)
    pub sweep_period: Duration,

    /// Whether to start the background reclaimer (default: true)
    pub reclaimer: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_buckets: DEFAULT_INITIAL_BUCKETS,
            load_factor: DEFAULT_LOAD_FACTOR,
            sweep_period: DEFAULT_SWEEP_PERIOD,
            reclaimer: true,
        }
    }
}

impl MapConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of buckets the table starts with.
    pub fn with_initial_buckets(mut self, buckets: usize) -> Self {
        self.initial_buckets = buckets;
        self
    }

    /// Sets the load factor that triggers a resize.
    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets the delay between background sweeps.
    pub fn with_sweep_period(mut self, period: Duration) -> Self {
        self.sweep_period = period;
        self
    }

    /// Disables the background reclaimer.
    ///
    /// Expired entries are then only dropped by reads and by
    /// [`ExpiringMap::purge_expired`](crate::ExpiringMap::purge_expired).
    pub fn without_reclaimer(mut self) -> Self {
        self.reclaimer = false;
        self
    }

    /// Checks that every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.initial_buckets == 0 {
            return Err(Error::InvalidConfig(
                "initial bucket count must be at least 1".to_string(),
            ));
        }
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "load factor must be a positive number, got {}",
                self.load_factor
            )));
        }
        if self.sweep_period.is_zero() {
            return Err(Error::InvalidConfig(
                "sweep period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
