//! # expiremap - A Concurrent Map With Per-Entry Expiry
//!
//! expiremap is an in-memory key-value map where every entry carries its own
//! time-to-live. Once an entry's deadline passes it can no longer be read,
//! whether or not anything has removed it yet. It is meant for ephemeral
//! shared state such as sessions, rate-limit counters and short-lived caches.
//!
//! ## Features
//!
//! - **Thread-Safe**: one lock guards the whole table, so every operation is
//!   linearizable
//! - **Per-Entry TTL**: each `put` sets its own deadline
//! - **Lazy + Active Expiry**: reads drop expired entries, and a background
//!   reclaimer sweeps the rest
//! - **Amortized O(1)**: the bucket array doubles once it holds more than
//!   0.75 entries per bucket
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             expiremap                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  Callers    │───>│              ExpiringMap                     │   │
//! │  │ put/get/rm  │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  └─────────────┘    │  │Bucket 0│ │Bucket 1│ │Bucket 2│ │...N    │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     │               one Mutex                      │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                                               │                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │              Reclaimer                          │ │
//! │                     │   (Background Thread + Tokio Interval)          │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use expiremap::{ExpiringMap, MapConfig};
//! use std::time::Duration;
//!
//! let map = ExpiringMap::with_config(
//!     MapConfig::default().with_sweep_period(Duration::from_millis(500)),
//! )
//! .unwrap();
//!
//! map.put("user:1", 42u64, Duration::from_secs(30));
//! assert_eq!(map.get("user:1"), Some(42));
//! assert!(map.ttl("user:1").unwrap() <= Duration::from_secs(30));
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the map, its bucket table and the background reclaimer
//! - [`config`]: construction-time parameters
//! - [`error`]: construction errors
//!
//! ## Design Highlights
//!
//! ### Lazy + Active Expiry
//!
//! Entries with a TTL are expired in two ways:
//! 1. **Lazy**: When an entry is accessed, its deadline is checked
//! 2. **Active**: A background task periodically sweeps every bucket
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.
//!
//! ### Resize Without Clock Reads
//!
//! When the table doubles, entries are moved with their deadlines untouched,
//! so rehashing can neither extend nor shorten anyone's lifetime.

pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{MapConfig, DEFAULT_INITIAL_BUCKETS, DEFAULT_LOAD_FACTOR, DEFAULT_SWEEP_PERIOD};
pub use error::{Error, Result};
pub use storage::{ExpiringMap, MapStats, Reclaimer};

/// Version of expiremap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
