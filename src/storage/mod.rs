//! Storage Module
//!
//! This module provides the expiring map and everything behind it: the entry
//! record, the bucketed hash table and the background reclaimer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExpiringMap                             │
//! │               Mutex<BucketTable>                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │Bucket 0 │ │Bucket 1 │ │Bucket 2 │ │...N     │           │
//! │  │Vec<Entry│ │Vec<Entry│ │Vec<Entry│ │ buckets │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ Weak
//!              ┌─────────────┴─────────────┐
//!              │        Reclaimer          │
//!              │   (Background Thread)     │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Single Lock**: every operation is linearizable
//! - **Per-Entry TTL**: each entry carries an absolute deadline
//! - **Lazy Expiry**: expired entries are dropped on access
//! - **Active Expiry**: the reclaimer drops entries nobody reads again
//! - **Load-Factor Resize**: the table doubles past 0.75 entries per bucket
//!
//! ## Example
//!
//! ```
//! use expiremap::storage::ExpiringMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let map = Arc::new(ExpiringMap::new().unwrap());
//!
//! map.put("name".to_string(), "Ada".to_string(), Duration::from_secs(3600));
//! assert_eq!(map.get("name"), Some("Ada".to_string()));
//!
//! map.remove("name");
//! assert_eq!(map.get("name"), None);
//! ```

mod entry;
pub mod map;
pub mod reclaimer;
mod table;

// Re-export commonly used types
pub use entry::ttl_from_millis;
pub use map::{ExpiringMap, MapStats};
pub use reclaimer::Reclaimer;
