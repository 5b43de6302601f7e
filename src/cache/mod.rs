//! Cache module for bounding calls to upstream APIs
//!
//! This module provides an in-memory cache that bounds memory with a fixed
//! entry capacity (least-recently-used eviction), bounds staleness with a
//! per-entry TTL, and coalesces concurrent loads for the same key into a
//! single upstream call. Expiry is lazy: stale entries are detected and
//! dropped on access rather than by a background sweep.

mod manager;

pub use manager::{Cache, CacheConfig, CacheConfigError, CacheError, CacheStats};
