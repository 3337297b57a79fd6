//! Resource cache for fetched domain data.
//!
//! This module provides a domain-agnostic caching mechanism that:
//! - Keys entries by hierarchical [`QueryKey`]s built from filter objects
//! - Invalidates whole key subtrees by prefix
//! - Coalesces concurrent fetches of the same key into one network call
//! - Applies optional per key-family time-based staleness

mod key;
mod layer;
mod policy;
mod traits;

pub use key::{canonical_params, KeySegment, QueryKey};
pub use layer::{CacheEntry, QueryCache};
pub use policy::StalePolicy;
pub use traits::{CacheResult, CacheSource};
