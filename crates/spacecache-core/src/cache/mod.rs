//! Local caching module for SpaceTraders game state.
//!
//! This module provides the `CacheManager`, which decides per entity type
//! whether cached data can be served, must be refetched, or must be merged
//! with a fresh but partial server response. Everything lives in one JSON
//! document, loaded and saved whole on every operation.
//!
//! Cached data types and their policies:
//! - Agent info: refreshed after 60 minutes
//! - Ship and contract lists: refreshed after a local change marks them dirty,
//!   and the ship list also once a cached ship should have arrived
//! - Waypoints: never refreshed
//! - Markets and shipyards: refreshed on demand, keeping prices and ship
//!   listings seen earlier when a later response omits them

pub mod entry;
pub mod key;
pub mod lookup;
pub mod manager;
pub mod merge;
pub mod policy;
pub mod store;

pub use entry::{age_display, CacheEntry, DirtyEntry, MergeEntry, TimedEntry};
pub use key::CacheKey;
pub use lookup::ResolveError;
pub use manager::{CacheManager, EntryStatus, GetOptions};
pub use merge::{MergeOutcome, SmartMerge};
pub use policy::{Freshness, PolicyKind};
pub use store::{CacheDocument, CacheStore};
