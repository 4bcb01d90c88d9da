//! Client-side cache for the SpaceTraders v2 API.
//!
//! The `cache` module decides, per entity type, whether locally stored game
//! state can be served, must be refetched, or must be merged with a partial
//! server response. `api` provides the reqwest transport it fetches through.

pub mod api;
pub mod cache;
pub mod config;
pub mod goods;
pub mod models;

pub use api::{Actions, ApiClient, ApiError, Transport};
pub use cache::{CacheKey, CacheManager, CacheStore, GetOptions, ResolveError};
pub use config::Config;
pub use goods::SystemGoods;
