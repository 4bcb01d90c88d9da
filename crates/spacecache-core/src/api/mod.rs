//! REST API module for the SpaceTraders v2 API.
//!
//! This module provides the `Transport` seam the cache engine fetches
//! through, the `Actions` seam for state-changing requests, and `ApiClient`,
//! the reqwest-backed implementation of both.
//!
//! The API uses bearer token authentication with an agent token.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{Actions, ContractAcceptance, Delivery, Extraction, Refuel, Sale, ShipPurchase, Transport};
