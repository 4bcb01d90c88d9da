//! Data models for SpaceTraders entities.
//!
//! This module contains the payload types the cache stores:
//!
//! - `Agent`: the authenticated agent (credits, headquarters)
//! - `Ship`, `ShipNav`: the fleet and each ship's navigation state
//! - `Contract`: procurement contracts and their terms
//! - `Waypoint`: static system geography
//! - `Market`, `Shipyard`: per-waypoint data whose prices and listings
//!   are only returned while a ship is present
//!
//! Every model keeps the fields it does not name in a flattened `extra`
//! map, so a payload survives a load/save cycle intact.

pub mod agent;
pub mod contract;
pub mod market;
pub mod ship;
pub mod shipyard;
pub mod waypoint;

pub use agent::Agent;
pub use contract::{Contract, ContractDeliverGood, ContractPayment, ContractTerms};
pub use market::{Market, MarketTradeGood, TradeGood};
pub use ship::{FlightMode, RouteWaypoint, Ship, ShipNav, ShipNavRoute, ShipNavStatus};
pub use shipyard::{ShipTypeEntry, Shipyard, ShipyardShip};
pub use waypoint::{system_symbol, Waypoint, WaypointTrait};
