//! The seams between the cache engine and the remote API.
//!
//! `Transport` is what the cache fetches through: one call per entity type,
//! each returning a complete (or, for markets and shipyards, possibly
//! partial) payload or failing. `Actions` covers the state-changing requests
//! that invalidate cached lists.
// Single-threaded consumers only; the futures are not required to be Send.
#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;
use crate::models::{Agent, Contract, FlightMode, Market, Ship, ShipNav, Shipyard, Waypoint};

pub trait Transport {
    async fn fetch_agent(&self) -> Result<Agent, ApiError>;

    /// All ships, across every page.
    async fn fetch_ships(&self) -> Result<Vec<Ship>, ApiError>;

    /// All contracts, across every page.
    async fn fetch_contracts(&self) -> Result<Vec<Contract>, ApiError>;

    /// All waypoints in a system, across every page.
    async fn fetch_waypoints(&self, system: &str) -> Result<Vec<Waypoint>, ApiError>;

    async fn fetch_market(&self, waypoint: &str) -> Result<Market, ApiError>;

    async fn fetch_shipyard(&self, waypoint: &str) -> Result<Shipyard, ApiError>;
}

pub trait Actions {
    async fn navigate_ship(&self, ship: &str, waypoint: &str) -> Result<ShipNav, ApiError>;

    async fn orbit_ship(&self, ship: &str) -> Result<ShipNav, ApiError>;

    async fn dock_ship(&self, ship: &str) -> Result<ShipNav, ApiError>;

    async fn set_flight_mode(&self, ship: &str, mode: FlightMode) -> Result<ShipNav, ApiError>;

    /// Extract at the ship's waypoint, optionally targeting a survey.
    async fn extract_resources(&self, ship: &str, survey: Option<&Value>) -> Result<Extraction, ApiError>;

    async fn create_survey(&self, ship: &str) -> Result<Vec<Value>, ApiError>;

    async fn refine_materials(&self, ship: &str, produce: &str) -> Result<Value, ApiError>;

    /// Refuel; `None` fills the tank.
    async fn refuel_ship(&self, ship: &str, units: Option<u32>) -> Result<Refuel, ApiError>;

    /// Returns the ship's cargo after jettisoning.
    async fn jettison_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Value, ApiError>;

    async fn sell_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Sale, ApiError>;

    async fn purchase_ship(&self, ship_type: &str, waypoint: &str) -> Result<ShipPurchase, ApiError>;

    async fn negotiate_contract(&self, ship: &str) -> Result<Contract, ApiError>;

    async fn accept_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError>;

    async fn deliver_contract(
        &self,
        contract_id: &str,
        ship: &str,
        trade_symbol: &str,
        units: u32,
    ) -> Result<Delivery, ApiError>;

    async fn fulfill_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError>;
}

/// Response to accepting or fulfilling a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAcceptance {
    pub agent: Agent,
    pub contract: Contract,
}

/// Response to delivering cargo towards a contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub contract: Contract,
    pub cargo: Value,
}

/// Response to an extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub extraction: Value,
    #[serde(default)]
    pub cooldown: Value,
    #[serde(default)]
    pub cargo: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refuel {
    pub agent: Agent,
    pub fuel: Value,
    pub transaction: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub agent: Agent,
    pub cargo: Value,
    pub transaction: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipPurchase {
    pub agent: Agent,
    pub ship: Ship,
    pub transaction: Value,
}
