use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A shipyard listing.
///
/// `ships` (models and prices for sale) is only populated while one of the
/// agent's ships is at the waypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipyard {
    pub symbol: String,
    #[serde(default)]
    pub ship_types: Vec<ShipTypeEntry>,
    #[serde(default)]
    pub ships: Option<Vec<ShipyardShip>>,
    #[serde(default)]
    pub modifications_fee: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipTypeEntry {
    #[serde(rename = "type")]
    pub ship_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipyardShip {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ship_type: Option<String>,
    pub name: String,
    #[serde(default)]
    pub purchase_price: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
