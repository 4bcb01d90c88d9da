use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Derive a system symbol from a waypoint symbol.
/// `X1-ABC-1` lives in `X1-ABC`; a symbol without a sector suffix is returned unchanged.
pub fn system_symbol(waypoint: &str) -> &str {
    match waypoint.rsplit_once('-') {
        Some((system, _)) if system.contains('-') => system,
        _ => waypoint,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub symbol: String,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    pub system_symbol: String,
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub traits: Vec<WaypointTrait>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointTrait {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Waypoint {
    pub fn has_trait(&self, symbol: &str) -> bool {
        self.traits.iter().any(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn has_marketplace(&self) -> bool {
        self.has_trait("MARKETPLACE")
    }

    pub fn has_shipyard(&self) -> bool {
        self.has_trait("SHIPYARD")
    }
}
