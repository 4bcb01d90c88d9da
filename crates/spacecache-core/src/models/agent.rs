use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::waypoint::system_symbol;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub symbol: String,
    pub headquarters: String,
    pub credits: i64,
    pub starting_faction: String,
    #[serde(default)]
    pub ship_count: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Agent {
    /// System containing the agent's headquarters waypoint.
    pub fn home_system(&self) -> &str {
        system_symbol(&self.headquarters)
    }
}
