use std::fmt;

use super::policy::PolicyKind;

/// Location of one entry in the cache document.
///
/// Renders to the fixed key templates (`agent_info`, `ship_list`,
/// `contract_list`, `waypoints_{system}`, `market_{waypoint}`,
/// `shipyard_{waypoint}`); `parse` is the inverse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Agent,
    ShipList,
    ContractList,
    Waypoints(String),
    Market(String),
    Shipyard(String),
}

const AGENT_KEY: &str = "agent_info";
const SHIP_LIST_KEY: &str = "ship_list";
const CONTRACT_LIST_KEY: &str = "contract_list";
const WAYPOINTS_PREFIX: &str = "waypoints_";
const MARKET_PREFIX: &str = "market_";
const SHIPYARD_PREFIX: &str = "shipyard_";

impl CacheKey {
    pub fn waypoints(system: &str) -> Self {
        CacheKey::Waypoints(system.to_string())
    }

    pub fn market(waypoint: &str) -> Self {
        CacheKey::Market(waypoint.to_string())
    }

    pub fn shipyard(waypoint: &str) -> Self {
        CacheKey::Shipyard(waypoint.to_string())
    }

    pub fn parse(key: &str) -> Option<Self> {
        let templated = |prefix: &str| key.strip_prefix(prefix).filter(|rest| !rest.is_empty()).map(str::to_string);

        match key {
            AGENT_KEY => Some(CacheKey::Agent),
            SHIP_LIST_KEY => Some(CacheKey::ShipList),
            CONTRACT_LIST_KEY => Some(CacheKey::ContractList),
            _ => templated(WAYPOINTS_PREFIX)
                .map(CacheKey::Waypoints)
                .or_else(|| templated(MARKET_PREFIX).map(CacheKey::Market))
                .or_else(|| templated(SHIPYARD_PREFIX).map(CacheKey::Shipyard)),
        }
    }

    /// The freshness policy bound to this entity type.
    pub fn policy(&self) -> PolicyKind {
        match self {
            CacheKey::Agent => PolicyKind::Ttl,
            CacheKey::ShipList => PolicyKind::DirtyArrival,
            CacheKey::ContractList => PolicyKind::Dirty,
            CacheKey::Waypoints(_) => PolicyKind::Static,
            CacheKey::Market(_) | CacheKey::Shipyard(_) => PolicyKind::SmartMerge,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Agent => f.write_str(AGENT_KEY),
            CacheKey::ShipList => f.write_str(SHIP_LIST_KEY),
            CacheKey::ContractList => f.write_str(CONTRACT_LIST_KEY),
            CacheKey::Waypoints(system) => write!(f, "{}{}", WAYPOINTS_PREFIX, system),
            CacheKey::Market(waypoint) => write!(f, "{}{}", MARKET_PREFIX, waypoint),
            CacheKey::Shipyard(waypoint) => write!(f, "{}{}", SHIPYARD_PREFIX, waypoint),
        }
    }
}
