use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipNavStatus {
    InTransit,
    InOrbit,
    Docked,
}

impl std::fmt::Display for ShipNavStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShipNavStatus::InTransit => write!(f, "IN_TRANSIT"),
            ShipNavStatus::InOrbit => write!(f, "IN_ORBIT"),
            ShipNavStatus::Docked => write!(f, "DOCKED"),
        }
    }
}

/// Speed/fuel trade-off for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightMode {
    Drift,
    Stealth,
    Cruise,
    Burn,
}

impl std::fmt::Display for FlightMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightMode::Drift => write!(f, "DRIFT"),
            FlightMode::Stealth => write!(f, "STEALTH"),
            FlightMode::Cruise => write!(f, "CRUISE"),
            FlightMode::Burn => write!(f, "BURN"),
        }
    }
}

impl std::str::FromStr for FlightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRIFT" => Ok(FlightMode::Drift),
            "STEALTH" => Ok(FlightMode::Stealth),
            "CRUISE" => Ok(FlightMode::Cruise),
            "BURN" => Ok(FlightMode::Burn),
            other => Err(format!("Unknown flight mode '{}' (expected DRIFT, STEALTH, CRUISE or BURN)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub symbol: String,
    pub nav: ShipNav,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipNav {
    pub system_symbol: String,
    pub waypoint_symbol: String,
    pub route: ShipNavRoute,
    pub status: ShipNavStatus,
    pub flight_mode: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipNavRoute {
    pub destination: RouteWaypoint,
    pub origin: RouteWaypoint,
    pub departure_time: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteWaypoint {
    pub symbol: String,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    pub system_symbol: String,
    pub x: i64,
    pub y: i64,
}

impl ShipNav {
    /// A ship whose recorded arrival has passed while it is still marked in transit.
    /// The server has already moved it into orbit; the local copy is out of date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ShipNavStatus::InTransit && self.route.arrival <= now
    }
}

impl Ship {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.nav.is_overdue(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ship_json(status: &str, arrival: DateTime<Utc>) -> String {
        format!(
            r#"{{"symbol":"SHIP-1","registration":{{"name":"Test Ship","role":"COMMAND"}},
            "nav":{{"systemSymbol":"X1-ABC","waypointSymbol":"X1-ABC-1",
                "route":{{"destination":{{"symbol":"X1-ABC-2","type":"PLANET","systemSymbol":"X1-ABC","x":1,"y":1}},
                          "origin":{{"symbol":"X1-ABC-1","type":"PLANET","systemSymbol":"X1-ABC","x":0,"y":0}},
                          "departureTime":"2023-01-01T00:00:00Z","arrival":"{}"}},
                "status":"{}","flightMode":"CRUISE"}},
            "fuel":{{"current":100,"capacity":100}}}}"#,
            arrival.to_rfc3339(),
            status
        )
    }

    #[test]
    fn test_in_transit_past_arrival_is_overdue() {
        let now = Utc::now();
        let ship: Ship = serde_json::from_str(&ship_json("IN_TRANSIT", now - Duration::seconds(5)))
            .expect("ship should parse");
        assert_eq!(ship.nav.status, ShipNavStatus::InTransit);
        assert!(ship.is_overdue(now));
    }

    #[test]
    fn test_arrival_exactly_now_is_overdue() {
        let now = Utc::now();
        let ship: Ship = serde_json::from_str(&ship_json("IN_TRANSIT", now)).expect("ship should parse");
        assert!(ship.is_overdue(now));
    }

    #[test]
    fn test_future_arrival_or_docked_is_not_overdue() {
        let now = Utc::now();
        let en_route: Ship = serde_json::from_str(&ship_json("IN_TRANSIT", now + Duration::minutes(3)))
            .expect("ship should parse");
        assert!(!en_route.is_overdue(now));

        let docked: Ship = serde_json::from_str(&ship_json("DOCKED", now - Duration::hours(1)))
            .expect("ship should parse");
        assert!(!docked.is_overdue(now));
    }

    #[test]
    fn test_unmodelled_ship_fields_are_kept() {
        let ship: Ship = serde_json::from_str(&ship_json("IN_ORBIT", Utc::now())).expect("ship should parse");
        assert_eq!(ship.extra["fuel"]["capacity"], 100);
        let value = serde_json::to_value(&ship).expect("ship should serialize");
        assert_eq!(value["registration"]["role"], "COMMAND");
        assert_eq!(value["nav"]["status"], "IN_ORBIT");
    }

    #[test]
    fn test_flight_mode_parse() {
        assert_eq!("burn".parse::<FlightMode>(), Ok(FlightMode::Burn));
        assert_eq!("CRUISE".parse::<FlightMode>(), Ok(FlightMode::Cruise));
        assert!("WARP".parse::<FlightMode>().is_err());
        assert_eq!(serde_json::to_value(FlightMode::Stealth).expect("serialize"), serde_json::json!("STEALTH"));
    }
}
