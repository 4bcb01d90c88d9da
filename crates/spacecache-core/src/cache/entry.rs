//! Typed envelopes for the values stored under each cache key.
//!
//! On disk every entry is an object with `last_updated` and `data`; dirty-flag
//! entries add `is_dirty`, and smart-merge entries add a timestamp scoped to
//! their volatile field (`prices_updated` for markets, `ships_updated` for
//! shipyards).

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::key::CacheKey;
use super::merge::SmartMerge;
use crate::models::{Agent, Contract, Market, Ship, Shipyard, Waypoint};

/// Entry refreshed on a timer (agent) or never (waypoints).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEntry<T> {
    pub last_updated: Option<DateTime<Utc>>,
    pub data: T,
}

/// Entry refreshed when a local mutation has flagged it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirtyEntry<T> {
    pub last_updated: Option<DateTime<Utc>>,
    /// An entry written without the flag is treated as dirty.
    #[serde(default = "default_dirty")]
    pub is_dirty: bool,
    pub data: T,
}

fn default_dirty() -> bool {
    true
}

/// Entry whose volatile field is reconciled rather than replaced.
///
/// `volatile_updated` is serialized under `T::TIMESTAMP_FIELD` and only
/// advances when the volatile field was actually observed populated.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeEntry<T> {
    pub last_updated: Option<DateTime<Utc>>,
    pub volatile_updated: Option<DateTime<Utc>>,
    pub data: T,
}

impl<T: SmartMerge + Serialize> Serialize for MergeEntry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("last_updated", &self.last_updated)?;
        map.serialize_entry(T::TIMESTAMP_FIELD, &self.volatile_updated)?;
        map.serialize_entry("data", &self.data)?;
        map.end()
    }
}

impl<'de, T: SmartMerge + DeserializeOwned> Deserialize<'de> for MergeEntry<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = Map::<String, Value>::deserialize(deserializer)?;

        let last_updated = take_timestamp(&mut raw, "last_updated").map_err(<D::Error as de::Error>::custom)?;
        let volatile_updated = take_timestamp(&mut raw, T::TIMESTAMP_FIELD).map_err(<D::Error as de::Error>::custom)?;
        let data = raw
            .remove("data")
            .ok_or_else(|| <D::Error as de::Error>::missing_field("data"))?;
        let data = serde_json::from_value(data).map_err(<D::Error as de::Error>::custom)?;

        Ok(Self {
            last_updated,
            volatile_updated,
            data,
        })
    }
}

fn take_timestamp(raw: &mut Map<String, Value>, field: &str) -> serde_json::Result<Option<DateTime<Utc>>> {
    match raw.remove(field) {
        Some(value) => serde_json::from_value(value),
        None => Ok(None),
    }
}

/// One decoded cache entry, discriminated by the key it was stored under.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    Agent(TimedEntry<Agent>),
    Ships(DirtyEntry<Vec<Ship>>),
    Contracts(DirtyEntry<Vec<Contract>>),
    Waypoints(TimedEntry<Vec<Waypoint>>),
    Market(MergeEntry<Market>),
    Shipyard(MergeEntry<Shipyard>),
}

impl CacheEntry {
    pub fn decode(key: &CacheKey, value: Value) -> serde_json::Result<Self> {
        Ok(match key {
            CacheKey::Agent => CacheEntry::Agent(serde_json::from_value(value)?),
            CacheKey::ShipList => CacheEntry::Ships(serde_json::from_value(value)?),
            CacheKey::ContractList => CacheEntry::Contracts(serde_json::from_value(value)?),
            CacheKey::Waypoints(_) => CacheEntry::Waypoints(serde_json::from_value(value)?),
            CacheKey::Market(_) => CacheEntry::Market(serde_json::from_value(value)?),
            CacheKey::Shipyard(_) => CacheEntry::Shipyard(serde_json::from_value(value)?),
        })
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            CacheEntry::Agent(e) => e.last_updated,
            CacheEntry::Ships(e) => e.last_updated,
            CacheEntry::Contracts(e) => e.last_updated,
            CacheEntry::Waypoints(e) => e.last_updated,
            CacheEntry::Market(e) => e.last_updated,
            CacheEntry::Shipyard(e) => e.last_updated,
        }
    }

    /// Dirty flag, for dirty-flag entries only.
    pub fn is_dirty(&self) -> Option<bool> {
        match self {
            CacheEntry::Ships(e) => Some(e.is_dirty),
            CacheEntry::Contracts(e) => Some(e.is_dirty),
            _ => None,
        }
    }

    /// Volatile-field timestamp, for smart-merge entries only.
    pub fn volatile_updated(&self) -> Option<DateTime<Utc>> {
        match self {
            CacheEntry::Market(e) => e.volatile_updated,
            CacheEntry::Shipyard(e) => e.volatile_updated,
            _ => None,
        }
    }

    /// Number of records held (1 for single-object payloads).
    pub fn len(&self) -> usize {
        match self {
            CacheEntry::Ships(e) => e.data.len(),
            CacheEntry::Contracts(e) => e.data.len(),
            CacheEntry::Waypoints(e) => e.data.len(),
            _ => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Human-readable age of a timestamp, e.g. "5m ago", "2h ago", "3d ago".
pub fn age_display(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - since).num_minutes();
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        let remaining_mins = minutes % 60;
        if remaining_mins >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        let remaining_hours = (minutes % 1440) / 60;
        if remaining_hours >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn market_value() -> Value {
        json!({
            "symbol": "X1-ABC-1",
            "exports": [],
            "imports": [],
            "exchange": [],
            "tradeGoods": null
        })
    }

    #[test]
    fn test_merge_entry_uses_scoped_timestamp_field() {
        let entry = MergeEntry {
            last_updated: None,
            volatile_updated: None,
            data: serde_json::from_value::<Market>(market_value()).expect("market should parse"),
        };
        let value = serde_json::to_value(&entry).expect("entry should serialize");
        assert!(value.get("prices_updated").is_some());
        assert!(value["prices_updated"].is_null());
        assert!(value["data"]["tradeGoods"].is_null());
    }

    #[test]
    fn test_merge_entry_reads_back_timestamps() {
        let value = json!({
            "last_updated": "2025-01-01T12:00:00+00:00",
            "prices_updated": "2025-01-01T11:00:00+00:00",
            "data": market_value()
        });
        let entry: MergeEntry<Market> = serde_json::from_value(value).expect("entry should parse");
        assert_eq!(entry.volatile_updated.map(|t| t.to_rfc3339()), Some("2025-01-01T11:00:00+00:00".to_string()));
        assert!(entry.last_updated.is_some());
    }

    #[test]
    fn test_merge_entry_missing_data_is_an_error() {
        let value = json!({ "last_updated": null, "prices_updated": null });
        assert!(serde_json::from_value::<MergeEntry<Market>>(value).is_err());
    }

    #[test]
    fn test_dirty_flag_defaults_to_dirty() {
        let value = json!({ "last_updated": null, "data": [] });
        let entry: DirtyEntry<Vec<Contract>> = serde_json::from_value(value).expect("entry should parse");
        assert!(entry.is_dirty);
    }

    #[test]
    fn test_decode_follows_key() {
        let value = json!({ "last_updated": null, "is_dirty": false, "data": [] });
        let entry = CacheEntry::decode(&CacheKey::ContractList, value).expect("entry should decode");
        assert_eq!(entry.is_dirty(), Some(false));
        assert!(entry.is_empty());
        assert_eq!(entry.volatile_updated(), None);
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        assert_eq!(age_display(now, now), "just now");
        assert_eq!(age_display(now + Duration::minutes(5), now), "just now");
        assert_eq!(age_display(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(age_display(now - Duration::minutes(90), now), "2h ago");
        assert_eq!(age_display(now - Duration::minutes(70), now), "1h ago");
        assert_eq!(age_display(now - Duration::days(3), now), "3d ago");
    }
}
