//! Reconciliation of smart-merge entries.
//!
//! Markets and shipyards come back from the server with their volatile field
//! (live prices, ships for sale) only when a ship is present. A fetch from
//! afar still refreshes the descriptive fields, but must not wipe a volatile
//! field observed earlier. Once populated, the volatile field only changes
//! when a fetch returns it populated again.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::entry::MergeEntry;
use crate::models::{Market, Shipyard};

/// A payload with one volatile field that the server may omit.
pub trait SmartMerge {
    /// Upstream name of the volatile field, for logging.
    const VOLATILE_FIELD: &'static str;
    /// Entry field holding the volatile field's own timestamp.
    const TIMESTAMP_FIELD: &'static str;

    /// Whether the volatile field is present and non-empty.
    fn has_volatile_field(&self) -> bool;

    /// Replace this payload's volatile field with `other`'s.
    fn adopt_volatile_field(&mut self, other: Self);
}

impl SmartMerge for Market {
    const VOLATILE_FIELD: &'static str = "tradeGoods";
    const TIMESTAMP_FIELD: &'static str = "prices_updated";

    fn has_volatile_field(&self) -> bool {
        self.trade_goods.as_ref().is_some_and(|goods| !goods.is_empty())
    }

    fn adopt_volatile_field(&mut self, other: Self) {
        self.trade_goods = other.trade_goods;
    }
}

impl SmartMerge for Shipyard {
    const VOLATILE_FIELD: &'static str = "ships";
    const TIMESTAMP_FIELD: &'static str = "ships_updated";

    fn has_volatile_field(&self) -> bool {
        self.ships.as_ref().is_some_and(|ships| !ships.is_empty())
    }

    fn adopt_volatile_field(&mut self, other: Self) {
        self.ships = other.ships;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Fresh payload carried the volatile field.
    Fresh,
    /// Volatile field kept from the cached payload.
    Preserved,
    /// Neither payload had the volatile field.
    Incomplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub data: T,
    pub volatile_updated: Option<DateTime<Utc>>,
    pub outcome: MergeOutcome,
}

/// Merge a fresh, possibly partial payload with what is cached.
pub fn reconcile<T: SmartMerge>(cached: Option<MergeEntry<T>>, fresh: T, now: DateTime<Utc>) -> Reconciled<T> {
    if fresh.has_volatile_field() {
        debug!(field = T::VOLATILE_FIELD, "Fresh payload has volatile field, using fresh data");
        return Reconciled {
            data: fresh,
            volatile_updated: Some(now),
            outcome: MergeOutcome::Fresh,
        };
    }

    match cached {
        Some(entry) if entry.data.has_volatile_field() => {
            debug!(field = T::VOLATILE_FIELD, "Preserving cached volatile field over incomplete fetch");
            let mut data = fresh;
            data.adopt_volatile_field(entry.data);
            Reconciled {
                data,
                volatile_updated: entry.volatile_updated,
                outcome: MergeOutcome::Preserved,
            }
        }
        _ => {
            debug!(field = T::VOLATILE_FIELD, "Fresh payload lacks volatile field and nothing cached to keep");
            Reconciled {
                data: fresh,
                volatile_updated: None,
                outcome: MergeOutcome::Incomplete,
            }
        }
    }
}

/// Take the fresh payload unconditionally, even if that drops a cached volatile field.
pub fn accept_fresh<T: SmartMerge>(fresh: T, now: DateTime<Utc>) -> Reconciled<T> {
    let populated = fresh.has_volatile_field();
    Reconciled {
        volatile_updated: populated.then_some(now),
        outcome: if populated { MergeOutcome::Fresh } else { MergeOutcome::Incomplete },
        data: fresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn market(exports: &[&str], trade_goods: Option<&[&str]>) -> Market {
        let exports: Vec<_> = exports.iter().map(|s| json!({"symbol": s, "name": s, "description": ""})).collect();
        let goods = trade_goods.map(|goods| {
            goods
                .iter()
                .map(|s| json!({"symbol": s, "type": "EXPORT", "tradeVolume": 10, "supply": "MODERATE",
                                "purchasePrice": 30, "sellPrice": 25}))
                .collect::<Vec<_>>()
        });
        serde_json::from_value(json!({
            "symbol": "X1-ABC-1",
            "exports": exports,
            "imports": [],
            "exchange": [],
            "tradeGoods": goods
        }))
        .expect("market should parse")
    }

    fn shipyard(ship_types: &[&str], ships: Option<&[&str]>) -> Shipyard {
        let types: Vec<_> = ship_types.iter().map(|t| json!({"type": t})).collect();
        let ships = ships.map(|ships| {
            ships
                .iter()
                .map(|t| json!({"type": t, "name": t, "purchasePrice": 1000}))
                .collect::<Vec<_>>()
        });
        serde_json::from_value(json!({
            "symbol": "X1-ABC-1",
            "shipTypes": types,
            "ships": ships,
            "modificationsFee": 100
        }))
        .expect("shipyard should parse")
    }

    fn symbols(market: &Market) -> Vec<String> {
        market.trade_goods.iter().flatten().map(|g| g.symbol.clone()).collect()
    }

    #[test]
    fn test_fresh_with_volatile_field_wins() {
        let now = Utc::now();
        let cached = MergeEntry {
            last_updated: Some(now - Duration::hours(1)),
            volatile_updated: Some(now - Duration::hours(1)),
            data: market(&["IRON_ORE"], Some(&["IRON_ORE"])),
        };
        let result = reconcile(Some(cached), market(&["COPPER"], Some(&["COPPER"])), now);
        assert_eq!(result.outcome, MergeOutcome::Fresh);
        assert_eq!(symbols(&result.data), vec!["COPPER"]);
        assert_eq!(result.volatile_updated, Some(now));
    }

    #[test]
    fn test_preserve_volatile_field_when_fresh_lacks_it() {
        let now = Utc::now();
        let earlier = now - Duration::hours(3);
        let cached = MergeEntry {
            last_updated: Some(earlier),
            volatile_updated: Some(earlier),
            data: market(&["IRON_ORE"], Some(&["IRON_ORE"])),
        };
        let result = reconcile(Some(cached), market(&["IRON_ORE", "COPPER"], None), now);
        assert_eq!(result.outcome, MergeOutcome::Preserved);
        assert_eq!(symbols(&result.data), vec!["IRON_ORE"]);
        // descriptive fields come from the fresh payload
        assert_eq!(result.data.exports.len(), 2);
        // the volatile timestamp does not advance
        assert_eq!(result.volatile_updated, Some(earlier));
    }

    #[test]
    fn test_empty_volatile_field_counts_as_missing() {
        let now = Utc::now();
        let cached = MergeEntry {
            last_updated: None,
            volatile_updated: Some(now - Duration::minutes(10)),
            data: market(&[], Some(&["FUEL"])),
        };
        let result = reconcile(Some(cached), market(&[], Some(&[])), now);
        assert_eq!(result.outcome, MergeOutcome::Preserved);
        assert_eq!(symbols(&result.data), vec!["FUEL"]);
    }

    #[test]
    fn test_no_cache_uses_fresh_without_timestamp() {
        let result = reconcile(None, market(&["IRON_ORE"], None), Utc::now());
        assert_eq!(result.outcome, MergeOutcome::Incomplete);
        assert!(result.data.trade_goods.is_none());
        assert_eq!(result.volatile_updated, None);
    }

    #[test]
    fn test_cache_lacking_volatile_field_uses_fresh() {
        let cached = MergeEntry {
            last_updated: None,
            volatile_updated: None,
            data: market(&["IRON_ORE"], None),
        };
        let result = reconcile(Some(cached), market(&["COPPER"], None), Utc::now());
        assert_eq!(result.outcome, MergeOutcome::Incomplete);
        assert_eq!(result.data.exports[0].symbol, "COPPER");
        assert_eq!(result.volatile_updated, None);
    }

    #[test]
    fn test_shipyard_preserves_ships() {
        let now = Utc::now();
        let earlier = now - Duration::days(1);
        let cached = MergeEntry {
            last_updated: Some(earlier),
            volatile_updated: Some(earlier),
            data: shipyard(&["SHIP_LIGHT_HAULER"], Some(&["SHIP_LIGHT_HAULER"])),
        };
        let result = reconcile(Some(cached), shipyard(&["SHIP_LIGHT_HAULER", "SHIP_MINING_DRONE"], None), now);
        assert_eq!(result.outcome, MergeOutcome::Preserved);
        assert_eq!(result.data.ship_types.len(), 2);
        assert_eq!(result.data.ships.as_ref().map(Vec::len), Some(1));
        assert_eq!(result.volatile_updated, Some(earlier));
    }

    #[test]
    fn test_shipyard_uses_fresh_ships() {
        let now = Utc::now();
        let result = reconcile(None, shipyard(&["SHIP_LIGHT_HAULER"], Some(&["SHIP_LIGHT_HAULER"])), now);
        assert_eq!(result.outcome, MergeOutcome::Fresh);
        assert_eq!(result.volatile_updated, Some(now));
    }

    #[test]
    fn test_accept_fresh_drops_cached_field() {
        let now = Utc::now();
        let result = accept_fresh(market(&["IRON_ORE"], None), now);
        assert_eq!(result.outcome, MergeOutcome::Incomplete);
        assert_eq!(result.volatile_updated, None);

        let result = accept_fresh(market(&["IRON_ORE"], Some(&["IRON_ORE"])), now);
        assert_eq!(result.volatile_updated, Some(now));
    }
}
