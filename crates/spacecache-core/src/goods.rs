//! Trade goods across every marketplace in a system.
//!
//! Built from cached waypoints and markets only, so it never needs a ship
//! present: imports, exports and exchange are returned from afar. Prices are
//! not included.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::api::{ApiError, Transport};
use crate::cache::{CacheManager, GetOptions};
use crate::models::{Market, TradeGood};

/// What one market sells and buys, deduplicated and sorted by symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketGoods {
    pub sells: Vec<TradeGood>,
    pub buys: Vec<TradeGood>,
}

impl MarketGoods {
    pub fn from_market(market: &Market) -> Self {
        Self {
            sells: unique_sorted(market.sells()),
            buys: unique_sorted(market.buys()),
        }
    }
}

/// Waypoints selling and buying one good, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoodLocations {
    pub sells: Vec<String>,
    pub buys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemGoods {
    pub by_waypoint: BTreeMap<String, MarketGoods>,
    pub by_good: BTreeMap<String, GoodLocations>,
}

impl SystemGoods {
    pub fn insert(&mut self, waypoint: &str, goods: MarketGoods) {
        for good in &goods.sells {
            let locations = self.by_good.entry(good.symbol.clone()).or_default();
            insert_sorted(&mut locations.sells, waypoint);
        }
        for good in &goods.buys {
            let locations = self.by_good.entry(good.symbol.clone()).or_default();
            insert_sorted(&mut locations.buys, waypoint);
        }
        self.by_waypoint.insert(waypoint.to_string(), goods);
    }
}

fn unique_sorted<'a>(goods: impl Iterator<Item = &'a TradeGood>) -> Vec<TradeGood> {
    let mut seen = BTreeSet::new();
    let mut out: Vec<TradeGood> = goods.filter(|g| seen.insert(g.symbol.clone())).cloned().collect();
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    out
}

fn insert_sorted(list: &mut Vec<String>, waypoint: &str) {
    if let Err(pos) = list.binary_search_by(|w| w.as_str().cmp(waypoint)) {
        list.insert(pos, waypoint.to_string());
    }
}

impl<T: Transport> CacheManager<T> {
    /// Aggregate goods over every marketplace waypoint in `system`.
    pub async fn system_goods(&self, system: &str) -> Result<SystemGoods, ApiError> {
        let waypoints = self.get_waypoints(system, GetOptions::cached()).await?;
        let mut goods = SystemGoods::default();

        for waypoint in waypoints.iter().filter(|w| w.has_marketplace()) {
            let market = self.get_market(&waypoint.symbol, GetOptions::cached()).await?;
            goods.insert(&waypoint.symbol, MarketGoods::from_market(&market));
        }

        debug!(system = system, markets = goods.by_waypoint.len(), goods = goods.by_good.len(), "Aggregated system goods");
        Ok(goods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market(symbol: &str, exports: &[&str], imports: &[&str], exchange: &[&str]) -> Market {
        let goods = |names: &[&str]| names.iter().map(|n| json!({ "symbol": n })).collect::<Vec<_>>();
        serde_json::from_value(json!({
            "symbol": symbol,
            "exports": goods(exports),
            "imports": goods(imports),
            "exchange": goods(exchange),
        }))
        .expect("market should parse")
    }

    fn symbols(goods: &[TradeGood]) -> Vec<&str> {
        goods.iter().map(|g| g.symbol.as_str()).collect()
    }

    #[test]
    fn test_market_goods_union_dedup_sorted() {
        let m = market("X1-A-1", &["IRON", "FUEL"], &["COPPER"], &["FUEL", "ALUMINUM"]);
        let goods = MarketGoods::from_market(&m);
        assert_eq!(symbols(&goods.sells), vec!["ALUMINUM", "FUEL", "IRON"]);
        assert_eq!(symbols(&goods.buys), vec!["ALUMINUM", "COPPER", "FUEL"]);
    }

    #[test]
    fn test_reverse_index() {
        let mut goods = SystemGoods::default();
        goods.insert("X1-A-2", MarketGoods::from_market(&market("X1-A-2", &["FUEL"], &[], &[])));
        goods.insert("X1-A-1", MarketGoods::from_market(&market("X1-A-1", &["FUEL"], &["IRON"], &[])));

        let fuel = &goods.by_good["FUEL"];
        assert_eq!(fuel.sells, vec!["X1-A-1", "X1-A-2"]);
        assert!(fuel.buys.is_empty());
        assert_eq!(goods.by_good["IRON"].buys, vec!["X1-A-1"]);
        assert_eq!(goods.by_waypoint.len(), 2);
    }
}
