use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A market listing.
///
/// `trade_goods` carries live prices and is only populated while one of the
/// agent's ships is at the waypoint; from afar the server returns it absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub symbol: String,
    #[serde(default)]
    pub exports: Vec<TradeGood>,
    #[serde(default)]
    pub imports: Vec<TradeGood>,
    #[serde(default)]
    pub exchange: Vec<TradeGood>,
    #[serde(default)]
    pub trade_goods: Option<Vec<MarketTradeGood>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeGood {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTradeGood {
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub trade_type: String,
    #[serde(default)]
    pub trade_volume: i64,
    #[serde(default)]
    pub supply: String,
    #[serde(default)]
    pub purchase_price: i64,
    #[serde(default)]
    pub sell_price: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Market {
    /// Goods this market sells: exports plus exchange.
    pub fn sells(&self) -> impl Iterator<Item = &TradeGood> {
        self.exports.iter().chain(self.exchange.iter())
    }

    /// Goods this market buys: imports plus exchange.
    pub fn buys(&self) -> impl Iterator<Item = &TradeGood> {
        self.imports.iter().chain(self.exchange.iter())
    }
}
