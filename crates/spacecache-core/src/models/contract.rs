use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    pub faction_symbol: String,
    #[serde(rename = "type")]
    pub contract_type: String,
    pub terms: ContractTerms,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub fulfilled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_to_accept: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractTerms {
    pub deadline: DateTime<Utc>,
    pub payment: ContractPayment,
    #[serde(default)]
    pub deliver: Vec<ContractDeliverGood>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPayment {
    pub on_accepted: i64,
    pub on_fulfilled: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDeliverGood {
    pub trade_symbol: String,
    pub destination_symbol: String,
    pub units_required: i64,
    pub units_fulfilled: i64,
}

impl Contract {
    /// Short lifecycle label: open, accepted, or fulfilled.
    pub fn status_label(&self) -> &'static str {
        if self.fulfilled {
            "fulfilled"
        } else if self.accepted {
            "accepted"
        } else {
            "open"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contract() {
        let json = r#"{"id":"contract-1","factionSymbol":"COSMIC","type":"PROCUREMENT",
            "terms":{"deadline":"2023-12-31T23:59:59Z","payment":{"onAccepted":1000,"onFulfilled":5000},
                     "deliver":[{"tradeSymbol":"IRON_ORE","destinationSymbol":"X1-ABC-1","unitsRequired":30,"unitsFulfilled":0}]},
            "accepted":false,"fulfilled":false,"expiration":"2023-12-31T23:59:59Z"}"#;
        let contract: Contract = serde_json::from_str(json).expect("contract should parse");
        assert_eq!(contract.contract_type, "PROCUREMENT");
        assert_eq!(contract.terms.payment.on_fulfilled, 5000);
        assert_eq!(contract.terms.deliver[0].trade_symbol, "IRON_ORE");
        assert_eq!(contract.status_label(), "open");
        assert_eq!(contract.extra["expiration"], "2023-12-31T23:59:59Z");
    }
}
