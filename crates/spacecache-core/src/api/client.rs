//! API client for communicating with the SpaceTraders REST API.
//!
//! This module provides the `ApiClient` struct, which implements the cache
//! engine's `Transport` and the state-changing `Actions`.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::transport::{Actions, ContractAcceptance, Delivery, Extraction, Refuel, Sale, ShipPurchase, Transport};
use super::ApiError;
use crate::models::{system_symbol, Agent, Contract, FlightMode, Market, Ship, ShipNav, Shipyard, Waypoint};

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the v2 API
pub const DEFAULT_BASE_URL: &str = "https://api.spacetraders.io/v2";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size for list endpoints. 20 is the server maximum.
const PAGE_LIMIT: u32 = 20;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// The server allows 2 requests per second with a short burst.
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct PageMeta {
    total: u32,
    page: u32,
    limit: u32,
}

impl PageMeta {
    fn has_more(&self) -> bool {
        self.page.saturating_mul(self.limit) < self.total
    }
}

#[derive(Debug, Deserialize)]
struct NavResponse {
    nav: ShipNav,
}

#[derive(Debug, Deserialize)]
struct ContractResponse {
    contract: Contract,
}

#[derive(Debug, Deserialize)]
struct SurveyResponse {
    surveys: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CargoResponse {
    cargo: Value,
}

/// API client for SpaceTraders.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidResponse("token contains invalid header characters".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Send a request, backing off and retrying on 429.
    /// Returns the parsed `{ "data": ..., "meta": ... }` envelope.
    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut builder = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers()?)
                .query(query);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;

            let status = response.status();
            if status.is_success() {
                let text = response.text().await?;
                return serde_json::from_str(&text).map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
                });
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.request::<T, ()>(Method::GET, path, &[], None).await?;
        Ok(envelope.data)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.request(Method::POST, path, &[], body).await?;
        Ok(envelope.data)
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.request(Method::PATCH, path, &[], Some(body)).await?;
        Ok(envelope.data)
    }

    /// Walk every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let query = [("page", page.to_string()), ("limit", PAGE_LIMIT.to_string())];
            let envelope: Envelope<Vec<T>> = self.request::<Vec<T>, ()>(Method::GET, path, &query, None).await?;
            let received = envelope.data.len();
            items.extend(envelope.data);

            match envelope.meta {
                Some(meta) if meta.has_more() && received > 0 => page += 1,
                _ => break,
            }
        }

        debug!(path = path, count = items.len(), pages = page, "Fetched paginated list");
        Ok(items)
    }
}

impl Transport for ApiClient {
    async fn fetch_agent(&self) -> Result<Agent, ApiError> {
        self.get("/my/agent").await
    }

    async fn fetch_ships(&self) -> Result<Vec<Ship>, ApiError> {
        self.get_all("/my/ships").await
    }

    async fn fetch_contracts(&self) -> Result<Vec<Contract>, ApiError> {
        self.get_all("/my/contracts").await
    }

    async fn fetch_waypoints(&self, system: &str) -> Result<Vec<Waypoint>, ApiError> {
        self.get_all(&format!("/systems/{}/waypoints", system)).await
    }

    async fn fetch_market(&self, waypoint: &str) -> Result<Market, ApiError> {
        let path = format!("/systems/{}/waypoints/{}/market", system_symbol(waypoint), waypoint);
        self.get(&path).await
    }

    async fn fetch_shipyard(&self, waypoint: &str) -> Result<Shipyard, ApiError> {
        let path = format!("/systems/{}/waypoints/{}/shipyard", system_symbol(waypoint), waypoint);
        self.get(&path).await
    }
}

impl Actions for ApiClient {
    async fn navigate_ship(&self, ship: &str, waypoint: &str) -> Result<ShipNav, ApiError> {
        let body = json!({ "waypointSymbol": waypoint });
        let response: NavResponse = self.post(&format!("/my/ships/{}/navigate", ship), Some(&body)).await?;
        Ok(response.nav)
    }

    async fn orbit_ship(&self, ship: &str) -> Result<ShipNav, ApiError> {
        let response: NavResponse = self.post::<_, ()>(&format!("/my/ships/{}/orbit", ship), None).await?;
        Ok(response.nav)
    }

    async fn dock_ship(&self, ship: &str) -> Result<ShipNav, ApiError> {
        let response: NavResponse = self.post::<_, ()>(&format!("/my/ships/{}/dock", ship), None).await?;
        Ok(response.nav)
    }

    async fn set_flight_mode(&self, ship: &str, mode: FlightMode) -> Result<ShipNav, ApiError> {
        let body = json!({ "flightMode": mode });
        let response: NavResponse = self.patch(&format!("/my/ships/{}/nav", ship), &body).await?;
        Ok(response.nav)
    }

    async fn extract_resources(&self, ship: &str, survey: Option<&Value>) -> Result<Extraction, ApiError> {
        match survey {
            Some(survey) => self.post(&format!("/my/ships/{}/extract/survey", ship), Some(survey)).await,
            None => self.post::<_, ()>(&format!("/my/ships/{}/extract", ship), None).await,
        }
    }

    async fn create_survey(&self, ship: &str) -> Result<Vec<Value>, ApiError> {
        let response: SurveyResponse = self.post::<_, ()>(&format!("/my/ships/{}/survey", ship), None).await?;
        Ok(response.surveys)
    }

    async fn refine_materials(&self, ship: &str, produce: &str) -> Result<Value, ApiError> {
        let body = json!({ "produce": produce });
        self.post(&format!("/my/ships/{}/refine", ship), Some(&body)).await
    }

    async fn refuel_ship(&self, ship: &str, units: Option<u32>) -> Result<Refuel, ApiError> {
        let body = match units {
            Some(units) => json!({ "units": units }),
            None => json!({}),
        };
        self.post(&format!("/my/ships/{}/refuel", ship), Some(&body)).await
    }

    async fn jettison_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Value, ApiError> {
        let body = json!({ "symbol": trade_symbol, "units": units });
        let response: CargoResponse = self.post(&format!("/my/ships/{}/jettison", ship), Some(&body)).await?;
        Ok(response.cargo)
    }

    async fn sell_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Sale, ApiError> {
        let body = json!({ "symbol": trade_symbol, "units": units });
        self.post(&format!("/my/ships/{}/sell", ship), Some(&body)).await
    }

    async fn purchase_ship(&self, ship_type: &str, waypoint: &str) -> Result<ShipPurchase, ApiError> {
        let body = json!({ "shipType": ship_type, "waypointSymbol": waypoint });
        self.post("/my/ships", Some(&body)).await
    }

    async fn negotiate_contract(&self, ship: &str) -> Result<Contract, ApiError> {
        let response: ContractResponse = self
            .post::<_, ()>(&format!("/my/ships/{}/negotiate/contract", ship), None)
            .await?;
        Ok(response.contract)
    }

    async fn accept_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError> {
        self.post::<_, ()>(&format!("/my/contracts/{}/accept", contract_id), None).await
    }

    async fn deliver_contract(
        &self,
        contract_id: &str,
        ship: &str,
        trade_symbol: &str,
        units: u32,
    ) -> Result<Delivery, ApiError> {
        let body = json!({
            "shipSymbol": ship,
            "tradeSymbol": trade_symbol,
            "units": units,
        });
        self.post(&format!("/my/contracts/{}/deliver", contract_id), Some(&body)).await
    }

    async fn fulfill_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError> {
        self.post::<_, ()>(&format!("/my/contracts/{}/fulfill", contract_id), None).await
    }
}
