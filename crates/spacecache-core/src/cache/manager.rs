use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use super::entry::{age_display, DirtyEntry, MergeEntry, TimedEntry};
use super::key::CacheKey;
use super::merge::{self, SmartMerge};
use super::policy::{self, Freshness, PolicyKind};
use super::store::{CacheDocument, CacheStore};
use crate::api::{Actions, ApiError, ContractAcceptance, Delivery, Extraction, Refuel, Sale, ShipPurchase, Transport};
use crate::models::{Agent, Contract, FlightMode, Market, Ship, ShipNav, Shipyard, Waypoint};

/// How much staleness a caller will tolerate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Demand live status/volatile data even at the cost of a fetch.
    pub need_clean: bool,
    /// Skip the freshness decision and always fetch.
    pub force_refresh: bool,
    /// Store a smart-merge fetch as-is instead of reconciling it.
    pub bypass_merge: bool,
}

impl GetOptions {
    /// Cached data is fine, e.g. for resolving identifiers.
    pub fn cached() -> Self {
        Self::default()
    }

    pub fn clean() -> Self {
        Self {
            need_clean: true,
            ..Self::default()
        }
    }

    pub fn forced() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    /// Always fetch and trust the response completely.
    pub fn accept_fresh() -> Self {
        Self {
            force_refresh: true,
            bypass_merge: true,
            ..Self::default()
        }
    }

    fn apply(self, freshness: Freshness) -> Freshness {
        match freshness {
            Freshness::Hit if self.force_refresh => Freshness::Refresh,
            other => other,
        }
    }
}

/// One row of the cache status listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryStatus {
    pub key: CacheKey,
    pub policy: PolicyKind,
    pub last_updated: Option<DateTime<Utc>>,
    pub age: String,
    pub is_dirty: Option<bool>,
    pub volatile_updated: Option<DateTime<Utc>>,
    pub records: usize,
}

/// Cache facade: per-entity reads, dirty marking and invalidation over a
/// single cache document, fetching through `T` when an entry is not usable.
///
/// Every operation loads the document, decides, fetches at most once,
/// and saves the whole document back.
pub struct CacheManager<T> {
    store: CacheStore,
    transport: T,
}

impl<T> CacheManager<T> {
    pub fn new(store: CacheStore, transport: T) -> Self {
        Self { store, transport }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn persist(&self, document: &CacheDocument) {
        if let Err(e) = self.store.save(document) {
            error!(path = %self.store.path().display(), error = %e, "Failed to save cache");
        }
    }

    fn write<E: Serialize>(&self, mut document: CacheDocument, key: &CacheKey, entry: &E) {
        match document.insert(key, entry) {
            Ok(()) => self.persist(&document),
            Err(e) => error!(key = %key, error = %e, "Failed to encode cache entry"),
        }
    }

    fn mark_dirty(&self, key: &CacheKey) -> bool {
        let mut document = self.store.load();
        if !document.mark_dirty(key) {
            debug!(key = %key, "Nothing cached to mark dirty");
            return false;
        }
        debug!(key = %key, "Marked dirty");
        self.persist(&document);
        true
    }

    /// Mark the ship list stale after a navigation, docking or cargo change.
    pub fn mark_ships_dirty(&self) -> bool {
        self.mark_dirty(&CacheKey::ShipList)
    }

    /// Mark the contract list stale after a negotiate, accept, deliver or fulfill.
    pub fn mark_contracts_dirty(&self) -> bool {
        self.mark_dirty(&CacheKey::ContractList)
    }

    /// Drop one entry so the next read misses.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let mut document = self.store.load();
        if !document.remove(key) {
            return false;
        }
        info!(key = %key, "Invalidated cache entry");
        self.persist(&document);
        true
    }

    /// Drop the whole document, including static entries.
    pub fn clear(&self) -> anyhow::Result<()> {
        info!(path = %self.store.path().display(), "Clearing cache");
        self.store.clear()
    }

    pub fn entries(&self) -> Vec<EntryStatus> {
        let now = Utc::now();
        self.store
            .load()
            .entries()
            .map(|(key, entry)| {
                let last_updated = entry.last_updated();
                EntryStatus {
                    policy: key.policy(),
                    age: last_updated
                        .map(|at| age_display(at, now))
                        .unwrap_or_else(|| "never".to_string()),
                    last_updated,
                    is_dirty: entry.is_dirty(),
                    volatile_updated: entry.volatile_updated(),
                    records: entry.len(),
                    key,
                }
            })
            .collect()
    }

    async fn get_timed<D, F, Fut>(
        &self,
        key: CacheKey,
        opts: GetOptions,
        decide: impl FnOnce(Option<&TimedEntry<D>>, DateTime<Utc>) -> Freshness,
        fetch: F,
    ) -> Result<D, ApiError>
    where
        D: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D, ApiError>>,
    {
        let document = self.store.load();
        let cached: Option<TimedEntry<D>> = document.get(&key);
        let freshness = opts.apply(decide(cached.as_ref(), Utc::now()));

        if let (Freshness::Hit, Some(entry)) = (freshness, cached) {
            debug!(key = %key, "Cache hit");
            return Ok(entry.data);
        }

        info!(key = %key, ?freshness, "Fetching from API");
        let entry = TimedEntry {
            data: fetch().await?,
            last_updated: Some(Utc::now()),
        };
        self.write(document, &key, &entry);
        Ok(entry.data)
    }

    async fn get_dirty<D, F, Fut>(
        &self,
        key: CacheKey,
        opts: GetOptions,
        decide: impl FnOnce(Option<&DirtyEntry<D>>, DateTime<Utc>) -> Freshness,
        fetch: F,
    ) -> Result<D, ApiError>
    where
        D: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D, ApiError>>,
    {
        let document = self.store.load();
        let cached: Option<DirtyEntry<D>> = document.get(&key);
        let freshness = opts.apply(decide(cached.as_ref(), Utc::now()));

        if let (Freshness::Hit, Some(entry)) = (freshness, cached) {
            debug!(key = %key, "Cache hit");
            return Ok(entry.data);
        }

        info!(key = %key, ?freshness, "Fetching from API");
        let entry = DirtyEntry {
            data: fetch().await?,
            last_updated: Some(Utc::now()),
            is_dirty: false,
        };
        self.write(document, &key, &entry);
        Ok(entry.data)
    }

    async fn get_merged<D, F, Fut>(&self, key: CacheKey, opts: GetOptions, fetch: F) -> Result<D, ApiError>
    where
        D: SmartMerge + Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<D, ApiError>>,
    {
        let document = self.store.load();
        let cached: Option<MergeEntry<D>> = document.get(&key);
        let freshness = opts.apply(policy::smart_merge(cached.as_ref(), opts.need_clean));

        let cached = match (freshness, cached) {
            (Freshness::Hit, Some(entry)) => {
                debug!(key = %key, "Cache hit");
                return Ok(entry.data);
            }
            (_, cached) => cached,
        };

        info!(key = %key, ?freshness, "Fetching from API");
        let fresh = fetch().await?;
        let now = Utc::now();
        let reconciled = if opts.bypass_merge {
            merge::accept_fresh(fresh, now)
        } else {
            merge::reconcile(cached, fresh, now)
        };
        debug!(key = %key, outcome = ?reconciled.outcome, "Reconciled fetch with cache");

        let entry = MergeEntry {
            last_updated: Some(now),
            volatile_updated: reconciled.volatile_updated,
            data: reconciled.data,
        };
        self.write(document, &key, &entry);
        Ok(entry.data)
    }
}

impl<T: Transport> CacheManager<T> {
    pub async fn get_agent(&self, opts: GetOptions) -> Result<Agent, ApiError> {
        self.get_timed(
            CacheKey::Agent,
            opts,
            |entry, now| policy::ttl(entry, policy::agent_ttl(), now),
            || self.transport.fetch_agent(),
        )
        .await
    }

    pub async fn get_ships(&self, opts: GetOptions) -> Result<Vec<Ship>, ApiError> {
        self.get_dirty(
            CacheKey::ShipList,
            opts,
            |entry, now| policy::ship_list(entry, opts.need_clean, now),
            || self.transport.fetch_ships(),
        )
        .await
    }

    pub async fn get_contracts(&self, opts: GetOptions) -> Result<Vec<Contract>, ApiError> {
        self.get_dirty(
            CacheKey::ContractList,
            opts,
            |entry, _| policy::dirty_flag(entry),
            || self.transport.fetch_contracts(),
        )
        .await
    }

    pub async fn get_waypoints(&self, system: &str, opts: GetOptions) -> Result<Vec<Waypoint>, ApiError> {
        self.get_timed(
            CacheKey::waypoints(system),
            opts,
            |entry, _| policy::static_entry(entry),
            || self.transport.fetch_waypoints(system),
        )
        .await
    }

    pub async fn get_market(&self, waypoint: &str, opts: GetOptions) -> Result<Market, ApiError> {
        self.get_merged(CacheKey::market(waypoint), opts, || self.transport.fetch_market(waypoint))
            .await
    }

    pub async fn get_shipyard(&self, waypoint: &str, opts: GetOptions) -> Result<Shipyard, ApiError> {
        self.get_merged(CacheKey::shipyard(waypoint), opts, || self.transport.fetch_shipyard(waypoint))
            .await
    }
}

// ===== State-changing actions =====
//
// Each forwards to the API and, on success, marks the list it affects dirty.

impl<T: Actions> CacheManager<T> {
    pub async fn navigate_ship(&self, ship: &str, waypoint: &str) -> Result<ShipNav, ApiError> {
        let nav = self.transport.navigate_ship(ship, waypoint).await?;
        self.mark_ships_dirty();
        Ok(nav)
    }

    pub async fn orbit_ship(&self, ship: &str) -> Result<ShipNav, ApiError> {
        let nav = self.transport.orbit_ship(ship).await?;
        self.mark_ships_dirty();
        Ok(nav)
    }

    pub async fn dock_ship(&self, ship: &str) -> Result<ShipNav, ApiError> {
        let nav = self.transport.dock_ship(ship).await?;
        self.mark_ships_dirty();
        Ok(nav)
    }

    pub async fn set_flight_mode(&self, ship: &str, mode: FlightMode) -> Result<ShipNav, ApiError> {
        let nav = self.transport.set_flight_mode(ship, mode).await?;
        self.mark_ships_dirty();
        Ok(nav)
    }

    pub async fn extract_resources(&self, ship: &str, survey: Option<&Value>) -> Result<Extraction, ApiError> {
        let extraction = self.transport.extract_resources(ship, survey).await?;
        self.mark_ships_dirty();
        Ok(extraction)
    }

    /// Surveying puts the ship on cooldown.
    pub async fn create_survey(&self, ship: &str) -> Result<Vec<Value>, ApiError> {
        let surveys = self.transport.create_survey(ship).await?;
        self.mark_ships_dirty();
        Ok(surveys)
    }

    pub async fn refine_materials(&self, ship: &str, produce: &str) -> Result<Value, ApiError> {
        let refined = self.transport.refine_materials(ship, produce).await?;
        self.mark_ships_dirty();
        Ok(refined)
    }

    pub async fn refuel_ship(&self, ship: &str, units: Option<u32>) -> Result<Refuel, ApiError> {
        let refuel = self.transport.refuel_ship(ship, units).await?;
        self.mark_ships_dirty();
        Ok(refuel)
    }

    pub async fn jettison_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Value, ApiError> {
        let cargo = self.transport.jettison_cargo(ship, trade_symbol, units).await?;
        self.mark_ships_dirty();
        Ok(cargo)
    }

    pub async fn sell_cargo(&self, ship: &str, trade_symbol: &str, units: u32) -> Result<Sale, ApiError> {
        let sale = self.transport.sell_cargo(ship, trade_symbol, units).await?;
        self.mark_ships_dirty();
        Ok(sale)
    }

    /// A new ship joins the fleet.
    pub async fn purchase_ship(&self, ship_type: &str, waypoint: &str) -> Result<ShipPurchase, ApiError> {
        let purchase = self.transport.purchase_ship(ship_type, waypoint).await?;
        self.mark_ships_dirty();
        Ok(purchase)
    }

    pub async fn negotiate_contract(&self, ship: &str) -> Result<Contract, ApiError> {
        let contract = self.transport.negotiate_contract(ship).await?;
        self.mark_contracts_dirty();
        Ok(contract)
    }

    pub async fn accept_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError> {
        let accepted = self.transport.accept_contract(contract_id).await?;
        self.mark_contracts_dirty();
        Ok(accepted)
    }

    /// Delivering moves cargo off the ship, so both lists go stale.
    pub async fn deliver_contract(
        &self,
        contract_id: &str,
        ship: &str,
        trade_symbol: &str,
        units: u32,
    ) -> Result<Delivery, ApiError> {
        let delivery = self
            .transport
            .deliver_contract(contract_id, ship, trade_symbol, units)
            .await?;
        self.mark_contracts_dirty();
        self.mark_ships_dirty();
        Ok(delivery)
    }

    pub async fn fulfill_contract(&self, contract_id: &str) -> Result<ContractAcceptance, ApiError> {
        let fulfilled = self.transport.fulfill_contract(contract_id).await?;
        self.mark_contracts_dirty();
        Ok(fulfilled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_options_apply() {
        assert_eq!(GetOptions::cached().apply(Freshness::Hit), Freshness::Hit);
        assert_eq!(GetOptions::forced().apply(Freshness::Hit), Freshness::Refresh);
        assert_eq!(GetOptions::forced().apply(Freshness::Miss), Freshness::Miss);
        assert_eq!(GetOptions::clean().apply(Freshness::Refresh), Freshness::Refresh);
    }

    #[test]
    fn test_accept_fresh_forces_fetch() {
        let opts = GetOptions::accept_fresh();
        assert!(opts.force_refresh);
        assert!(opts.bypass_merge);
        assert!(!opts.need_clean);
    }
}
