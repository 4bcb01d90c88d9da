//! Freshness decisions, one rule per policy kind.
//!
//! Every rule is a pure function of the cached entry (if any), the caller's
//! `need_clean` hint and the current time, so the facade can decide before
//! touching the network.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use super::entry::{DirtyEntry, MergeEntry, TimedEntry};
use crate::models::Ship;

/// Agent info is considered stale after 1 hour.
/// Credits and ship count change often but are rarely needed to the minute.
pub const AGENT_TTL_MINUTES: i64 = 60;

pub fn agent_ttl() -> Duration {
    Duration::minutes(AGENT_TTL_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Expires a fixed time after the last refresh.
    Ttl,
    /// Expires when a local mutation marks it dirty.
    Dirty,
    /// Dirty flag, plus expiry when a cached ship has arrived.
    DirtyArrival,
    /// Never expires.
    Static,
    /// Refreshes the volatile field on demand and merges.
    SmartMerge,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PolicyKind::Ttl => "ttl",
            PolicyKind::Dirty => "dirty-flag",
            PolicyKind::DirtyArrival => "dirty-flag+arrival",
            PolicyKind::Static => "static",
            PolicyKind::SmartMerge => "smart-merge",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve the cached data as-is.
    Hit,
    /// Nothing cached; fetch.
    Miss,
    /// Cached but stale; fetch and write back.
    Refresh,
}

pub fn ttl<T>(entry: Option<&TimedEntry<T>>, ttl: Duration, now: DateTime<Utc>) -> Freshness {
    match entry {
        None => Freshness::Miss,
        Some(TimedEntry { last_updated: Some(at), .. }) if now - *at <= ttl => Freshness::Hit,
        Some(_) => Freshness::Refresh,
    }
}

pub fn dirty_flag<T>(entry: Option<&DirtyEntry<T>>) -> Freshness {
    match entry {
        None => Freshness::Miss,
        Some(e) if e.is_dirty => Freshness::Refresh,
        Some(_) => Freshness::Hit,
    }
}

/// Dirty flag for the ship list, plus the arrival override: when the caller
/// needs live status, any ship still cached as in transit past its arrival
/// time forces a refresh of the whole list.
pub fn ship_list(entry: Option<&DirtyEntry<Vec<Ship>>>, need_clean: bool, now: DateTime<Utc>) -> Freshness {
    match dirty_flag(entry) {
        Freshness::Hit if need_clean && entry.is_some_and(|e| e.data.iter().any(|s| s.is_overdue(now))) => {
            Freshness::Refresh
        }
        freshness => freshness,
    }
}

pub fn static_entry<T>(entry: Option<&TimedEntry<T>>) -> Freshness {
    match entry {
        None => Freshness::Miss,
        Some(_) => Freshness::Hit,
    }
}

/// Staleness of a volatile field is positional, not temporal: the server
/// only returns it near a ship, so elapsed time says nothing about it.
pub fn smart_merge<T>(entry: Option<&MergeEntry<T>>, need_clean: bool) -> Freshness {
    match entry {
        None => Freshness::Miss,
        Some(_) if need_clean => Freshness::Refresh,
        Some(_) => Freshness::Hit,
    }
}
