//! Identifier resolution and client-side queries over cached data.
//!
//! Commands accept either a full symbol or a 0-based index into a sorted
//! list. Resolving an index reads the list with `need_clean = false`, since
//! symbols and ordering never depend on live status.

use thiserror::Error;
use tracing::info;

use super::manager::{CacheManager, GetOptions};
use crate::api::{ApiError, Transport};
use crate::models::Waypoint;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid index '{index}'. Valid indexes are 0 to {}", .len.saturating_sub(1))]
    IndexOutOfRange { index: String, len: usize },

    #[error("Nothing to index: the list is empty")]
    Empty,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Parse `arg` as an index if it is all digits.
fn as_index(arg: &str) -> Option<&str> {
    (!arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit())).then_some(arg)
}

/// Pick the `index`th symbol, or fail with the valid range.
fn pick(mut symbols: Vec<String>, index: &str) -> Result<String, ResolveError> {
    if symbols.is_empty() {
        return Err(ResolveError::Empty);
    }
    symbols.sort();
    let len = symbols.len();
    index
        .parse::<usize>()
        .ok()
        .filter(|&i| i < len)
        .map(|i| symbols.swap_remove(i))
        .ok_or_else(|| ResolveError::IndexOutOfRange {
            index: index.to_string(),
            len,
        })
}

impl<T: Transport> CacheManager<T> {
    /// Resolve a ship argument: a full symbol is returned as-is, a number
    /// indexes the fleet sorted by symbol.
    pub async fn resolve_ship_symbol(&self, arg: &str) -> Result<String, ResolveError> {
        let Some(index) = as_index(arg) else {
            return Ok(arg.to_string());
        };

        let ships = self.get_ships(GetOptions::cached()).await?;
        let symbol = pick(ships.into_iter().map(|s| s.symbol).collect(), index)?;
        info!(index = index, symbol = %symbol, "Resolved ship index");
        Ok(symbol)
    }

    /// Resolve a waypoint argument within `system`, the same way as ships.
    pub async fn resolve_waypoint_symbol(&self, system: &str, arg: &str) -> Result<String, ResolveError> {
        let Some(index) = as_index(arg) else {
            return Ok(arg.to_string());
        };

        let waypoints = self.get_waypoints(system, GetOptions::cached()).await?;
        let symbol = pick(waypoints.into_iter().map(|w| w.symbol).collect(), index)?;
        info!(index = index, symbol = %symbol, "Resolved waypoint index");
        Ok(symbol)
    }

    /// The system containing the agent's headquarters.
    pub async fn default_system(&self) -> Result<String, ApiError> {
        let agent = self.get_agent(GetOptions::cached()).await?;
        Ok(agent.home_system().to_string())
    }

    /// Waypoints in `system` carrying every one of `traits`.
    pub async fn waypoints_with_traits(&self, system: &str, traits: &[String]) -> Result<Vec<Waypoint>, ApiError> {
        let waypoints = self.get_waypoints(system, GetOptions::cached()).await?;
        Ok(waypoints
            .into_iter()
            .filter(|w| traits.iter().all(|t| w.has_trait(t)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_as_index() {
        assert_eq!(as_index("0"), Some("0"));
        assert_eq!(as_index("12"), Some("12"));
        assert_eq!(as_index(""), None);
        assert_eq!(as_index("-1"), None);
        assert_eq!(as_index("FOO-1"), None);
    }

    #[test]
    fn test_pick_sorts_before_indexing() {
        let list = symbols(&["FOO-3", "FOO-1", "FOO-2"]);
        assert_eq!(pick(list.clone(), "0").expect("in range"), "FOO-1");
        assert_eq!(pick(list, "2").expect("in range"), "FOO-3");
    }

    #[test]
    fn test_pick_out_of_range() {
        let err = pick(symbols(&["FOO-1", "FOO-2"]), "2").expect_err("out of range");
        assert!(matches!(err, ResolveError::IndexOutOfRange { len: 2, .. }));
        assert_eq!(err.to_string(), "Invalid index '2'. Valid indexes are 0 to 1");
    }

    #[test]
    fn test_pick_overflowing_index_is_out_of_range() {
        let err = pick(symbols(&["FOO-1"]), "99999999999999999999999").expect_err("out of range");
        assert!(matches!(err, ResolveError::IndexOutOfRange { .. }));
    }

    #[test]
    fn test_pick_empty() {
        assert!(matches!(pick(Vec::new(), "0"), Err(ResolveError::Empty)));
    }
}
