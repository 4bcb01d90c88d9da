//! Subcommands and their dispatch.
//!
//! Commands print JSON on stdout. Ship and waypoint arguments accept either a
//! full symbol or a 0-based index into the sorted list.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

use spacecache_core::api::{Actions, Transport};
use spacecache_core::cache::{CacheKey, CacheManager, GetOptions};
use spacecache_core::models::FlightMode;
use spacecache_core::Config;

/// Top-level commands. `config` runs without an API client.
#[derive(Subcommand, Debug)]
pub enum TopCommand {
    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    #[command(flatten)]
    Api(Command),
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the agent (refreshed hourly)
    Agent {
        /// Fetch even if the cached copy is recent
        #[arg(long)]
        refresh: bool,
    },

    /// List ships, refreshing once a cached ship should have arrived
    Ships {
        /// Use the cached list even if a ship's arrival time has passed
        #[arg(long)]
        cached: bool,

        /// Fetch even if nothing has changed locally
        #[arg(long)]
        refresh: bool,
    },

    /// List contracts
    Contracts {
        #[arg(long)]
        refresh: bool,
    },

    /// List waypoints in a system (cached permanently)
    Waypoints {
        /// System symbol (defaults to the headquarters system)
        #[arg(long)]
        system: Option<String>,

        /// Only waypoints with this trait; repeat to require several
        #[arg(long = "trait", value_name = "TRAIT")]
        traits: Vec<String>,
    },

    /// Show a market, keeping prices seen earlier if the server omits them
    Market {
        /// Waypoint symbol or index
        waypoint: String,

        #[arg(long)]
        system: Option<String>,

        /// Use the cached copy if there is one
        #[arg(long, conflicts_with = "replace")]
        cached: bool,

        /// Store the response as-is, dropping any cached prices
        #[arg(long)]
        replace: bool,
    },

    /// Show a shipyard, keeping listings seen earlier if the server omits them
    Shipyard {
        /// Waypoint symbol or index
        waypoint: String,

        #[arg(long)]
        system: Option<String>,

        #[arg(long, conflicts_with = "replace")]
        cached: bool,

        #[arg(long)]
        replace: bool,
    },

    /// Goods bought and sold across every market in a system
    Goods {
        #[arg(long)]
        system: Option<String>,
    },

    /// Navigate a ship to a waypoint
    Navigate { ship: String, waypoint: String },

    /// Move a ship into orbit
    Orbit { ship: String },

    /// Dock a ship
    Dock { ship: String },

    /// Set a ship's flight mode (drift, stealth, cruise or burn)
    FlightMode { ship: String, mode: FlightMode },

    /// Extract resources at the ship's location
    Extract {
        ship: String,

        /// Survey to target, as the JSON object returned by `survey`
        #[arg(long)]
        survey: Option<String>,
    },

    /// Survey the ship's location
    Survey { ship: String },

    /// Refine raw cargo into a good
    Refine { ship: String, produce: String },

    /// Refuel a ship at its docked market
    Refuel {
        ship: String,

        /// Units of fuel to buy; fills the tank if omitted
        #[arg(long)]
        units: Option<u32>,
    },

    /// Jettison cargo into space
    Jettison {
        ship: String,
        trade_symbol: String,
        units: u32,
    },

    /// Sell cargo at the ship's docked market
    Sell {
        ship: String,
        trade_symbol: String,
        units: u32,
    },

    /// Buy a ship at a shipyard
    Purchase { ship_type: String, waypoint: String },

    /// Contract actions
    Contract {
        #[command(subcommand)]
        action: ContractCommand,
    },

    /// Inspect or reset the local cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file path and its contents, token masked
    Show,
    /// Save the agent token
    SetToken {
        #[arg(value_name = "TOKEN")]
        agent_token: String,
    },
    /// Save the API base URL
    SetBaseUrl { url: String },
    /// Save the cache file location
    SetCacheFile { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum ContractCommand {
    /// Negotiate a new contract at the ship's location
    Negotiate { ship: String },
    Accept { id: String },
    /// Deliver cargo towards a contract
    Deliver {
        id: String,
        ship: String,
        trade_symbol: String,
        units: u32,
    },
    Fulfill { id: String },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached entries with their policy and age
    Status,
    /// Delete every cached entry
    Clear,
    /// Delete one entry, e.g. `ship_list` or `market_X1-ABC-A1`
    Invalidate { key: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn refresh_opts(refresh: bool) -> GetOptions {
    if refresh {
        GetOptions::forced()
    } else {
        GetOptions::cached()
    }
}

/// The ship list honours arrival times unless `--cached` is given.
fn ships_opts(cached: bool, refresh: bool) -> GetOptions {
    GetOptions {
        need_clean: !cached,
        ..refresh_opts(refresh)
    }
}

/// Markets and shipyards fetch by default: their volatile data is only
/// worth showing if it is as live as the server will give it.
fn listing_opts(cached: bool, replace: bool) -> GetOptions {
    if replace {
        GetOptions::accept_fresh()
    } else if cached {
        GetOptions::cached()
    } else {
        GetOptions::forced()
    }
}

async fn system_or_default<T: Transport>(cache: &CacheManager<T>, system: Option<String>) -> Result<String> {
    match system {
        Some(system) => Ok(system),
        None => cache.default_system().await.context("Failed to determine headquarters system"),
    }
}

pub async fn run<T: Transport + Actions>(cache: &CacheManager<T>, command: Command) -> Result<()> {
    match command {
        Command::Agent { refresh } => print_json(&cache.get_agent(refresh_opts(refresh)).await?),
        Command::Ships { cached, refresh } => print_json(&cache.get_ships(ships_opts(cached, refresh)).await?),
        Command::Contracts { refresh } => print_json(&cache.get_contracts(refresh_opts(refresh)).await?),
        Command::Waypoints { system, traits } => {
            let system = system_or_default(cache, system).await?;
            print_json(&cache.waypoints_with_traits(&system, &traits).await?)
        }
        Command::Market {
            waypoint,
            system,
            cached,
            replace,
        } => {
            let system = system_or_default(cache, system).await?;
            let waypoint = cache.resolve_waypoint_symbol(&system, &waypoint).await?;
            print_json(&cache.get_market(&waypoint, listing_opts(cached, replace)).await?)
        }
        Command::Shipyard {
            waypoint,
            system,
            cached,
            replace,
        } => {
            let system = system_or_default(cache, system).await?;
            let waypoint = cache.resolve_waypoint_symbol(&system, &waypoint).await?;
            print_json(&cache.get_shipyard(&waypoint, listing_opts(cached, replace)).await?)
        }
        Command::Goods { system } => {
            let system = system_or_default(cache, system).await?;
            print_json(&cache.system_goods(&system).await?)
        }
        Command::Navigate { ship, waypoint } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            let system = system_or_default(cache, None).await?;
            let waypoint = cache.resolve_waypoint_symbol(&system, &waypoint).await?;
            print_json(&cache.navigate_ship(&ship, &waypoint).await?)
        }
        Command::Orbit { ship } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.orbit_ship(&ship).await?)
        }
        Command::Dock { ship } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.dock_ship(&ship).await?)
        }
        Command::FlightMode { ship, mode } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.set_flight_mode(&ship, mode).await?)
        }
        Command::Extract { ship, survey } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            let survey = survey.as_deref().map(parse_survey).transpose()?;
            print_json(&cache.extract_resources(&ship, survey.as_ref()).await?)
        }
        Command::Survey { ship } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.create_survey(&ship).await?)
        }
        Command::Refine { ship, produce } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.refine_materials(&ship, &produce).await?)
        }
        Command::Refuel { ship, units } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.refuel_ship(&ship, units).await?)
        }
        Command::Jettison {
            ship,
            trade_symbol,
            units,
        } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.jettison_cargo(&ship, &trade_symbol, units).await?)
        }
        Command::Sell {
            ship,
            trade_symbol,
            units,
        } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.sell_cargo(&ship, &trade_symbol, units).await?)
        }
        Command::Purchase { ship_type, waypoint } => {
            let system = system_or_default(cache, None).await?;
            let waypoint = cache.resolve_waypoint_symbol(&system, &waypoint).await?;
            print_json(&cache.purchase_ship(&ship_type, &waypoint).await?)
        }
        Command::Contract { action } => run_contract(cache, action).await,
        Command::Cache { action } => run_cache(cache, action),
    }
}

async fn run_contract<T: Transport + Actions>(cache: &CacheManager<T>, action: ContractCommand) -> Result<()> {
    match action {
        ContractCommand::Negotiate { ship } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.negotiate_contract(&ship).await?)
        }
        ContractCommand::Accept { id } => print_json(&cache.accept_contract(&id).await?),
        ContractCommand::Deliver {
            id,
            ship,
            trade_symbol,
            units,
        } => {
            let ship = cache.resolve_ship_symbol(&ship).await?;
            print_json(&cache.deliver_contract(&id, &ship, &trade_symbol, units).await?)
        }
        ContractCommand::Fulfill { id } => print_json(&cache.fulfill_contract(&id).await?),
    }
}

fn parse_survey(raw: &str) -> Result<Value> {
    let survey: Value = serde_json::from_str(raw).context("Survey must be a JSON object")?;
    if !survey.is_object() {
        bail!("Survey must be a JSON object");
    }
    Ok(survey)
}

/// Last four characters only.
fn mask_token(token: &str) -> String {
    let len = token.chars().count();
    let tail: String = token.chars().skip(len.saturating_sub(4)).collect();
    format!("****{}", tail)
}

pub fn run_config(mut config: Config, action: ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Show => {
            println!("{}", Config::config_path()?.display());
            let shown = Config {
                token: config.token.as_deref().map(mask_token),
                ..config
            };
            print_json(&shown)
        }
        ConfigCommand::SetToken { agent_token } => {
            if agent_token.trim().is_empty() {
                bail!("Token must not be blank");
            }
            config.token = Some(agent_token);
            save_config(&config)
        }
        ConfigCommand::SetBaseUrl { url } => {
            config.base_url = Some(url);
            save_config(&config)
        }
        ConfigCommand::SetCacheFile { path } => {
            config.cache_file = Some(path);
            save_config(&config)
        }
    }
}

fn save_config(config: &Config) -> Result<()> {
    config.save().context("Failed to save configuration")?;
    println!("Saved {}", Config::config_path()?.display());
    Ok(())
}

fn run_cache<T>(cache: &CacheManager<T>, action: CacheCommand) -> Result<()> {
    match action {
        CacheCommand::Status => {
            println!("{}", cache.store().path().display());
            for entry in cache.entries() {
                let mut line = format!(
                    "{:<32} {:<20} {:>6} records  {}",
                    entry.key.to_string(),
                    entry.policy.to_string(),
                    entry.records,
                    entry.age
                );
                if entry.is_dirty == Some(true) {
                    line.push_str("  dirty");
                }
                if let Some(at) = entry.volatile_updated {
                    line.push_str(&format!("  live data {}", at.to_rfc3339()));
                }
                println!("{}", line);
            }
            Ok(())
        }
        CacheCommand::Clear => cache.clear(),
        CacheCommand::Invalidate { key } => {
            let Some(parsed) = CacheKey::parse(&key) else {
                bail!("Unknown cache key: {}", key);
            };
            if !cache.invalidate(&parsed) {
                println!("{} was not cached", key);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_opts() {
        assert_eq!(listing_opts(false, false), GetOptions::forced());
        assert_eq!(listing_opts(true, false), GetOptions::cached());
        assert_eq!(listing_opts(false, true), GetOptions::accept_fresh());
    }

    #[test]
    fn test_ships_opts_honour_arrivals_by_default() {
        assert_eq!(ships_opts(false, false), GetOptions::clean());
        assert_eq!(ships_opts(true, false), GetOptions::cached());
        let forced = ships_opts(false, true);
        assert!(forced.need_clean && forced.force_refresh);
    }

    #[test]
    fn test_parse_survey() {
        let survey = parse_survey(r#"{"signature":"X1-A-1-BD5F1E","size":"SMALL"}"#).expect("object");
        assert_eq!(survey["signature"], "X1-A-1-BD5F1E");
        assert!(parse_survey("[1, 2]").is_err());
        assert!(parse_survey("not json").is_err());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJSUzI1NiJ9.abcd"), "****abcd");
        assert_eq!(mask_token("ab"), "****ab");
    }

    #[test]
    fn test_refresh_opts() {
        assert!(refresh_opts(true).force_refresh);
        assert!(!refresh_opts(false).force_refresh);
    }
}
