//! Persistent on-disk cache of the last radius market download.
//!
//! The file layout is shared with earlier releases, so field names stay in
//! their original camelCase/snake_case mix.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::domain::entities::{CommodityOffer, PadSize, StationMarket, SystemMarketGroup};
use crate::util::persistence::PersistSaveError;

const SNAPSHOT_FILENAME: &str = "local_sellers_data.json";

/// One price line as stored on disk. Export lines carry `stock`, import lines
/// carry `demand`; both mirror the raw quantity in `quantity_at_station`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotOffer {
    #[serde(rename = "commodityName")]
    pub commodity_name: String,
    #[serde(rename = "commodity_localised", default)]
    pub commodity_localised: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub demand: i64,
    #[serde(rename = "quantity_at_station", default)]
    pub quantity_at_station: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotStationDetails {
    #[serde(rename = "maxLandingPadSize", default)]
    pub max_landing_pad_size: Option<String>,
    #[serde(rename = "distanceToArrival", default)]
    pub distance_to_arrival: Option<f64>,
    #[serde(rename = "stationType", default)]
    pub station_type: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SnapshotStation {
    #[serde(default)]
    pub sells_to_player: Vec<SnapshotOffer>,
    #[serde(default)]
    pub buys_from_player: Vec<SnapshotOffer>,
    #[serde(default)]
    pub details: SnapshotStationDetails,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotSystemMarkets {
    pub distance: f64,
    pub stations_data: HashMap<String, SnapshotStation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotSystemDistance {
    pub distance: f64,
}

/// Everything one radius download produced, keyed the way the file stores it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalMarketSnapshot {
    #[serde(rename = "sourceSystem")]
    pub source_system: String,
    pub radius: f64,
    /// Every system found in the radius, with its distance, whether or not it
    /// ended up with market data.
    pub systems: HashMap<String, SnapshotSystemDistance>,
    pub station_markets: HashMap<String, SnapshotSystemMarkets>,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl LocalMarketSnapshot {
    pub fn is_fresh(&self, max_age_days: i64) -> bool {
        OffsetDateTime::now_utc() - self.updated_at < Duration::days(max_age_days)
    }

    /// Whether this snapshot can answer a query without refetching: same
    /// source system, at least the requested radius, and young enough.
    pub fn covers(&self, system: &str, radius_ly: f64, max_age_days: i64) -> bool {
        self.source_system == system && self.radius >= radius_ly && self.is_fresh(max_age_days)
    }

    /// Validated domain view of the snapshot. Offers that fail validation
    /// (zero price or quantity) are dropped here, not at matching time.
    pub fn to_groups(&self) -> Vec<SystemMarketGroup> {
        let mut groups = Vec::with_capacity(self.station_markets.len());
        for (system_name, markets) in &self.station_markets {
            let mut stations = HashMap::with_capacity(markets.stations_data.len());
            for (station_name, record) in &markets.stations_data {
                stations.insert(
                    station_name.clone(),
                    StationMarket {
                        system_name: system_name.clone(),
                        station_name: station_name.clone(),
                        sells_to_player: offers_from(&record.sells_to_player, OfferSide::Export),
                        buys_from_player: offers_from(&record.buys_from_player, OfferSide::Import),
                        station_type: record
                            .details
                            .station_type
                            .clone()
                            .unwrap_or_else(|| "Unknown".to_string()),
                        max_landing_pad: record
                            .details
                            .max_landing_pad_size
                            .as_deref()
                            .and_then(PadSize::from_code),
                        distance_to_arrival_ls: record.details.distance_to_arrival,
                    },
                );
            }
            groups.push(SystemMarketGroup {
                system_name: system_name.clone(),
                distance_ly: markets.distance,
                stations,
            });
        }
        groups
    }

    /// Build a snapshot record from freshly fetched groups.
    pub fn from_groups(source_system: &str, radius_ly: f64, groups: &[SystemMarketGroup]) -> Self {
        let mut systems = HashMap::with_capacity(groups.len());
        let mut station_markets = HashMap::new();
        for group in groups {
            systems.insert(
                group.system_name.clone(),
                SnapshotSystemDistance {
                    distance: group.distance_ly,
                },
            );
            let stations_data: HashMap<String, SnapshotStation> = group
                .stations
                .values()
                .filter(|s| !s.sells_to_player.is_empty() || !s.buys_from_player.is_empty())
                .map(|s| (s.station_name.clone(), snapshot_station(s)))
                .collect();
            if !stations_data.is_empty() {
                station_markets.insert(
                    group.system_name.clone(),
                    SnapshotSystemMarkets {
                        distance: group.distance_ly,
                        stations_data,
                    },
                );
            }
        }
        Self {
            source_system: source_system.to_string(),
            radius: radius_ly,
            systems,
            station_markets,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

enum OfferSide {
    Export,
    Import,
}

fn offers_from(records: &[SnapshotOffer], side: OfferSide) -> Vec<CommodityOffer> {
    records
        .iter()
        .filter_map(|r| {
            let quantity = match side {
                OfferSide::Export => r.stock.max(r.quantity_at_station),
                OfferSide::Import => r.demand.max(r.quantity_at_station),
            };
            let display = r
                .commodity_localised
                .as_deref()
                .unwrap_or(&r.commodity_name);
            CommodityOffer::tradable(&r.commodity_name, display, r.price, quantity)
        })
        .collect()
}

fn snapshot_station(market: &StationMarket) -> SnapshotStation {
    let to_record = |offer: &CommodityOffer, export: bool| SnapshotOffer {
        commodity_name: offer.commodity_id.clone(),
        commodity_localised: Some(offer.display_name.clone()),
        price: offer.unit_price,
        stock: if export { i64::from(offer.quantity) } else { 0 },
        demand: if export { 0 } else { i64::from(offer.quantity) },
        quantity_at_station: i64::from(offer.quantity),
    };
    SnapshotStation {
        sells_to_player: market
            .sells_to_player
            .iter()
            .map(|o| to_record(o, true))
            .collect(),
        buys_from_player: market
            .buys_from_player
            .iter()
            .map(|o| to_record(o, false))
            .collect(),
        details: SnapshotStationDetails {
            max_landing_pad_size: market.max_landing_pad.map(|p| p.code().to_string()),
            distance_to_arrival: market.distance_to_arrival_ls,
            station_type: Some(market.station_type.clone()),
        },
    }
}

/// Snapshot file in the app data directory.
pub fn default_snapshot_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cargo-route-planner")
        .join(SNAPSHOT_FILENAME)
}

pub fn load_market_snapshot(path: &Path) -> Option<LocalMarketSnapshot> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(snapshot) => {
            info!(path = %path.display(), "loaded market snapshot");
            Some(snapshot)
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "market snapshot unreadable, ignoring");
            None
        }
    }
}

pub fn save_market_snapshot(
    path: &Path,
    snapshot: &LocalMarketSnapshot,
) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}
