//! Asynchronous client for the Ardent Insight API v2.
//!
//! - Typed accessors for nearby systems and per-system commodity listings.
//! - Radius downloads reuse the on-disk snapshot when it still covers the
//!   query, and fan out over systems with bounded concurrency otherwise.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::entities::{CommodityOffer, PadSize, StationMarket, SystemMarketGroup};
use crate::domain::provider::{MarketDataProvider, ProviderError};
use crate::domain::settings::SearchSettings;
use crate::infra::cache::{
    default_snapshot_path, load_market_snapshot, save_market_snapshot, LocalMarketSnapshot,
};
use crate::util::cancel::{CancelToken, Cancelled};

const DEFAULT_BASE_URL: &str = "https://api.ardent-insight.com/v2/";
const USER_AGENT: &str = "cargo-route-planner/0.1.0";

/// Parallel per-system downloads during a radius fetch.
pub const CONCURRENCY_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum ArdentClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<ArdentClientError> for ProviderError {
    fn from(error: ArdentClientError) -> Self {
        match error {
            ArdentClientError::Cancelled(c) => Self::Cancelled(c),
            other => Self::Source(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NearbySystemDto {
    #[serde(rename = "systemName")]
    system_name: Option<String>,
    distance: Option<f64>,
}

/// One line of a system-wide exports or imports listing. The API nests some
/// station attributes under `station` on older records, so both spots are
/// checked.
#[derive(Debug, Deserialize)]
struct CommodityListingDto {
    #[serde(rename = "commodityName")]
    commodity_name: Option<String>,
    #[serde(rename = "commodityLocalisedName", default)]
    commodity_localised_name: Option<String>,
    #[serde(rename = "stationName")]
    station_name: Option<String>,
    #[serde(rename = "buyPrice", default)]
    buy_price: f64,
    #[serde(rename = "sellPrice", default)]
    sell_price: f64,
    #[serde(default)]
    stock: i64,
    #[serde(default)]
    demand: i64,
    #[serde(rename = "maxLandingPadSize", default)]
    max_landing_pad_size: Option<String>,
    #[serde(rename = "distanceToArrival", default)]
    distance_to_arrival: Option<f64>,
    #[serde(rename = "stationType", default)]
    station_type: Option<String>,
    #[serde(default)]
    station: Option<StationDetailsDto>,
}

#[derive(Debug, Deserialize)]
struct StationDetailsDto {
    #[serde(rename = "maxLandingPadSize", default)]
    max_landing_pad_size: Option<String>,
    #[serde(rename = "distanceToArrival", default)]
    distance_to_arrival: Option<f64>,
    #[serde(rename = "type", default)]
    station_type: Option<String>,
}

impl CommodityListingDto {
    fn pad_code(&self) -> Option<&str> {
        self.max_landing_pad_size
            .as_deref()
            .or_else(|| self.station.as_ref()?.max_landing_pad_size.as_deref())
    }

    fn arrival_distance(&self) -> Option<f64> {
        self.distance_to_arrival
            .or_else(|| self.station.as_ref()?.distance_to_arrival)
    }

    fn kind(&self) -> String {
        self.station_type
            .clone()
            .or_else(|| self.station.as_ref()?.station_type.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Clone)]
pub struct ArdentClient {
    http: Client,
    base_url: Url,
    snapshot_path: PathBuf,
    settings: SearchSettings,
}

impl ArdentClient {
    pub fn new(settings: SearchSettings) -> Result<Self, ArdentClientError> {
        Self::with_base_url(DEFAULT_BASE_URL, settings)
    }

    pub fn with_base_url(base: &str, settings: SearchSettings) -> Result<Self, ArdentClientError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url,
            snapshot_path: default_snapshot_path(),
            settings,
        })
    }

    /// Redirect the snapshot cache file, mainly for tests.
    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = path;
        self
    }

    /// Systems within `radius_ly` of `system`, with their distances.
    async fn nearby_systems(
        &self,
        system: &str,
        radius_ly: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<(String, f64)>, ArdentClientError> {
        cancel.checkpoint()?;
        let mut url = self.url(&format!("system/name/{system}/nearby"))?;
        url.query_pairs_mut()
            .append_pair("maxDistance", &radius_ly.to_string());
        let dtos: Vec<NearbySystemDto> = self.fetch_json(url).await?;
        cancel.checkpoint()?;
        Ok(dtos
            .into_iter()
            .filter_map(|dto| Some((dto.system_name?, dto.distance?)))
            .collect())
    }

    /// Every station market of one system, folded from the system-wide
    /// exports and imports listings.
    async fn system_markets(
        &self,
        system: &str,
        cancel: &CancelToken,
    ) -> Result<HashMap<String, StationMarket>, ArdentClientError> {
        cancel.checkpoint()?;
        let exports_url = self.url(&format!("system/name/{system}/commodities/exports"))?;
        let exports: Vec<CommodityListingDto> = self.fetch_json(exports_url).await?;
        cancel.checkpoint()?;
        let imports_url = self.url(&format!("system/name/{system}/commodities/imports"))?;
        let imports: Vec<CommodityListingDto> = self.fetch_json(imports_url).await?;
        cancel.checkpoint()?;
        Ok(fold_listings(system, exports, imports))
    }

    async fn fetch_radius(
        &self,
        system: &str,
        radius_ly: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<SystemMarketGroup>, ArdentClientError> {
        let nearby = self.nearby_systems(system, radius_ly, cancel).await?;
        info!(system, radius_ly, count = nearby.len(), "radius download started");

        let mut groups: Vec<SystemMarketGroup> = stream::iter(nearby)
            .map(|(name, distance_ly)| async move {
                // A failed system is reported as empty rather than failing
                // the whole radius.
                let stations = match self.system_markets(&name, cancel).await {
                    Ok(stations) => Ok(stations),
                    Err(ArdentClientError::Cancelled(c)) => Err(c),
                    Err(error) => {
                        warn!(system = %name, %error, "market fetch failed, skipping system");
                        Ok(HashMap::new())
                    }
                }?;
                Ok::<_, Cancelled>(SystemMarketGroup {
                    system_name: name,
                    distance_ly,
                    stations,
                })
            })
            .buffer_unordered(CONCURRENCY_LIMIT)
            .collect::<Vec<Result<SystemMarketGroup, Cancelled>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, Cancelled>>()?;

        groups.retain(|g| !g.stations.is_empty());
        info!(system, kept = groups.len(), "radius download complete");
        Ok(groups)
    }
}

impl ArdentClient {
    async fn fetch_json<T>(&self, url: Url) -> Result<T, ArdentClientError>
    where
        T: DeserializeOwned,
    {
        debug!(%url, "fetching");
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

#[async_trait]
impl MarketDataProvider for ArdentClient {
    async fn market_snapshot(
        &self,
        system: &str,
        station: &str,
        cancel: &CancelToken,
    ) -> Result<Option<StationMarket>, ProviderError> {
        // Reuse the radius snapshot when it already has this station.
        if let Some(snapshot) = load_market_snapshot(&self.snapshot_path) {
            if snapshot.is_fresh(self.settings.max_age_days) {
                if let Some(market) = snapshot
                    .to_groups()
                    .iter()
                    .find(|g| g.system_name == system)
                    .and_then(|g| g.station(station))
                {
                    debug!(system, station, "serving station market from snapshot");
                    return Ok(Some(market.clone()));
                }
            }
        }

        let markets = self
            .system_markets(system, cancel)
            .await
            .map_err(ProviderError::from)?;
        Ok(markets.get(station).cloned())
    }

    async fn markets_in_radius(
        &self,
        system: &str,
        radius_ly: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<SystemMarketGroup>, ProviderError> {
        if let Some(snapshot) = load_market_snapshot(&self.snapshot_path) {
            if snapshot.covers(system, radius_ly, self.settings.max_age_days) {
                info!(system, radius_ly, "serving radius from snapshot");
                return Ok(snapshot.to_groups());
            }
        }

        let groups = self
            .fetch_radius(system, radius_ly, cancel)
            .await
            .map_err(ProviderError::from)?;
        let snapshot = LocalMarketSnapshot::from_groups(system, radius_ly, &groups);
        if let Err(error) = save_market_snapshot(&self.snapshot_path, &snapshot) {
            warn!(%error, "failed to save market snapshot");
        }
        Ok(groups)
    }
}

/// Merge export and import listings into one `StationMarket` per station.
/// Lines without a station or commodity name, and lines that fail offer
/// validation, are dropped. Station attributes are filled from whichever line
/// first carries them.
fn fold_listings(
    system: &str,
    exports: Vec<CommodityListingDto>,
    imports: Vec<CommodityListingDto>,
) -> HashMap<String, StationMarket> {
    let mut stations: HashMap<String, StationMarket> = HashMap::new();

    let lines = exports
        .iter()
        .map(|dto| (dto, true))
        .chain(imports.iter().map(|dto| (dto, false)));
    for (dto, is_export) in lines {
        let Some(station_name) = dto.station_name.clone() else {
            continue;
        };
        let Some(name) = dto.commodity_name.as_deref() else {
            continue;
        };
        let display = dto.commodity_localised_name.as_deref().unwrap_or(name);
        let (price, quantity) = if is_export {
            (dto.buy_price, dto.stock)
        } else {
            (dto.sell_price, dto.demand)
        };
        let Some(offer) = CommodityOffer::tradable(name, display, price, quantity) else {
            continue;
        };

        let market = stations
            .entry(station_name.clone())
            .or_insert_with(|| StationMarket {
                system_name: system.to_string(),
                station_name,
                sells_to_player: Vec::new(),
                buys_from_player: Vec::new(),
                station_type: "Unknown".to_string(),
                max_landing_pad: None,
                distance_to_arrival_ls: None,
            });
        if market.station_type == "Unknown" {
            market.station_type = dto.kind();
        }
        if market.max_landing_pad.is_none() {
            market.max_landing_pad = dto.pad_code().and_then(PadSize::from_code);
        }
        if market.distance_to_arrival_ls.is_none() {
            market.distance_to_arrival_ls = dto.arrival_distance();
        }
        if is_export {
            market.sells_to_player.push(offer);
        } else {
            market.buys_from_player.push(offer);
        }
    }

    stations
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORTS_JSON: &str = r#"[
        {"commodityName": "Gold", "stationName": "Miller Depot",
         "buyPrice": 9000.0, "stock": 120, "maxLandingPadSize": "L",
         "distanceToArrival": 36.2, "stationType": "Coriolis"},
        {"commodityName": "Slag", "stationName": "Miller Depot",
         "buyPrice": 0.0, "stock": 40},
        {"commodityName": "Tea", "buyPrice": 100.0, "stock": 10}
    ]"#;

    const IMPORTS_JSON: &str = r#"[
        {"commodityName": "Tea", "commodityLocalisedName": "Fine Tea",
         "stationName": "Miller Depot", "sellPrice": 1700.0, "demand": 300},
        {"commodityName": "Gold", "stationName": "Outer Ring",
         "sellPrice": 9500.0, "demand": 50,
         "station": {"maxLandingPadSize": "M", "distanceToArrival": 812.0,
                     "type": "Outpost"}}
    ]"#;

    #[test]
    fn listings_fold_into_station_markets() {
        let exports: Vec<CommodityListingDto> = serde_json::from_str(EXPORTS_JSON).unwrap();
        let imports: Vec<CommodityListingDto> = serde_json::from_str(IMPORTS_JSON).unwrap();
        let stations = fold_listings("Barnard's Star", exports, imports);

        assert_eq!(stations.len(), 2);
        let depot = &stations["Miller Depot"];
        // The zero-price line and the line without a station are dropped.
        assert_eq!(depot.sells_to_player.len(), 1);
        assert_eq!(depot.sells_to_player[0].commodity_id, "gold");
        assert_eq!(depot.buys_from_player[0].display_name, "Fine Tea");
        assert_eq!(depot.max_landing_pad, Some(PadSize::Large));
        assert_eq!(depot.station_type, "Coriolis");

        // Attributes nested under `station` are picked up too.
        let ring = &stations["Outer Ring"];
        assert_eq!(ring.max_landing_pad, Some(PadSize::Medium));
        assert_eq!(ring.distance_to_arrival_ls, Some(812.0));
        assert_eq!(ring.station_type, "Outpost");
    }

    #[test]
    fn nearby_listing_skips_incomplete_entries() {
        let json = r#"[
            {"systemName": "Barnard's Star", "distance": 5.95},
            {"systemName": "Broken"},
            {"distance": 3.0}
        ]"#;
        let dtos: Vec<NearbySystemDto> = serde_json::from_str(json).unwrap();
        let parsed: Vec<(String, f64)> = dtos
            .into_iter()
            .filter_map(|dto| Some((dto.system_name?, dto.distance?)))
            .collect();
        assert_eq!(parsed, vec![("Barnard's Star".to_string(), 5.95)]);
    }
}
