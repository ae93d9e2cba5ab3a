//! General two-sided trade search around the player's current station.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use super::entities::{CommodityOffer, StationMarket, SystemMarketGroup};
use super::filters::{station_is_eligible, StationFilters};
use super::matching::{match_trades, Trade};
use super::provider::MarketDataProvider;
use super::settings::SearchSettings;
use crate::util::cancel::{CancelToken, Cancelled};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeDirection {
    /// Current station → surrounding station.
    Outbound,
    /// Surrounding station → current station.
    Inbound,
}

/// One ranked trade route between the current station and a surrounding one.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedRoute {
    pub direction: TradeDirection,
    pub source_system: String,
    pub source_station: String,
    pub dest_system: String,
    pub dest_station: String,
    /// Distance to the surrounding endpoint's system.
    pub distance_ly: f64,
    pub dist_to_star_ls: Option<f64>,
    pub trade: Trade,
    /// For inbound routes: the best single trade to haul on the way out to the
    /// route's source station, making the pair a round trip.
    pub preliminary_leg: Option<Trade>,
}

/// Highest-price-first truncation of an import list, bounding matching cost.
fn top_imports(offers: &[CommodityOffer], top_n: usize) -> Vec<CommodityOffer> {
    let mut sorted = offers.to_vec();
    sorted.sort_by(|a, b| {
        b.unit_price
            .partial_cmp(&a.unit_price)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.commodity_id.cmp(&b.commodity_id))
    });
    sorted.truncate(top_n);
    sorted
}

/// Search both directions between the current station and every eligible
/// surrounding station, then rank the union by total profit.
///
/// Candidate-local failures (missing import data that cannot be fetched) are
/// logged and skip only that candidate; cancellation aborts the whole search.
pub async fn find_general_trades(
    provider: &dyn MarketDataProvider,
    current: &StationMarket,
    surrounding: &[SystemMarketGroup],
    cargo_capacity: u32,
    filters: &StationFilters,
    settings: &SearchSettings,
    cancel: &CancelToken,
) -> Result<Vec<RankedRoute>, Cancelled> {
    cancel.checkpoint()?;
    let mut routes: Vec<RankedRoute> = Vec::new();

    // Outbound: what we can buy here and sell at X.
    if !current.sells_to_player.is_empty() {
        for group in surrounding {
            cancel.checkpoint()?;
            for station in group.stations.values() {
                if station.is_same_station(&current.system_name, &current.station_name) {
                    continue;
                }
                if !station_is_eligible(station, filters, false) {
                    continue;
                }
                let imports = top_imports(&station.buys_from_player, settings.top_n_imports_filter);
                if imports.is_empty() {
                    continue;
                }
                let trades =
                    match_trades(&current.sells_to_player, &imports, cargo_capacity, cancel)?;
                for trade in trades {
                    routes.push(RankedRoute {
                        direction: TradeDirection::Outbound,
                        source_system: current.system_name.clone(),
                        source_station: current.station_name.clone(),
                        dest_system: group.system_name.clone(),
                        dest_station: station.station_name.clone(),
                        distance_ly: group.distance_ly,
                        dist_to_star_ls: station.distance_to_arrival_ls,
                        trade,
                        preliminary_leg: None,
                    });
                }
            }
        }
    }

    // Inbound: what X sells that we can offload here.
    if !current.buys_from_player.is_empty() {
        for group in surrounding {
            cancel.checkpoint()?;
            for station in group.stations.values() {
                if station.is_same_station(&current.system_name, &current.station_name) {
                    continue;
                }
                if !station_is_eligible(station, filters, false) {
                    continue;
                }
                if station.sells_to_player.is_empty() {
                    continue;
                }
                let trades = match_trades(
                    &station.sells_to_player,
                    &current.buys_from_player,
                    cargo_capacity,
                    cancel,
                )?;
                for trade in trades {
                    routes.push(RankedRoute {
                        direction: TradeDirection::Inbound,
                        source_system: group.system_name.clone(),
                        source_station: station.station_name.clone(),
                        dest_system: current.system_name.clone(),
                        dest_station: current.station_name.clone(),
                        distance_ly: group.distance_ly,
                        dist_to_star_ls: station.distance_to_arrival_ls,
                        trade,
                        preliminary_leg: None,
                    });
                }
            }
        }
    }

    routes.sort_by(|a, b| {
        b.trade
            .total_profit
            .partial_cmp(&a.trade.total_profit)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.source_system.cmp(&b.source_system))
            .then_with(|| a.source_station.cmp(&b.source_station))
            .then_with(|| a.trade.commodity_id.cmp(&b.trade.commodity_id))
    });
    routes.truncate(settings.max_general_trade_routes);

    // Round-trip enrichment: for every inbound route, suggest what to carry on
    // the way out to its source station.
    for route in routes.iter_mut() {
        cancel.checkpoint()?;
        if route.direction != TradeDirection::Inbound || current.sells_to_player.is_empty() {
            continue;
        }
        let imports = match prelim_destination_imports(
            provider,
            current,
            surrounding,
            &route.source_system,
            &route.source_station,
            cancel,
        )
        .await?
        {
            Some(imports) => imports,
            None => continue,
        };
        let truncated = top_imports(&imports, settings.top_n_imports_filter);
        let trades = match_trades(&current.sells_to_player, &truncated, cargo_capacity, cancel)?;
        if let Some(best) = trades.into_iter().next() {
            debug!(
                dest_system = %route.source_system,
                dest_station = %route.source_station,
                commodity = %best.commodity_id,
                "attached preliminary outbound leg"
            );
            route.preliminary_leg = Some(best);
        }
    }

    info!(count = routes.len(), "general trade search complete");
    Ok(routes)
}

/// Import list of the station a preliminary leg would deliver to. Prefers the
/// radius snapshot, falls back to the already-loaded current-station market,
/// and only then to an on-demand fetch.
async fn prelim_destination_imports(
    provider: &dyn MarketDataProvider,
    current: &StationMarket,
    surrounding: &[SystemMarketGroup],
    system: &str,
    station: &str,
    cancel: &CancelToken,
) -> Result<Option<Vec<CommodityOffer>>, Cancelled> {
    if current.is_same_station(system, station) {
        return Ok(Some(current.buys_from_player.clone()));
    }
    if let Some(cached) = surrounding
        .iter()
        .find(|g| g.system_name == system)
        .and_then(|g| g.station(station))
    {
        if !cached.buys_from_player.is_empty() {
            return Ok(Some(cached.buys_from_player.clone()));
        }
    }
    match provider.market_snapshot(system, station, cancel).await {
        Ok(Some(market)) => Ok(Some(market.buys_from_player)),
        Ok(None) => {
            warn!(system, station, "no import data for preliminary leg");
            Ok(None)
        }
        Err(super::provider::ProviderError::Cancelled(c)) => Err(c),
        Err(error) => {
            warn!(system, station, %error, "fetch for preliminary leg failed, skipping");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::PadSize;
    use crate::domain::provider::{MarketDataProvider, ProviderError};

    fn offer(name: &str, price: f64, qty: i64) -> CommodityOffer {
        CommodityOffer::tradable(name, name, price, qty).unwrap()
    }

    fn station(
        system: &str,
        name: &str,
        exports: Vec<CommodityOffer>,
        imports: Vec<CommodityOffer>,
    ) -> StationMarket {
        StationMarket {
            system_name: system.into(),
            station_name: name.into(),
            sells_to_player: exports,
            buys_from_player: imports,
            station_type: "Coriolis".into(),
            max_landing_pad: Some(PadSize::Large),
            distance_to_arrival_ls: Some(50.0),
        }
    }

    fn group(system: &str, distance_ly: f64, stations: Vec<StationMarket>) -> SystemMarketGroup {
        SystemMarketGroup {
            system_name: system.into(),
            distance_ly,
            stations: stations
                .into_iter()
                .map(|s| (s.station_name.clone(), s))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn open_filters() -> StationFilters {
        StationFilters {
            pad_size_required: None,
            max_ls: 5000.0,
            include_planetary: true,
            include_fleet_carriers: true,
        }
    }

    /// Provider that serves from a fixed map and counts nothing.
    struct MapProvider {
        markets: HashMap<(String, String), StationMarket>,
    }

    impl MapProvider {
        fn empty() -> Self {
            Self { markets: HashMap::new() }
        }

        fn with(markets: Vec<StationMarket>) -> Self {
            Self {
                markets: markets
                    .into_iter()
                    .map(|m| ((m.system_name.clone(), m.station_name.clone()), m))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for MapProvider {
        async fn market_snapshot(
            &self,
            system: &str,
            station: &str,
            cancel: &CancelToken,
        ) -> Result<Option<StationMarket>, ProviderError> {
            cancel.checkpoint()?;
            Ok(self.markets.get(&(system.to_string(), station.to_string())).cloned())
        }

        async fn markets_in_radius(
            &self,
            _system: &str,
            _radius_ly: f64,
            cancel: &CancelToken,
        ) -> Result<Vec<SystemMarketGroup>, ProviderError> {
            cancel.checkpoint()?;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn merges_and_ranks_both_directions() {
        let current = station(
            "Sol",
            "Home",
            vec![offer("Gold", 100.0, 100)],
            vec![offer("Tea", 50.0, 100)],
        );
        // Outbound: Gold to X (profit 40/unit). Inbound: Tea from X (20/unit).
        let x = station(
            "Nearby",
            "X",
            vec![offer("Tea", 30.0, 100)],
            vec![offer("Gold", 140.0, 100)],
        );
        let surrounding = [group("Nearby", 15.0, vec![x])];
        let routes = find_general_trades(
            &MapProvider::empty(),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &SearchSettings::default(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].direction, TradeDirection::Outbound);
        assert_eq!(routes[0].trade.total_profit, 400.0);
        assert_eq!(routes[1].direction, TradeDirection::Inbound);
        assert_eq!(routes[1].trade.total_profit, 200.0);
        // Inbound route gets a round-trip suggestion from snapshot data.
        let prelim = routes[1].preliminary_leg.as_ref().unwrap();
        assert_eq!(prelim.commodity_id, "gold");
    }

    #[tokio::test]
    async fn import_list_truncated_to_top_prices() {
        let current = station(
            "Sol",
            "Home",
            vec![offer("Gold", 100.0, 100), offer("Tea", 10.0, 100)],
            vec![],
        );
        // X pays best for Tea, but top-1 truncation keeps only the
        // highest-price import line (Gold at 500) for matching.
        let x = station(
            "Nearby",
            "X",
            vec![],
            vec![offer("Gold", 500.0, 100), offer("Tea", 400.0, 100)],
        );
        let surrounding = [group("Nearby", 15.0, vec![x])];
        let mut settings = SearchSettings::default();
        settings.top_n_imports_filter = 1;
        let routes = find_general_trades(
            &MapProvider::empty(),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &settings,
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].trade.commodity_id, "gold");
    }

    #[tokio::test]
    async fn missing_import_data_fetched_on_demand_for_prelim_leg() {
        let current = station(
            "Sol",
            "Home",
            vec![offer("Gold", 100.0, 100)],
            vec![offer("Tea", 50.0, 100)],
        );
        // X sells Tea (inbound route) but its import list is absent from the
        // snapshot; the provider serves it on demand.
        let x_snapshot = station("Nearby", "X", vec![offer("Tea", 30.0, 100)], vec![]);
        let x_full = station(
            "Nearby",
            "X",
            vec![offer("Tea", 30.0, 100)],
            vec![offer("Gold", 150.0, 100)],
        );
        let surrounding = [group("Nearby", 15.0, vec![x_snapshot])];
        let routes = find_general_trades(
            &MapProvider::with(vec![x_full]),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &SearchSettings::default(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(routes.len(), 1);
        let prelim = routes[0].preliminary_leg.as_ref().unwrap();
        assert_eq!(prelim.commodity_id, "gold");
        assert_eq!(prelim.profit_per_unit, 50.0);
    }

    #[tokio::test]
    async fn fetch_failure_skips_only_the_prelim_leg() {
        let current = station(
            "Sol",
            "Home",
            vec![offer("Gold", 100.0, 100)],
            vec![offer("Tea", 50.0, 100)],
        );
        let x = station("Nearby", "X", vec![offer("Tea", 30.0, 100)], vec![]);
        let surrounding = [group("Nearby", 15.0, vec![x])];
        // Provider knows nothing: the inbound route must still rank, just
        // without a preliminary leg.
        let routes = find_general_trades(
            &MapProvider::empty(),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &SearchSettings::default(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].direction, TradeDirection::Inbound);
        assert!(routes[0].preliminary_leg.is_none());
    }

    #[tokio::test]
    async fn result_capped_at_configured_maximum() {
        let current = station("Sol", "Home", vec![offer("Gold", 100.0, 1000)], vec![]);
        let stations: Vec<StationMarket> = (0..8)
            .map(|i| {
                station(
                    "Nearby",
                    &format!("S{i}"),
                    vec![],
                    vec![offer("Gold", 110.0 + f64::from(i), 1000)],
                )
            })
            .collect();
        let surrounding = [group("Nearby", 15.0, stations)];
        let routes = find_general_trades(
            &MapProvider::empty(),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &SearchSettings::default(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(routes.len(), 5);
        assert_eq!(routes[0].dest_station, "S7");
    }

    #[tokio::test]
    async fn cancellation_aborts_the_search() {
        let current = station("Sol", "Home", vec![offer("Gold", 100.0, 100)], vec![]);
        let surrounding = [group("Nearby", 15.0, vec![])];
        let token = CancelToken::new();
        token.cancel();
        let result = find_general_trades(
            &MapProvider::empty(),
            &current,
            &surrounding,
            10,
            &open_filters(),
            &SearchSettings::default(),
            &token,
        )
        .await;
        assert_eq!(result, Err(Cancelled));
    }
}
