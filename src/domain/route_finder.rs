//! Single-hop destination ranking for the multi-hop planner.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use super::entities::{CommodityId, CommodityOffer, PadSize, SystemMarketGroup};
use super::filters::{station_is_eligible, StationFilters};
use crate::util::cancel::{CancelToken, Cancelled};

/// How many ranked destination suggestions one hop surfaces.
const TOP_SUGGESTIONS: usize = 5;

/// The best single commodity to haul from the hop's source station to one
/// destination station.
#[derive(Clone, Debug, PartialEq)]
pub struct DestinationSuggestion {
    pub id: Uuid,
    pub dest_system: String,
    pub dest_station: String,
    pub commodity_id: CommodityId,
    pub display_name: String,
    pub buy_price_at_source: f64,
    pub sell_price_at_dest: f64,
    pub profit_per_unit: f64,
    /// `profit_per_unit * min(cargo, stock, demand)` — an estimate; the
    /// planner commits a full cargo load without re-checking.
    pub est_total_profit: f64,
    pub distance_ly: f64,
    pub landing_pad: Option<PadSize>,
    pub dist_to_star_ls: Option<f64>,
    pub stock_at_source: u32,
    pub demand_at_dest: u32,
}

/// Rank destination stations reachable within `max_ly_radius` by the profit of
/// hauling a full cargo of one commodity there, and return the top 5.
///
/// Per destination station only the commodity with the highest profit per unit
/// is considered, while the ranking across destinations uses the estimated
/// total profit. The multi-hop planner wants one simple "next stop" decision
/// per candidate, not a full manifest.
pub fn find_best_outbound_trades(
    source_system: &str,
    source_station: &str,
    source_exports: &[CommodityOffer],
    candidate_groups: &[SystemMarketGroup],
    cargo_capacity: u32,
    filters: &StationFilters,
    max_ly_radius: f64,
    cancel: &CancelToken,
) -> Result<Vec<DestinationSuggestion>, Cancelled> {
    if source_exports.is_empty() {
        info!(system = source_system, station = source_station, "source station has no exports");
        return Ok(Vec::new());
    }
    cancel.checkpoint()?;

    let exports_by_id: HashMap<&str, &CommodityOffer> = source_exports
        .iter()
        .map(|offer| (offer.commodity_id.as_str(), offer))
        .collect();

    let mut suggestions: Vec<DestinationSuggestion> = Vec::new();
    for group in candidate_groups {
        cancel.checkpoint()?;
        if group.distance_ly > max_ly_radius {
            continue;
        }
        for station in group.stations.values() {
            if station.is_same_station(source_system, source_station) {
                continue;
            }
            if !station_is_eligible(station, filters, false) {
                continue;
            }

            // Best single commodity for this destination by profit per unit.
            let mut best: Option<(&CommodityOffer, &CommodityOffer)> = None;
            for import in &station.buys_from_player {
                let Some(export) = exports_by_id.get(import.commodity_id.as_str()) else {
                    continue;
                };
                if import.unit_price <= export.unit_price {
                    continue;
                }
                let profit = import.unit_price - export.unit_price;
                let better = match best {
                    Some((b_export, b_import)) => {
                        profit > b_import.unit_price - b_export.unit_price
                    }
                    None => true,
                };
                if better {
                    best = Some((export, import));
                }
            }

            if let Some((export, import)) = best {
                let profit_per_unit = import.unit_price - export.unit_price;
                let tradable_qty = cargo_capacity.min(export.quantity).min(import.quantity);
                suggestions.push(DestinationSuggestion {
                    id: Uuid::new_v4(),
                    dest_system: group.system_name.clone(),
                    dest_station: station.station_name.clone(),
                    commodity_id: export.commodity_id.clone(),
                    display_name: export.display_name.clone(),
                    buy_price_at_source: export.unit_price,
                    sell_price_at_dest: import.unit_price,
                    profit_per_unit,
                    est_total_profit: f64::from(tradable_qty) * profit_per_unit,
                    distance_ly: group.distance_ly,
                    landing_pad: station.max_landing_pad,
                    dist_to_star_ls: station.distance_to_arrival_ls,
                    stock_at_source: export.quantity,
                    demand_at_dest: import.quantity,
                });
            }
        }
    }

    suggestions.sort_by(|a, b| {
        b.est_total_profit
            .partial_cmp(&a.est_total_profit)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.dest_system.cmp(&b.dest_system))
            .then_with(|| a.dest_station.cmp(&b.dest_station))
    });
    suggestions.truncate(TOP_SUGGESTIONS);

    debug!(
        system = source_system,
        station = source_station,
        count = suggestions.len(),
        "ranked outbound destinations"
    );
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::entities::StationMarket;

    fn offer(name: &str, price: f64, qty: i64) -> CommodityOffer {
        CommodityOffer::tradable(name, name, price, qty).unwrap()
    }

    fn station(name: &str, station_type: &str, imports: Vec<CommodityOffer>) -> StationMarket {
        StationMarket {
            system_name: "Nearby".into(),
            station_name: name.into(),
            sells_to_player: vec![],
            buys_from_player: imports,
            station_type: station_type.into(),
            max_landing_pad: Some(PadSize::Large),
            distance_to_arrival_ls: Some(100.0),
        }
    }

    fn group(system: &str, distance_ly: f64, stations: Vec<StationMarket>) -> SystemMarketGroup {
        SystemMarketGroup {
            system_name: system.into(),
            distance_ly,
            stations: stations
                .into_iter()
                .map(|mut s| {
                    s.system_name = system.to_string();
                    (s.station_name.clone(), s)
                })
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

    #[test]
    fn ranks_by_total_profit_but_selects_by_unit_profit() {
        // Station A only wants Gold: 60/unit profit, but demand caps it at 5.
        // Station B only wants Silver: 10/unit profit with deep demand.
        // Gold wins per unit inside its station, yet B outranks A on total.
        let exports = [offer("Gold", 100.0, 100), offer("Silver", 50.0, 100)];
        let groups = [group(
            "Nearby",
            20.0,
            vec![
                station("A", "Coriolis", vec![offer("Gold", 160.0, 5)]),
                station("B", "Coriolis", vec![offer("Silver", 60.0, 1000)]),
            ],
        )];
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            50,
            &open_filters(),
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].dest_station, "B");
        assert_eq!(result[0].commodity_id, "silver");
        assert_eq!(result[0].est_total_profit, 500.0);
        assert_eq!(result[1].dest_station, "A");
        assert_eq!(result[1].commodity_id, "gold");
        assert_eq!(result[1].est_total_profit, 300.0);
    }

    #[test]
    fn single_commodity_per_destination_highest_unit_profit() {
        // One destination wanting both: Gold has the higher unit profit and is
        // the one surfaced, even though Silver's total would be larger.
        let exports = [offer("Gold", 100.0, 100), offer("Silver", 50.0, 100)];
        let groups = [group(
            "Nearby",
            20.0,
            vec![station(
                "A",
                "Coriolis",
                vec![offer("Gold", 160.0, 5), offer("Silver", 90.0, 1000)],
            )],
        )];
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            50,
            &open_filters(),
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].commodity_id, "gold");
        assert_eq!(result[0].profit_per_unit, 60.0);
        assert_eq!(result[0].est_total_profit, 300.0);
    }

    #[test]
    fn fleet_carriers_excluded_when_toggled_off() {
        let exports = [offer("Gold", 100.0, 100)];
        let groups = [group(
            "Nearby",
            20.0,
            vec![station(
                "Carrier X",
                "FleetCarrier",
                // Absurdly profitable, but filtered out regardless.
                vec![offer("Gold", 10000.0, 1000)],
            )],
        )];
        let mut filters = open_filters();
        filters.include_fleet_carriers = false;
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            50,
            &filters,
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn systems_beyond_radius_skipped() {
        let exports = [offer("Gold", 100.0, 100)];
        let groups = [group(
            "Far",
            90.0,
            vec![station("A", "Coriolis", vec![offer("Gold", 200.0, 100)])],
        )];
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            50,
            &open_filters(),
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn source_station_is_not_its_own_destination() {
        let exports = [offer("Gold", 100.0, 100)];
        let mut home = station("Home", "Coriolis", vec![offer("Gold", 200.0, 100)]);
        home.system_name = "Sol".into();
        let groups = [SystemMarketGroup {
            system_name: "Sol".into(),
            distance_ly: 0.0,
            stations: HashMap::from([("Home".to_string(), home)]),
        }];
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            50,
            &open_filters(),
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn caps_at_five_suggestions() {
        let exports = [offer("Gold", 100.0, 1000)];
        let stations: Vec<StationMarket> = (0..8)
            .map(|i| {
                station(
                    &format!("S{i}"),
                    "Coriolis",
                    vec![offer("Gold", 110.0 + f64::from(i), 1000)],
                )
            })
            .collect();
        let groups = [group("Nearby", 10.0, stations)];
        let result = find_best_outbound_trades(
            "Sol",
            "Home",
            &exports,
            &groups,
            100,
            &open_filters(),
            60.0,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.len(), 5);
        // Best profit first.
        assert_eq!(result[0].dest_station, "S7");
        for pair in result.windows(2) {
            assert!(pair[0].est_total_profit >= pair[1].est_total_profit);
        }
    }
}
