//! Configurable search parameters with persisted defaults.

use serde::{Deserialize, Serialize};

/// Numeric knobs shared by the route searches. Persisted as JSON; a missing or
/// unreadable file falls back to `Default`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum age of a cached market snapshot before it is refreshed.
    pub max_age_days: i64,
    /// Stations further than this from the arrival star are filtered out.
    pub max_station_distance_ls: f64,
    pub include_planetary: bool,
    pub include_fleet_carriers: bool,
    /// A destination's import list is truncated to this many highest-price
    /// entries before matching, to bound cost.
    pub top_n_imports_filter: usize,
    /// Cap on the ranked output of the general two-sided search.
    pub max_general_trade_routes: usize,
    pub max_stations_for_trade_loops: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_age_days: 1,
            max_station_distance_ls: 5000.0,
            include_planetary: true,
            include_fleet_carriers: true,
            top_n_imports_filter: 30,
            max_general_trade_routes: 5,
            max_stations_for_trade_loops: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = SearchSettings::default();
        assert_eq!(settings.max_age_days, 1);
        assert_eq!(settings.max_station_distance_ls, 5000.0);
        assert!(settings.include_planetary);
        assert!(settings.include_fleet_carriers);
        assert_eq!(settings.top_n_imports_filter, 30);
        assert_eq!(settings.max_general_trade_routes, 5);
        assert_eq!(settings.max_stations_for_trade_loops, 5);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: SearchSettings =
            serde_json::from_str(r#"{"max_age_days": 3, "include_fleet_carriers": false}"#)
                .unwrap();
        assert_eq!(settings.max_age_days, 3);
        assert!(!settings.include_fleet_carriers);
        assert_eq!(settings.top_n_imports_filter, 30);
    }
}
