//! Station eligibility policy.

use super::entities::{PadSize, StationMarket};
use super::settings::SearchSettings;

/// Filter toggles applied to every candidate station.
#[derive(Clone, Debug, PartialEq)]
pub struct StationFilters {
    /// Minimum pad ordinal the ship needs; `None` disables the pad check.
    pub pad_size_required: Option<PadSize>,
    pub max_ls: f64,
    pub include_planetary: bool,
    pub include_fleet_carriers: bool,
}

impl StationFilters {
    pub fn from_settings(settings: &SearchSettings, pad_size_required: Option<PadSize>) -> Self {
        Self {
            pad_size_required,
            max_ls: settings.max_station_distance_ls,
            include_planetary: settings.include_planetary,
            include_fleet_carriers: settings.include_fleet_carriers,
        }
    }
}

/// Decide whether a station may appear in any ranked output.
///
/// Pure and deterministic. A station with an unknown pad fails a pad
/// requirement; a station with an unknown arrival distance is only eligible
/// when it is the player's current station (distance is definitionally 0
/// there).
pub fn station_is_eligible(
    station: &StationMarket,
    filters: &StationFilters,
    is_current_station: bool,
) -> bool {
    if !filters.include_planetary && station.is_planetary() {
        return false;
    }
    if !filters.include_fleet_carriers && station.is_fleet_carrier() {
        return false;
    }
    if let Some(required) = filters.pad_size_required {
        match station.max_landing_pad {
            Some(pad) if pad.ordinal() >= required.ordinal() => {}
            _ => return false,
        }
    }
    let distance_ls = if is_current_station {
        0.0
    } else {
        station.distance_to_arrival_ls.unwrap_or(f64::INFINITY)
    };
    distance_ls <= filters.max_ls
}
