use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical lowercase commodity identifier, stable across data sources.
pub type CommodityId = String;

/// Station types that sit on a planet surface. Both the compact journal names
/// and the spaced API spellings occur in the wild.
pub const PLANETARY_STATION_TYPES: &[&str] = &[
    "CraterOutpost",
    "OnFootSettlement",
    "CraterPort",
    "PlanetaryOutpost",
    "PlanetaryPort",
    "OdysseySettlement",
    "null",
    "Planetary Outpost",
    "Planetary Port",
];

/// Player-owned mobile carriers, filterable separately from fixed stations.
pub const FLEET_CARRIER_STATION_TYPES: &[&str] =
    &["FleetCarrier", "DrakeFleetCarrier", "Fleet Carrier"];

/// Landing pad size. A station qualifies only if its pad ordinal is at least
/// the ship's requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PadSize {
    Small,
    Medium,
    Large,
}

impl PadSize {
    /// Parse the `S`/`M`/`L` code used by market APIs. Unknown codes map to
    /// `None` and the station is treated as having an unknown pad.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Self::Small),
            "M" => Some(Self::Medium),
            "L" => Some(Self::Large),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 3,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
        }
    }
}

/// One tradable line at one station. `unit_price` is what the station charges
/// when the player buys, or pays when the player sells; `quantity` is stock on
/// the buy side and demand on the sell side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommodityOffer {
    pub commodity_id: CommodityId,
    pub display_name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CommodityOffer {
    /// Build an offer, rejecting anything untradable. Offers with
    /// non-positive price or quantity must never enter matching, so the check
    /// lives here at the construction boundary.
    pub fn tradable(name: &str, display_name: &str, unit_price: f64, quantity: i64) -> Option<Self> {
        if name.is_empty() || unit_price <= 0.0 || quantity <= 0 {
            return None;
        }
        Some(Self {
            commodity_id: name.to_lowercase(),
            display_name: display_name.to_string(),
            unit_price,
            quantity: u32::try_from(quantity).ok()?,
        })
    }
}

/// Everything one station buys and sells, plus the attributes the filter
/// policy needs. Identity is the `(system_name, station_name)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationMarket {
    pub system_name: String,
    pub station_name: String,
    /// What the station exports (player can buy).
    pub sells_to_player: Vec<CommodityOffer>,
    /// What the station imports (player can sell).
    pub buys_from_player: Vec<CommodityOffer>,
    pub station_type: String,
    pub max_landing_pad: Option<PadSize>,
    pub distance_to_arrival_ls: Option<f64>,
}

impl StationMarket {
    pub fn is_planetary(&self) -> bool {
        PLANETARY_STATION_TYPES.contains(&self.station_type.as_str())
    }

    pub fn is_fleet_carrier(&self) -> bool {
        FLEET_CARRIER_STATION_TYPES.contains(&self.station_type.as_str())
    }

    pub fn is_same_station(&self, system: &str, station: &str) -> bool {
        self.system_name == system && self.station_name == station
    }
}

/// The stations of one system, keyed by station name, with the system's
/// distance from the search origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMarketGroup {
    pub system_name: String,
    pub distance_ly: f64,
    pub stations: HashMap<String, StationMarket>,
}

impl SystemMarketGroup {
    pub fn station(&self, name: &str) -> Option<&StationMarket> {
        self.stations.get(name)
    }
}

/// Read-only player state captured once per planning session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub system: String,
    pub station: String,
    pub cargo_capacity: u32,
    pub pad_size: Option<PadSize>,
}
