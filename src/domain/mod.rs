//! Trade matching and route planning logic lives here.

pub mod entities;
pub mod filters;
pub mod general_search;
pub mod matching;
pub mod provider;
pub mod route_finder;
pub mod session;
pub mod settings;

#[allow(unused_imports)]
pub use entities::{
    CommodityId, CommodityOffer, PadSize, PlayerSnapshot, StationMarket, SystemMarketGroup,
    FLEET_CARRIER_STATION_TYPES, PLANETARY_STATION_TYPES,
};
#[allow(unused_imports)]
pub use filters::{station_is_eligible, StationFilters};
#[allow(unused_imports)]
pub use general_search::{find_general_trades, RankedRoute, TradeDirection};
#[allow(unused_imports)]
pub use matching::{match_trades, Trade};
#[allow(unused_imports)]
pub use provider::{MarketDataProvider, ProviderError};
#[allow(unused_imports)]
pub use route_finder::{find_best_outbound_trades, DestinationSuggestion};
#[allow(unused_imports)]
pub use session::{PlanError, PlanState, PlanningSession, RouteLeg, SavedRoute};
#[allow(unused_imports)]
pub use settings::SearchSettings;
